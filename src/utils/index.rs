use thiserror::Error;

/// Errors produced when parsing user-supplied decimal amount strings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("malformed amount: {0}")]
    Malformed(String),

    #[error("amount has more than {max} fractional digits")]
    TooManyFractionalDigits { max: u32 },

    #[error("amount overflows the base-unit range")]
    Overflow,
}

/// Parse a decimal-string amount (e.g. "40.25") into base units at the given
/// token precision. Only plain non-negative decimal notation is accepted.
pub fn parse_token_amount(value: &str, decimals: u32) -> Result<u128, AmountError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AmountError::Empty);
    }

    let (int_part, frac_part) = match value.split_once('.') {
        Some((i, f)) => (i, f),
        None => (value, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(AmountError::Malformed(value.to_string()));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(AmountError::Malformed(value.to_string()));
    }
    if frac_part.len() as u32 > decimals {
        return Err(AmountError::TooManyFractionalDigits { max: decimals });
    }

    let scale = 10u128.checked_pow(decimals).ok_or(AmountError::Overflow)?;

    let int_units: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| AmountError::Overflow)?
    };

    let frac_units: u128 = if frac_part.is_empty() {
        0
    } else {
        let parsed: u128 = frac_part.parse().map_err(|_| AmountError::Overflow)?;
        let padding = 10u128
            .checked_pow(decimals - frac_part.len() as u32)
            .ok_or(AmountError::Overflow)?;
        parsed.checked_mul(padding).ok_or(AmountError::Overflow)?
    };

    int_units
        .checked_mul(scale)
        .and_then(|base| base.checked_add(frac_units))
        .ok_or(AmountError::Overflow)
}

/// Format a base-unit amount as a decimal string, trimming trailing zeros.
pub fn format_token_amount(amount: u128, decimals: u32) -> String {
    let scale = 10u128.pow(decimals);
    let whole = amount / scale;
    let frac = amount % scale;

    if frac == 0 {
        return whole.to_string();
    }

    let frac_str = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac_str.trim_end_matches('0'))
}
