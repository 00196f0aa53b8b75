//!
//! Utility module for the KSC wallet core.
//!
//! Re-exports the decimal-string amount codec used throughout the codebase.

/// Decimal-string amount parsing and formatting
pub mod index;

pub use index::{AmountError, format_token_amount, parse_token_amount};
