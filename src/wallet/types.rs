use crate::chain::ChainTag;

use chrono::{DateTime, Utc};

/// Identity of the connected wallet. Present iff connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletIdentity {
    pub address: String,
    pub chain: ChainTag,
    /// True when the session runs against a simulated transfer backend.
    /// Never mixed with a real provider signer.
    pub is_mock: bool,
}

/// Last-known balances for the active address. Replaced wholesale on each
/// refresh; the optimistic debit overlay is the only partial mutation and is
/// superseded by the next refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSnapshot {
    /// Native currency balance, base units.
    pub native_balance: u128,
    /// Token balance, base units.
    pub token_balance: u128,
    /// Token precision reported by the backend balance payload.
    pub decimals: u32,
    pub as_of: DateTime<Utc>,
}

/// Errors for wallet session and balance operations.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// The user declined the provider connection request.
    #[error("wallet connection rejected")]
    ConnectionRejected,

    #[error("no wallet provider available")]
    ProviderUnavailable,

    /// The provider switched to a chain outside the supported set. Surfaced
    /// as a warning; the session is not forcibly disconnected.
    #[error("unsupported chain id {0}")]
    UnsupportedChain(u64),

    /// A balance refresh failed; the previous snapshot stays in place.
    #[error("balance unavailable: {0}")]
    BalanceUnavailable(String),

    #[error("session store error: {0}")]
    Store(String),

    #[error("provider error: {0}")]
    Provider(String),
}
