//! Wallet state module.
//!
//! Holds the session (connection identity and capabilities), the balance
//! cache, and the transfer submission machinery built on top of them.

/// Cached native and token balances
pub mod balance;
/// Connection identity and capability management
pub mod session;
/// Transfer submission state machine
pub mod transfer;
/// Identity, snapshot, and error types
pub mod types;

pub use balance::BalanceCache;
pub use session::{SessionStore, WalletSession};
pub use types::*;
