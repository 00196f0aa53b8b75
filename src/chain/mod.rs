//! Chain-side interface module.
//!
//! Defines the closed set of supported chains, the wallet-provider
//! connection contract, and the signer capability used for transfer
//! submission, together with simulated implementations for local
//! development.

/// Wallet-provider connection contract
mod provider;
/// Transfer submission capability
mod signer;
/// Chain tags, configs, outcomes, and errors
mod types;

pub use provider::{SimulatedProvider, WalletProvider};
pub use signer::{ChainSigner, SimulatedSigner};
pub use types::*;
