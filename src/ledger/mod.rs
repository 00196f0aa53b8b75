//! Backend ledger integration module.
//!
//! This module provides the client and types for interacting with the KSC
//! backend REST API: transaction records, balances, health, token info, and
//! admin actions, plus the narrow trait seams the rest of the crate depends
//! on.

/// HTTP client for the backend REST API
mod client;
/// Pre-flight availability gate
mod health;
/// Trait seams over the backend (records, balances, health)
mod store;
/// Wire type definitions
mod types;

pub use client::LedgerApiClient;
pub use health::HealthGate;
pub use store::{
    BackendBalanceSource, BalanceReading, BalanceSource, HealthProbe, TransactionLedgerStore,
};
pub use types::*;
