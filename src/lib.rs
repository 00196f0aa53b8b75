//! Client core for the KSC stablecoin demo platform.
//!
//! Provides the wallet session, balance cache, backend ledger client,
//! health gate, realtime push channel, and the transfer submission
//! orchestrator that ties them together.

pub mod chain;
pub mod config;
pub mod ledger;
pub mod realtime;
pub mod utils;
pub mod wallet;

pub use config::ServiceConfig;
