//! Transfer Submission Module
//!
//! This module provides all the core logic for moving a payment from a user
//! request to a reconciled backend record. It is composed of several
//! submodules, each responsible for a specific aspect of the process:
//!
//! - `orchestrator`: the state machine driving validation, submission,
//!   persistence, the optimistic debit, and reconciliation.
//! - `events`: event types and handler traits used for decoupled
//!   communication between the orchestrator and its observers.
//! - `types`: the request/outcome/rejection vocabulary of an attempt.

/// Event system for decoupled communication during an attempt
pub mod events;
/// Main coordinator for transfer submission
pub mod orchestrator;
/// Requests, phases, rejections, outcomes, tickets
pub mod types;

pub use events::{EventDispatcher, LoggingEventHandler, TransferEvent, TransferEventHandler};
pub use orchestrator::TransferOrchestrator;
pub use types::*;
