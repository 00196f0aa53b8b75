//! Event system for transfer submission.
//!
//! The orchestrator emits events as an attempt moves through its phases;
//! registered handlers (toasts, history views, telemetry) react without the
//! orchestrator knowing about any of them. Handler failures are logged and
//! never interrupt the attempt or the other handlers.

use crate::wallet::transfer::types::{TransferOutcome, TransferPhase};

/// Events emitted during a transfer attempt.
#[derive(Debug, Clone)]
pub enum TransferEvent {
    /// The attempt moved to a new phase.
    PhaseChanged { phase: TransferPhase },
    /// A ledger record was created for one leg.
    RecordCreated { record_id: String, leg: usize },
    /// A leg's ledger record could not be created; the leg is on chain but
    /// will never be reconciled.
    OrphanedLeg {
        leg: usize,
        to_address: String,
        error: String,
    },
    /// A terminal-status patch failed; the record stays PENDING locally
    /// until the next full re-list. Not retried.
    ReconciliationWarning { record_id: String, error: String },
    /// The attempt reached its terminal outcome. Emitted exactly once.
    Completed { outcome: TransferOutcome },
}

/// Trait for handling transfer events.
#[async_trait::async_trait]
pub trait TransferEventHandler: Send + Sync {
    /// Called for every event dispatched during an attempt.
    async fn handle(&self, event: &TransferEvent);

    /// Name of this handler for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Dispatcher that fans events out to all registered handlers in
/// registration order.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Box<dyn TransferEventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn register_handler(&mut self, handler: Box<dyn TransferEventHandler>) {
        self.handlers.push(handler);
    }

    pub async fn dispatch(&self, event: &TransferEvent) {
        for handler in &self.handlers {
            handler.handle(event).await;
        }
    }
}

/// Handler that mirrors events into the tracing log.
pub struct LoggingEventHandler;

#[async_trait::async_trait]
impl TransferEventHandler for LoggingEventHandler {
    async fn handle(&self, event: &TransferEvent) {
        match event {
            TransferEvent::PhaseChanged { phase } => {
                tracing::debug!("Transfer phase: {:?}", phase);
            }
            TransferEvent::RecordCreated { record_id, leg } => {
                tracing::info!("Ledger record {} created for leg {}", record_id, leg);
            }
            TransferEvent::OrphanedLeg {
                leg,
                to_address,
                error,
            } => {
                tracing::warn!(
                    "Leg {} to {} is orphaned (no ledger record): {}",
                    leg,
                    to_address,
                    error
                );
            }
            TransferEvent::ReconciliationWarning { record_id, error } => {
                tracing::warn!(
                    "Record {} left PENDING, patch failed: {}",
                    record_id,
                    error
                );
            }
            TransferEvent::Completed { outcome } => {
                tracing::info!("Transfer completed: {:?}", outcome);
            }
        }
    }

    fn name(&self) -> &'static str {
        "LoggingEventHandler"
    }
}
