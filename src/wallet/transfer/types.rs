//! Types for the transfer submission state machine.

use crate::chain::{ChainError, ChainTag};

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

/// A logical payment as requested by the user. Amounts are decimal strings
/// in display units; conversion to base units happens at submission time
/// with the precision read from the token contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferRequest {
    Instant {
        chain: ChainTag,
        to_address: String,
        amount: String,
        memo: Option<String>,
    },
    /// One on-chain call, one signature, one hash; independent ledger
    /// records per recipient.
    Batch {
        chain: ChainTag,
        recipients: Vec<String>,
        amounts: Vec<String>,
        memo: Option<String>,
    },
    /// Persisted for backend-side execution at `scheduled_at`; no chain
    /// call is made by the client.
    Scheduled {
        chain: ChainTag,
        to_address: String,
        amount: String,
        memo: Option<String>,
        scheduled_at: DateTime<Utc>,
    },
}

impl TransferRequest {
    pub fn chain(&self) -> ChainTag {
        match self {
            TransferRequest::Instant { chain, .. }
            | TransferRequest::Batch { chain, .. }
            | TransferRequest::Scheduled { chain, .. } => *chain,
        }
    }
}

/// Phases a transfer attempt moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    Validating,
    Submitting,
    AwaitingChainConfirmation,
    Reconciling,
    Done,
}

/// Validation-stage rejections. None of these reach the ledger or the
/// chain; they are reported synchronously to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferRejection {
    #[error("wallet is not connected")]
    Disconnected,

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient funds: requested {requested} base units, available {available}")]
    InsufficientFunds { requested: u128, available: u128 },

    #[error("system is unavailable")]
    SystemUnavailable,

    #[error("scheduled time is not in the future")]
    InvalidSchedule,

    /// Ledger persistence failed for every leg; nothing would be
    /// reconciled, so the attempt is aborted.
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),
}

/// Errors surfaced by `TransferOrchestrator::submit`.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error(transparent)]
    Rejected(#[from] TransferRejection),

    /// The user declined the signature request. No record exists.
    #[error("chain submission rejected by user")]
    ChainSubmissionRejected,

    #[error("chain error: {0}")]
    Chain(ChainError),
}

/// Terminal outcome of an accepted transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Confirmed {
        tx_hash: String,
        /// Actual fee in native base units (gas used x effective price).
        fee: u128,
    },
    Failed {
        tx_hash: Option<String>,
        reason: String,
    },
    /// The bounded confirmation wait elapsed; the chain outcome is unknown
    /// and the records stay PENDING until the next full refresh.
    TimedOut { tx_hash: String },
    /// Scheduled transfer accepted for backend-side execution.
    Scheduled { record_id: String },
}

/// Handle returned for an accepted attempt. The confirmation wait runs as a
/// detached background task; the caller awaits the outcome through this
/// ticket instead of blocking.
#[derive(Debug)]
pub struct TransferTicket {
    pub tx_hash: Option<String>,
    /// Backend ids of the ledger records created for this attempt, in leg
    /// order (orphaned legs omitted).
    pub record_ids: Vec<String>,
    /// Leg indices whose ledger record could not be created. They are never
    /// reconciled and are surfaced as warnings.
    pub orphaned_legs: Vec<usize>,
    pub(crate) outcome_rx: oneshot::Receiver<TransferOutcome>,
}

impl TransferTicket {
    /// Await the terminal outcome of this attempt.
    pub async fn outcome(self) -> TransferOutcome {
        let tx_hash = self.tx_hash.clone();
        self.outcome_rx.await.unwrap_or(TransferOutcome::Failed {
            tx_hash,
            reason: "confirmation task dropped".to_string(),
        })
    }
}
