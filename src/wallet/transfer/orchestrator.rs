//! Transfer submission orchestrator and integration point for all transfer
//! services.
//!
//! This module defines the `TransferOrchestrator`, which drives a single
//! logical payment (instant or batch) or a scheduled request through its
//! phases: validation, chain submission, ledger persistence, the optimistic
//! balance debit, the bounded confirmation wait, and final reconciliation of
//! status and fee back to the backend and the local caches.
//!
//! Ordering within one attempt is fixed: ledger-record creation precedes the
//! optimistic debit, which precedes the confirmation wait, so the UI never
//! shows a debited balance unbacked by any recorded attempt. Each created
//! record receives at most one terminal-status patch. The confirmation wait
//! runs as a detached background task; tearing down the caller does not stop
//! reconciliation.

use crate::chain::{ChainError, ChainOutcome, ChainTag};
use crate::ledger::{
    CreateTransactionRequest, HealthGate, LedgerStatus, PaymentType, TransactionLedgerStore,
};
use crate::utils::parse_token_amount;
use crate::wallet::balance::BalanceCache;
use crate::wallet::session::WalletSession;
use crate::wallet::transfer::events::{EventDispatcher, TransferEvent};
use crate::wallet::transfer::types::{
    TransferError, TransferOutcome, TransferPhase, TransferRejection, TransferRequest,
    TransferTicket,
};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Precision assumed for the advisory funds check when no balance snapshot
/// exists yet. Chain submission always re-reads the real value.
const FALLBACK_DECIMALS: u32 = 18;

pub struct TransferOrchestrator {
    session: Arc<WalletSession>,
    balances: Arc<BalanceCache>,
    health: HealthGate,
    ledger: Arc<dyn TransactionLedgerStore>,
    dispatcher: Arc<EventDispatcher>,
    confirmation_timeout: Duration,
    history_page_size: u32,
}

struct Leg {
    to_address: String,
    amount_display: String,
}

impl TransferOrchestrator {
    pub fn new(
        session: Arc<WalletSession>,
        balances: Arc<BalanceCache>,
        health: HealthGate,
        ledger: Arc<dyn TransactionLedgerStore>,
        dispatcher: Arc<EventDispatcher>,
        confirmation_timeout: Duration,
        history_page_size: u32,
    ) -> Self {
        Self {
            session,
            balances,
            health,
            ledger,
            dispatcher,
            confirmation_timeout,
            history_page_size,
        }
    }

    /// Run one transfer attempt. Validation rejections return synchronously
    /// with no ledger record and no chain call; accepted attempts return a
    /// ticket whose outcome resolves from a background task.
    pub async fn submit(&self, request: TransferRequest) -> Result<TransferTicket, TransferError> {
        self.dispatch_phase(TransferPhase::Validating).await;

        let (identity, signer) = match (self.session.identity(), self.session.transfer_backend()) {
            (Some(identity), Some(signer)) if identity.chain == request.chain() => {
                (identity, signer)
            }
            _ => return Err(TransferRejection::Disconnected.into()),
        };

        let legs = Self::legs_of(&request)?;

        // Advisory positivity/total check against the cached snapshot. The
        // authoritative check is the chain's; a missing snapshot skips the
        // funds comparison rather than blocking a valid transfer.
        let snapshot = self.balances.snapshot();
        let check_decimals = snapshot.map(|s| s.decimals).unwrap_or(FALLBACK_DECIMALS);
        let mut advisory_total: u128 = 0;
        for leg in &legs {
            let base = parse_token_amount(&leg.amount_display, check_decimals)
                .map_err(|e| TransferRejection::InvalidAmount(e.to_string()))?;
            if base == 0 {
                return Err(
                    TransferRejection::InvalidAmount("amount must be positive".to_string()).into(),
                );
            }
            advisory_total = advisory_total
                .checked_add(base)
                .ok_or_else(|| TransferRejection::InvalidAmount("total overflows".to_string()))?;
        }
        if let Some(snapshot) = snapshot {
            if advisory_total > snapshot.token_balance {
                return Err(TransferRejection::InsufficientFunds {
                    requested: advisory_total,
                    available: snapshot.token_balance,
                }
                .into());
            }
        }

        if !self.health.check_healthy().await {
            return Err(TransferRejection::SystemUnavailable.into());
        }

        if let TransferRequest::Scheduled {
            chain,
            to_address,
            amount,
            memo,
            scheduled_at,
        } = &request
        {
            if *scheduled_at <= chrono::Utc::now() {
                return Err(TransferRejection::InvalidSchedule.into());
            }

            // No transfer submission and no optimistic debit: the backend
            // executes the transfer at the scheduled time and pushes the
            // status change over the realtime channel. The persisted amount
            // still uses the contract's real precision, not the advisory one.
            let decimals = signer.read_decimals().await.map_err(TransferError::Chain)?;
            let base = parse_token_amount(amount, decimals)
                .map_err(|e| TransferRejection::InvalidAmount(e.to_string()))?;
            let record = CreateTransactionRequest {
                network_type: *chain,
                payment_type: PaymentType::Scheduled,
                from_address: identity.address.clone(),
                to_address: to_address.clone(),
                tx_hash: None,
                amount: base.to_string(),
                memo: memo.clone(),
                scheduled_at: Some(*scheduled_at),
            };
            let record_id = self
                .ledger
                .create(&record)
                .await
                .map_err(|e| TransferRejection::PersistenceFailed(e.to_string()))?;
            self.dispatcher
                .dispatch(&TransferEvent::RecordCreated {
                    record_id: record_id.clone(),
                    leg: 0,
                })
                .await;

            let outcome = TransferOutcome::Scheduled {
                record_id: record_id.clone(),
            };
            self.dispatch_phase(TransferPhase::Done).await;
            self.dispatcher
                .dispatch(&TransferEvent::Completed {
                    outcome: outcome.clone(),
                })
                .await;

            let (outcome_tx, outcome_rx) = oneshot::channel();
            let _ = outcome_tx.send(outcome);
            return Ok(TransferTicket {
                tx_hash: None,
                record_ids: vec![record_id],
                orphaned_legs: Vec::new(),
                outcome_rx,
            });
        }

        self.dispatch_phase(TransferPhase::Submitting).await;

        // Precision is read from the deployed contract at call time; test
        // and mock deployments may differ from the backend's figure.
        let decimals = signer.read_decimals().await.map_err(TransferError::Chain)?;
        let mut base_amounts = Vec::with_capacity(legs.len());
        let mut total_base: u128 = 0;
        for leg in &legs {
            let base = parse_token_amount(&leg.amount_display, decimals)
                .map_err(|e| TransferRejection::InvalidAmount(e.to_string()))?;
            total_base = total_base
                .checked_add(base)
                .ok_or_else(|| TransferRejection::InvalidAmount("total overflows".to_string()))?;
            base_amounts.push(base);
        }

        let payment_type = match &request {
            TransferRequest::Batch { .. } => PaymentType::Batch,
            _ => PaymentType::Instant,
        };
        let memo = match &request {
            TransferRequest::Instant { memo, .. } | TransferRequest::Batch { memo, .. } => {
                memo.clone()
            }
            TransferRequest::Scheduled { .. } => None,
        };

        let pending = match &request {
            TransferRequest::Instant { to_address, .. } => {
                signer.send_transfer(to_address, base_amounts[0]).await
            }
            TransferRequest::Batch { recipients, .. } => {
                signer.send_batch_transfer(recipients, &base_amounts).await
            }
            TransferRequest::Scheduled { .. } => unreachable!("handled above"),
        }
        .map_err(|e| match e {
            ChainError::SubmissionRejected => TransferError::ChainSubmissionRejected,
            other => TransferError::Chain(other),
        })?;

        let tx_hash = pending.tx_hash.clone();
        info!(
            "Chain accepted {} ({} leg(s)) as {}",
            payment_type_name(payment_type),
            legs.len(),
            tx_hash
        );

        // One PENDING record per logical leg, keyed to the shared hash.
        let mut record_ids = Vec::new();
        let mut orphaned_legs = Vec::new();
        for (leg_index, (leg, base)) in legs.iter().zip(&base_amounts).enumerate() {
            let record = CreateTransactionRequest {
                network_type: identity.chain,
                payment_type,
                from_address: identity.address.clone(),
                to_address: leg.to_address.clone(),
                tx_hash: Some(tx_hash.clone()),
                amount: base.to_string(),
                memo: memo.clone(),
                scheduled_at: None,
            };
            match self.ledger.create(&record).await {
                Ok(record_id) => {
                    self.dispatcher
                        .dispatch(&TransferEvent::RecordCreated {
                            record_id: record_id.clone(),
                            leg: leg_index,
                        })
                        .await;
                    record_ids.push(record_id);
                }
                Err(e) => {
                    orphaned_legs.push(leg_index);
                    self.dispatcher
                        .dispatch(&TransferEvent::OrphanedLeg {
                            leg: leg_index,
                            to_address: leg.to_address.clone(),
                            error: e.to_string(),
                        })
                        .await;
                }
            }
        }

        if record_ids.is_empty() {
            // The signed call is already in flight and cannot be withdrawn,
            // but with no records there is nothing to reconcile.
            error!(
                "No ledger record could be created for {}; aborting confirmation wait",
                tx_hash
            );
            return Err(TransferRejection::PersistenceFailed(
                "no ledger record could be created".to_string(),
            )
            .into());
        }

        self.balances.apply_optimistic_debit(total_base);
        self.dispatch_phase(TransferPhase::AwaitingChainConfirmation)
            .await;

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let reconciler = Reconciler {
            ledger: self.ledger.clone(),
            balances: self.balances.clone(),
            session: self.session.clone(),
            dispatcher: self.dispatcher.clone(),
            chain: identity.chain,
            address: identity.address.clone(),
            history_page_size: self.history_page_size,
        };
        let confirmation_timeout = self.confirmation_timeout;
        let task_ids = record_ids.clone();
        let task_hash = tx_hash.clone();
        let pending_outcome = pending.outcome;

        tokio::spawn(async move {
            let outcome = match tokio::time::timeout(confirmation_timeout, pending_outcome).await {
                Err(_) => {
                    // Outcome unknown: no patch, records stay PENDING until
                    // the next full refresh picks up the truth.
                    warn!(
                        "Confirmation wait for {} elapsed after {:?}",
                        task_hash, confirmation_timeout
                    );
                    TransferOutcome::TimedOut {
                        tx_hash: task_hash.clone(),
                    }
                }
                Ok(Err(_)) => {
                    warn!("Finality signal for {} was lost before resolving", task_hash);
                    TransferOutcome::Failed {
                        tx_hash: Some(task_hash.clone()),
                        reason: "confirmation signal lost".to_string(),
                    }
                }
                Ok(Ok(chain_outcome)) => {
                    reconciler.reconcile(&task_ids, &task_hash, chain_outcome).await
                }
            };

            reconciler
                .dispatcher
                .dispatch(&TransferEvent::PhaseChanged {
                    phase: TransferPhase::Done,
                })
                .await;
            reconciler
                .dispatcher
                .dispatch(&TransferEvent::Completed {
                    outcome: outcome.clone(),
                })
                .await;
            let _ = outcome_tx.send(outcome);
        });

        Ok(TransferTicket {
            tx_hash: Some(tx_hash),
            record_ids,
            orphaned_legs,
            outcome_rx,
        })
    }

    fn legs_of(request: &TransferRequest) -> Result<Vec<Leg>, TransferRejection> {
        match request {
            TransferRequest::Instant {
                to_address, amount, ..
            }
            | TransferRequest::Scheduled {
                to_address, amount, ..
            } => Ok(vec![Leg {
                to_address: to_address.clone(),
                amount_display: amount.clone(),
            }]),
            TransferRequest::Batch {
                recipients,
                amounts,
                ..
            } => {
                if recipients.is_empty() || recipients.len() != amounts.len() {
                    return Err(TransferRejection::InvalidAmount(
                        "batch recipients and amounts must be non-empty and equal in length"
                            .to_string(),
                    ));
                }
                Ok(recipients
                    .iter()
                    .zip(amounts)
                    .map(|(to, amount)| Leg {
                        to_address: to.clone(),
                        amount_display: amount.clone(),
                    })
                    .collect())
            }
        }
    }

    async fn dispatch_phase(&self, phase: TransferPhase) {
        self.dispatcher
            .dispatch(&TransferEvent::PhaseChanged { phase })
            .await;
    }
}

fn payment_type_name(payment_type: PaymentType) -> &'static str {
    match payment_type {
        PaymentType::Instant => "instant transfer",
        PaymentType::Batch => "batch transfer",
        PaymentType::Scheduled => "scheduled transfer",
    }
}

/// Post-confirmation reconciliation, shared by the background task.
struct Reconciler {
    ledger: Arc<dyn TransactionLedgerStore>,
    balances: Arc<BalanceCache>,
    session: Arc<WalletSession>,
    dispatcher: Arc<EventDispatcher>,
    chain: ChainTag,
    address: String,
    history_page_size: u32,
}

impl Reconciler {
    /// Patch every created record to the terminal status once, then refresh
    /// balances and re-list history. Patch failures are warnings: the record
    /// stays PENDING locally until the next full re-list, never retried.
    async fn reconcile(
        &self,
        record_ids: &[String],
        tx_hash: &str,
        chain_outcome: ChainOutcome,
    ) -> TransferOutcome {
        self.dispatcher
            .dispatch(&TransferEvent::PhaseChanged {
                phase: TransferPhase::Reconciling,
            })
            .await;

        let (status, fee, outcome) = match chain_outcome {
            ChainOutcome::Confirmed { .. } => {
                let fee = chain_outcome.fee();
                (
                    LedgerStatus::Confirmed,
                    Some(fee.to_string()),
                    TransferOutcome::Confirmed {
                        tx_hash: tx_hash.to_string(),
                        fee,
                    },
                )
            }
            ChainOutcome::Reverted => (
                LedgerStatus::Failed,
                None,
                TransferOutcome::Failed {
                    tx_hash: Some(tx_hash.to_string()),
                    reason: "execution reverted".to_string(),
                },
            ),
        };

        for record_id in record_ids {
            if let Err(e) = self.ledger.patch(record_id, status, fee.clone()).await {
                warn!("Failed to patch record {}: {}", record_id, e);
                self.dispatcher
                    .dispatch(&TransferEvent::ReconciliationWarning {
                        record_id: record_id.clone(),
                        error: e.to_string(),
                    })
                    .await;
            }
        }

        // Replace the optimistic overlay with the authoritative balances.
        if let Err(e) = self.balances.refresh(self.chain, &self.address).await {
            warn!("Post-reconciliation balance refresh failed: {}", e);
        }

        if let Some(wallet_id) = self.session.backend_wallet_id() {
            match self.ledger.list(&wallet_id, 1, self.history_page_size).await {
                Ok(page) => {
                    tracing::debug!(
                        "Re-listed history: {} of {} records",
                        page.items.len(),
                        page.pagination.total_count
                    );
                }
                Err(e) => warn!("History re-list failed: {}", e),
            }
        }

        outcome
    }
}
