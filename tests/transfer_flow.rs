//! End-to-end transfer submission flows against in-memory collaborators.

use ksc_wallet_core::chain::{
    ChainConfig, ChainError, ChainOutcome, ChainSigner, ChainTag, PendingSubmission,
    ProviderError, WalletProvider,
};
use ksc_wallet_core::ledger::{
    BalanceReading, BalanceSource, CreateTransactionRequest, HealthGate, HealthProbe,
    LedgerApiError, LedgerStatus, Pagination, PaymentType, TransactionLedgerStore,
    TransactionPage,
};
use ksc_wallet_core::wallet::transfer::{
    EventDispatcher, TransferError, TransferOrchestrator, TransferOutcome, TransferRejection,
    TransferRequest,
};
use ksc_wallet_core::wallet::{BalanceCache, SessionStore, WalletSession};

use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

const DECIMALS: u32 = 18;
const ONE: u128 = 1_000_000_000_000_000_000;
const GAS_USED: u128 = 52_000;
const GAS_PRICE: u128 = 25_000_000_000;

/// Ledger fake recording every create/patch/list call. `patches` records
/// every attempt, including ones made to fail.
#[derive(Default)]
struct InMemoryLedger {
    created: Mutex<Vec<(String, CreateTransactionRequest)>>,
    patches: Mutex<Vec<(String, LedgerStatus, Option<String>)>>,
    lists: AtomicUsize,
    fail_create_for: Mutex<HashSet<String>>,
    fail_patches: AtomicBool,
    next_id: AtomicUsize,
}

impl InMemoryLedger {
    fn fail_create_for(&self, to_address: &str) {
        self.fail_create_for
            .lock()
            .unwrap()
            .insert(to_address.to_string());
    }

    fn created(&self) -> Vec<(String, CreateTransactionRequest)> {
        self.created.lock().unwrap().clone()
    }

    fn patches(&self) -> Vec<(String, LedgerStatus, Option<String>)> {
        self.patches.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TransactionLedgerStore for InMemoryLedger {
    async fn create(&self, request: &CreateTransactionRequest) -> Result<String, LedgerApiError> {
        if self
            .fail_create_for
            .lock()
            .unwrap()
            .contains(&request.to_address)
        {
            return Err(LedgerApiError::PersistenceFailed("backend error".into()));
        }
        let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.created
            .lock()
            .unwrap()
            .push((id.clone(), request.clone()));
        Ok(id)
    }

    async fn patch(
        &self,
        id: &str,
        status: LedgerStatus,
        fee: Option<String>,
    ) -> Result<(), LedgerApiError> {
        self.patches
            .lock()
            .unwrap()
            .push((id.to_string(), status, fee));
        if self.fail_patches.load(Ordering::SeqCst) {
            return Err(LedgerApiError::ReconciliationFailed("backend error".into()));
        }
        Ok(())
    }

    async fn list(
        &self,
        _wallet_id: &str,
        _page: u32,
        limit: u32,
    ) -> Result<TransactionPage, LedgerApiError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(TransactionPage {
            items: Vec::new(),
            pagination: Pagination {
                limit,
                current_page: 1,
                total_page: 0,
                total_count: 0,
            },
        })
    }
}

/// Balance source whose token figure the test can move between refreshes.
struct AdjustableBalances {
    token_balance: Mutex<u128>,
    reads: AtomicUsize,
}

impl AdjustableBalances {
    fn new(token_balance: u128) -> Self {
        Self {
            token_balance: Mutex::new(token_balance),
            reads: AtomicUsize::new(0),
        }
    }

    fn set_token_balance(&self, value: u128) {
        *self.token_balance.lock().unwrap() = value;
    }
}

#[async_trait::async_trait]
impl BalanceSource for AdjustableBalances {
    async fn read_balances(
        &self,
        _chain: ChainTag,
        _address: &str,
    ) -> Result<BalanceReading, LedgerApiError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(BalanceReading {
            native_balance: ONE,
            token_balance: *self.token_balance.lock().unwrap(),
            decimals: DECIMALS,
        })
    }
}

struct CountingProbe {
    healthy: AtomicBool,
    probes: AtomicUsize,
}

impl CountingProbe {
    fn new(healthy: bool) -> Self {
        Self {
            healthy: AtomicBool::new(healthy),
            probes: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl HealthProbe for CountingProbe {
    async fn probe_system(&self) -> Result<bool, LedgerApiError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.healthy.load(Ordering::SeqCst))
    }
}

/// Signer whose finality signal the test controls.
struct ScriptedSigner {
    decimals: AtomicU32,
    pending: Mutex<Vec<oneshot::Sender<ChainOutcome>>>,
    submissions: AtomicUsize,
    last_batch_size: AtomicUsize,
    reject_signature: AtomicBool,
}

impl Default for ScriptedSigner {
    fn default() -> Self {
        Self {
            decimals: AtomicU32::new(DECIMALS),
            pending: Mutex::new(Vec::new()),
            submissions: AtomicUsize::new(0),
            last_batch_size: AtomicUsize::new(0),
            reject_signature: AtomicBool::new(false),
        }
    }
}

impl ScriptedSigner {
    fn take_finality_handle(&self) -> oneshot::Sender<ChainOutcome> {
        self.pending.lock().unwrap().remove(0)
    }

    fn submit(&self) -> PendingSubmission {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().push(tx);
        PendingSubmission {
            tx_hash: format!("0xhash{}", self.submissions.load(Ordering::SeqCst)),
            outcome: rx,
        }
    }
}

#[async_trait::async_trait]
impl ChainSigner for ScriptedSigner {
    async fn read_decimals(&self) -> Result<u32, ChainError> {
        Ok(self.decimals.load(Ordering::SeqCst))
    }

    async fn read_native_balance(&self, _address: &str) -> Result<u128, ChainError> {
        Ok(ONE)
    }

    async fn send_transfer(
        &self,
        _to: &str,
        _amount_base_units: u128,
    ) -> Result<PendingSubmission, ChainError> {
        if self.reject_signature.load(Ordering::SeqCst) {
            return Err(ChainError::SubmissionRejected);
        }
        Ok(self.submit())
    }

    async fn send_batch_transfer(
        &self,
        recipients: &[String],
        amounts_base_units: &[u128],
    ) -> Result<PendingSubmission, ChainError> {
        assert_eq!(recipients.len(), amounts_base_units.len());
        self.last_batch_size.store(recipients.len(), Ordering::SeqCst);
        Ok(self.submit())
    }
}

/// Provider handing out the scripted signer on connect.
struct ScriptedProvider {
    signer: Arc<ScriptedSigner>,
}

#[async_trait::async_trait]
impl WalletProvider for ScriptedProvider {
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        Ok(vec!["0xfrom".to_string()])
    }

    async fn request_chain_switch(&self, _config: &ChainConfig) -> Result<(), ProviderError> {
        Ok(())
    }

    fn signer(&self, _chain: ChainTag) -> Arc<dyn ChainSigner> {
        self.signer.clone()
    }
}

struct Harness {
    orchestrator: TransferOrchestrator,
    session: Arc<WalletSession>,
    balances: Arc<BalanceCache>,
    ledger: Arc<InMemoryLedger>,
    probe: Arc<CountingProbe>,
    signer: Arc<ScriptedSigner>,
    source: Arc<AdjustableBalances>,
    _dir: tempfile::TempDir,
}

async fn harness(token_balance: u128, confirmation_timeout: Duration) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let signer = Arc::new(ScriptedSigner::default());
    let provider = Arc::new(ScriptedProvider {
        signer: signer.clone(),
    });
    let session = Arc::new(WalletSession::new(
        provider,
        SessionStore::new(dir.path().to_path_buf()),
    ));

    let source = Arc::new(AdjustableBalances::new(token_balance));
    let balances = Arc::new(BalanceCache::new(source.clone()));
    let ledger = Arc::new(InMemoryLedger::default());
    let probe = Arc::new(CountingProbe::new(true));

    let orchestrator = TransferOrchestrator::new(
        session.clone(),
        balances.clone(),
        HealthGate::new(probe.clone()),
        ledger.clone(),
        Arc::new(EventDispatcher::new()),
        confirmation_timeout,
        10,
    );

    Harness {
        orchestrator,
        session,
        balances,
        ledger,
        probe,
        signer,
        source,
        _dir: dir,
    }
}

async fn connected_harness(token_balance: u128) -> Harness {
    let h = harness(token_balance, Duration::from_secs(5)).await;
    h.session.connect(ChainTag::Avalanche).await.unwrap();
    h.session.set_backend_wallet_id("wallet-1".to_string());
    h.balances
        .refresh(ChainTag::Avalanche, "0xfrom")
        .await
        .unwrap();
    h
}

fn instant(amount: &str) -> TransferRequest {
    TransferRequest::Instant {
        chain: ChainTag::Avalanche,
        to_address: "0xrecipient".to_string(),
        amount: amount.to_string(),
        memo: None,
    }
}

// Scenario A: instant transfer of 40.00 against a balance of 100.00.
#[tokio::test]
async fn instant_transfer_confirms_and_reconciles() {
    let h = connected_harness(100 * ONE).await;

    let ticket = h.orchestrator.submit(instant("40.00")).await.unwrap();
    assert_eq!(ticket.record_ids.len(), 1);
    assert!(ticket.orphaned_legs.is_empty());

    let created = h.ledger.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].1.amount, "40000000000000000000");
    assert_eq!(created[0].1.payment_type, PaymentType::Instant);
    assert!(created[0].1.tx_hash.is_some());

    // Optimistic debit reflects the pending spend immediately.
    assert_eq!(h.balances.snapshot().unwrap().token_balance, 60 * ONE);

    // The authoritative balance the next refresh will observe.
    h.source.set_token_balance(60 * ONE);
    h.signer
        .take_finality_handle()
        .send(ChainOutcome::Confirmed {
            gas_used: GAS_USED,
            effective_gas_price: GAS_PRICE,
        })
        .unwrap();

    let outcome = ticket.outcome().await;
    match outcome {
        TransferOutcome::Confirmed { fee, .. } => assert_eq!(fee, GAS_USED * GAS_PRICE),
        other => panic!("unexpected outcome: {:?}", other),
    }

    let patches = h.ledger.patches();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].1, LedgerStatus::Confirmed);
    assert_eq!(patches[0].2, Some((GAS_USED * GAS_PRICE).to_string()));

    assert_eq!(h.balances.snapshot().unwrap().token_balance, 60 * ONE);
    assert_eq!(h.ledger.lists.load(Ordering::SeqCst), 1);
}

// Scenario B: disconnected wallet rejects before any side effect.
#[tokio::test]
async fn disconnected_wallet_rejects_without_side_effects() {
    let h = harness(100 * ONE, Duration::from_secs(5)).await;

    let err = h.orchestrator.submit(instant("1")).await.unwrap_err();
    assert!(matches!(
        err,
        TransferError::Rejected(TransferRejection::Disconnected)
    ));
    assert!(h.ledger.created().is_empty());
    assert_eq!(h.probe.probes.load(Ordering::SeqCst), 0);
    assert_eq!(h.signer.submissions.load(Ordering::SeqCst), 0);
}

// Scenario C: insufficient funds rejects before any ledger or chain call.
#[tokio::test]
async fn insufficient_funds_rejects_before_side_effects() {
    let h = connected_harness(100 * ONE).await;

    let err = h.orchestrator.submit(instant("150.00")).await.unwrap_err();
    match err {
        TransferError::Rejected(TransferRejection::InsufficientFunds {
            requested,
            available,
        }) => {
            assert_eq!(requested, 150 * ONE);
            assert_eq!(available, 100 * ONE);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(h.ledger.created().is_empty());
    assert_eq!(h.probe.probes.load(Ordering::SeqCst), 0);
    assert_eq!(h.signer.submissions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_positive_and_malformed_amounts_reject() {
    let h = connected_harness(100 * ONE).await;

    for bad in ["0", "0.00", "abc", "-3"] {
        let err = h.orchestrator.submit(instant(bad)).await.unwrap_err();
        assert!(
            matches!(
                err,
                TransferError::Rejected(TransferRejection::InvalidAmount(_))
            ),
            "amount {:?} should be rejected",
            bad
        );
    }
    assert!(h.ledger.created().is_empty());
}

#[tokio::test]
async fn unhealthy_backend_rejects_attempt() {
    let h = connected_harness(100 * ONE).await;
    h.probe.healthy.store(false, Ordering::SeqCst);

    let err = h.orchestrator.submit(instant("1")).await.unwrap_err();
    assert!(matches!(
        err,
        TransferError::Rejected(TransferRejection::SystemUnavailable)
    ));
    assert!(h.ledger.created().is_empty());
    assert_eq!(h.signer.submissions.load(Ordering::SeqCst), 0);
}

// Scenario D: partial ledger persistence in a batch keeps the created legs
// reconciled and reports the missing one as an orphan.
#[tokio::test]
async fn batch_with_partial_persistence_reconciles_created_legs_only() {
    let h = connected_harness(100 * ONE).await;
    h.ledger.fail_create_for("0xr2");

    let request = TransferRequest::Batch {
        chain: ChainTag::Avalanche,
        recipients: vec!["0xr1".into(), "0xr2".into(), "0xr3".into()],
        amounts: vec!["10".into(), "20".into(), "30".into()],
        memo: None,
    };
    let ticket = h.orchestrator.submit(request).await.unwrap();

    // One signed call covered all three legs.
    assert_eq!(h.signer.submissions.load(Ordering::SeqCst), 1);
    assert_eq!(h.signer.last_batch_size.load(Ordering::SeqCst), 3);
    assert_eq!(ticket.orphaned_legs, vec![1]);
    assert_eq!(ticket.record_ids.len(), 2);

    let created = h.ledger.created();
    let to_addresses: Vec<_> = created.iter().map(|(_, r)| r.to_address.clone()).collect();
    assert_eq!(to_addresses, vec!["0xr1", "0xr3"]);

    // Full batch total is debited optimistically.
    assert_eq!(h.balances.snapshot().unwrap().token_balance, 40 * ONE);

    h.signer
        .take_finality_handle()
        .send(ChainOutcome::Confirmed {
            gas_used: GAS_USED,
            effective_gas_price: GAS_PRICE,
        })
        .unwrap();
    let outcome = ticket.outcome().await;
    assert!(matches!(outcome, TransferOutcome::Confirmed { .. }));

    // Only the created records receive exactly one patch each.
    let patches = h.ledger.patches();
    assert_eq!(patches.len(), 2);
    let patched_ids: HashSet<_> = patches.iter().map(|(id, _, _)| id.clone()).collect();
    let created_ids: HashSet<_> = created.iter().map(|(id, _)| id.clone()).collect();
    assert_eq!(patched_ids, created_ids);
}

#[tokio::test]
async fn batch_with_total_persistence_failure_aborts() {
    let h = connected_harness(100 * ONE).await;
    h.ledger.fail_create_for("0xr1");
    h.ledger.fail_create_for("0xr2");

    let request = TransferRequest::Batch {
        chain: ChainTag::Avalanche,
        recipients: vec!["0xr1".into(), "0xr2".into()],
        amounts: vec!["1".into(), "2".into()],
        memo: None,
    };
    let err = h.orchestrator.submit(request).await.unwrap_err();
    assert!(matches!(
        err,
        TransferError::Rejected(TransferRejection::PersistenceFailed(_))
    ));
    assert!(h.ledger.patches().is_empty());
}

#[tokio::test]
async fn mismatched_batch_arrays_reject() {
    let h = connected_harness(100 * ONE).await;

    let request = TransferRequest::Batch {
        chain: ChainTag::Avalanche,
        recipients: vec!["0xr1".into()],
        amounts: vec!["1".into(), "2".into()],
        memo: None,
    };
    let err = h.orchestrator.submit(request).await.unwrap_err();
    assert!(matches!(
        err,
        TransferError::Rejected(TransferRejection::InvalidAmount(_))
    ));
}

// Scenario E: scheduled transfer with a past timestamp.
#[tokio::test]
async fn past_schedule_rejects_without_record() {
    let h = connected_harness(100 * ONE).await;

    let request = TransferRequest::Scheduled {
        chain: ChainTag::Avalanche,
        to_address: "0xrecipient".into(),
        amount: "5".into(),
        memo: None,
        scheduled_at: Utc::now() - ChronoDuration::minutes(1),
    };
    let err = h.orchestrator.submit(request).await.unwrap_err();
    assert!(matches!(
        err,
        TransferError::Rejected(TransferRejection::InvalidSchedule)
    ));
    assert!(h.ledger.created().is_empty());
    assert_eq!(h.signer.submissions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn future_schedule_persists_without_chain_call_or_debit() {
    let h = connected_harness(100 * ONE).await;

    let scheduled_at = Utc::now() + ChronoDuration::hours(2);
    let request = TransferRequest::Scheduled {
        chain: ChainTag::Avalanche,
        to_address: "0xrecipient".into(),
        amount: "5".into(),
        memo: Some("rent".into()),
        scheduled_at,
    };
    let ticket = h.orchestrator.submit(request).await.unwrap();
    assert!(ticket.tx_hash.is_none());
    assert_eq!(ticket.record_ids.len(), 1);

    let created = h.ledger.created();
    assert_eq!(created[0].1.payment_type, PaymentType::Scheduled);
    assert!(created[0].1.tx_hash.is_none());
    assert_eq!(created[0].1.scheduled_at, Some(scheduled_at));

    // Funds have not moved; no optimistic debit for scheduled requests.
    assert_eq!(h.balances.snapshot().unwrap().token_balance, 100 * ONE);
    assert_eq!(h.signer.submissions.load(Ordering::SeqCst), 0);

    let outcome = ticket.outcome().await;
    assert!(matches!(outcome, TransferOutcome::Scheduled { .. }));
}

#[tokio::test]
async fn failed_terminal_patch_is_non_fatal_and_never_retried() {
    let h = connected_harness(100 * ONE).await;
    h.ledger.fail_patches.store(true, Ordering::SeqCst);

    let ticket = h.orchestrator.submit(instant("10")).await.unwrap();
    h.source.set_token_balance(90 * ONE);
    h.signer
        .take_finality_handle()
        .send(ChainOutcome::Confirmed {
            gas_used: GAS_USED,
            effective_gas_price: GAS_PRICE,
        })
        .unwrap();

    // The patch failure is a warning: the attempt still completes.
    let outcome = ticket.outcome().await;
    match outcome {
        TransferOutcome::Confirmed { fee, .. } => assert_eq!(fee, GAS_USED * GAS_PRICE),
        other => panic!("unexpected outcome: {:?}", other),
    }

    // Exactly one patch attempt per record; the record stays PENDING
    // backend-side until the next full re-list.
    assert_eq!(h.ledger.patches().len(), 1);

    // The balance refresh still ran despite the failed patch.
    assert_eq!(h.balances.snapshot().unwrap().token_balance, 90 * ONE);
    assert_eq!(h.ledger.lists.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dropped_finality_signal_fails_without_patch() {
    let h = connected_harness(100 * ONE).await;

    let ticket = h.orchestrator.submit(instant("10")).await.unwrap();
    // The pending submission's channel drops without ever resolving.
    drop(h.signer.take_finality_handle());

    match ticket.outcome().await {
        TransferOutcome::Failed { tx_hash, .. } => assert!(tx_hash.is_some()),
        other => panic!("unexpected outcome: {:?}", other),
    }

    // Outcome unknown on chain: no terminal patch, no refresh.
    assert!(h.ledger.patches().is_empty());
    assert_eq!(h.balances.snapshot().unwrap().token_balance, 90 * ONE);
}

#[tokio::test]
async fn scheduled_amount_uses_contract_precision() {
    let h = connected_harness(100 * ONE).await;
    h.signer.decimals.store(6, Ordering::SeqCst);

    let request = TransferRequest::Scheduled {
        chain: ChainTag::Avalanche,
        to_address: "0xrecipient".into(),
        amount: "5".into(),
        memo: None,
        scheduled_at: Utc::now() + ChronoDuration::hours(1),
    };
    h.orchestrator.submit(request).await.unwrap();

    // Base units at the precision the contract reports, not an assumed 18.
    assert_eq!(h.ledger.created()[0].1.amount, "5000000");
}

#[tokio::test]
async fn reverted_execution_patches_failed_and_refreshes() {
    let h = connected_harness(100 * ONE).await;

    let ticket = h.orchestrator.submit(instant("10")).await.unwrap();
    assert_eq!(h.balances.snapshot().unwrap().token_balance, 90 * ONE);

    h.signer
        .take_finality_handle()
        .send(ChainOutcome::Reverted)
        .unwrap();
    let outcome = ticket.outcome().await;
    assert!(matches!(outcome, TransferOutcome::Failed { .. }));

    let patches = h.ledger.patches();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].1, LedgerStatus::Failed);
    assert_eq!(patches[0].2, None);

    // The refresh undid the optimistic debit's inaccuracy.
    assert_eq!(h.balances.snapshot().unwrap().token_balance, 100 * ONE);
}

#[tokio::test]
async fn user_declining_signature_leaves_no_record() {
    let h = connected_harness(100 * ONE).await;
    h.signer.reject_signature.store(true, Ordering::SeqCst);

    let err = h.orchestrator.submit(instant("10")).await.unwrap_err();
    assert!(matches!(err, TransferError::ChainSubmissionRejected));
    assert!(h.ledger.created().is_empty());
    assert_eq!(h.balances.snapshot().unwrap().token_balance, 100 * ONE);
}

#[tokio::test]
async fn confirmation_wait_is_bounded() {
    let h = harness(100 * ONE, Duration::from_millis(50)).await;
    h.session.connect(ChainTag::Avalanche).await.unwrap();
    h.balances
        .refresh(ChainTag::Avalanche, "0xfrom")
        .await
        .unwrap();

    let ticket = h.orchestrator.submit(instant("10")).await.unwrap();
    // Never resolve finality: the bounded wait elapses.
    let outcome = ticket.outcome().await;
    assert!(matches!(outcome, TransferOutcome::TimedOut { .. }));

    // Outcome unknown on chain: no terminal patch was attempted.
    assert!(h.ledger.patches().is_empty());
}

#[tokio::test]
async fn concurrent_attempts_stack_optimistic_debits() {
    let h = connected_harness(100 * ONE).await;

    let first = h.orchestrator.submit(instant("30")).await.unwrap();
    let second = h.orchestrator.submit(instant("20")).await.unwrap();
    assert_eq!(h.balances.snapshot().unwrap().token_balance, 50 * ONE);

    h.source.set_token_balance(50 * ONE);
    h.signer
        .take_finality_handle()
        .send(ChainOutcome::Confirmed {
            gas_used: GAS_USED,
            effective_gas_price: GAS_PRICE,
        })
        .unwrap();
    h.signer
        .take_finality_handle()
        .send(ChainOutcome::Confirmed {
            gas_used: GAS_USED,
            effective_gas_price: GAS_PRICE,
        })
        .unwrap();

    assert!(matches!(first.outcome().await, TransferOutcome::Confirmed { .. }));
    assert!(matches!(second.outcome().await, TransferOutcome::Confirmed { .. }));

    // The refresh overwrote all optimistic adjustments with the
    // authoritative figure, regardless of resolution order.
    assert_eq!(h.balances.snapshot().unwrap().token_balance, 50 * ONE);
    assert_eq!(h.ledger.patches().len(), 2);
}
