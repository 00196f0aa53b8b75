use ksc_wallet_core::chain::ChainTag;
use ksc_wallet_core::config::ServiceConfig;
use ksc_wallet_core::ledger::{HealthGate, LedgerApiClient, TransactionLedgerStore};
use ksc_wallet_core::realtime::{CacheRefreshSink, RealtimeNotifier};
use ksc_wallet_core::utils::format_token_amount;
use ksc_wallet_core::wallet::transfer::{
    EventDispatcher, LoggingEventHandler, TransferOrchestrator, TransferRequest,
};
use ksc_wallet_core::wallet::{BalanceCache, SessionStore, WalletSession};

use ksc_wallet_core::chain::SimulatedProvider;
use ksc_wallet_core::ledger::BackendBalanceSource;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::time())
        .init();

    info!("Starting KSC wallet demo flow");
    let config = ServiceConfig::from_env();
    let chain = ChainTag::Avalanche;

    let api = match LedgerApiClient::new(config.backend_base_url.clone()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to create backend client: {}", e);
            return;
        }
    };

    let provider = Arc::new(SimulatedProvider::new(vec![
        "0x1111111111111111111111111111111111111111".to_string(),
    ]));
    let session = Arc::new(WalletSession::new(
        provider,
        SessionStore::new(config.data_dir.clone()),
    ));

    if !session.should_auto_reconnect().await {
        info!("Previous session was disconnected manually; connecting explicitly anyway");
    }

    let identity = match session
        .connect_simulated(chain, "0x1111111111111111111111111111111111111111".to_string())
        .await
    {
        Ok(identity) => identity,
        Err(e) => {
            error!("Failed to connect session: {}", e);
            return;
        }
    };
    info!("Connected {} on {}", identity.address, identity.chain);

    // Registration yields the backend wallet id used for history queries
    // and push-channel auth. Best-effort: the demo still runs without it.
    match api.register_wallet(&identity.address, chain).await {
        Ok(wallet_id) => session.set_backend_wallet_id(wallet_id),
        Err(e) => warn!("Wallet registration failed: {}", e),
    }

    let signer = match session.transfer_backend() {
        Some(signer) => signer,
        None => {
            error!("No transfer backend after connect");
            return;
        }
    };
    let balances = Arc::new(BalanceCache::new(Arc::new(BackendBalanceSource::new(
        api.clone(),
        signer,
    ))));
    match balances.refresh(chain, &identity.address).await {
        Ok(snapshot) => info!(
            "Token balance: {} KSC",
            format_token_amount(snapshot.token_balance, snapshot.decimals)
        ),
        Err(e) => warn!("Initial balance refresh failed: {}", e),
    }

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register_handler(Box::new(LoggingEventHandler));
    let ledger: Arc<dyn TransactionLedgerStore> = api.clone();
    let orchestrator = TransferOrchestrator::new(
        session.clone(),
        balances.clone(),
        HealthGate::new(api.clone()),
        ledger.clone(),
        Arc::new(dispatcher),
        config.confirmation_timeout,
        config.history_page_size,
    );

    let request = TransferRequest::Instant {
        chain,
        to_address: "0x2222222222222222222222222222222222222222".to_string(),
        amount: "1.50".to_string(),
        memo: Some("demo transfer".to_string()),
    };

    match orchestrator.submit(request).await {
        Ok(ticket) => {
            info!(
                "Submitted as {:?}, awaiting outcome",
                ticket.tx_hash.as_deref().unwrap_or("<scheduled>")
            );
            let outcome = ticket.outcome().await;
            info!("Final outcome: {:?}", outcome);
        }
        Err(e) => {
            error!("Transfer not accepted: {}", e);
            return;
        }
    }

    // Keep reflecting backend-originated status changes until interrupted.
    if let Some(wallet_id) = session.backend_wallet_id() {
        let sink = Arc::new(CacheRefreshSink::new(
            session.clone(),
            balances.clone(),
            ledger,
            config.history_page_size,
        ));
        let notifier = RealtimeNotifier::new(config.events_ws_url.clone(), wallet_id, sink);
        if let Err(e) = notifier.run().await {
            warn!("Push channel ended: {}", e);
        }
    }
}
