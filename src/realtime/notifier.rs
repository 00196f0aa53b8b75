//!
//! Push-channel client for backend-originated status changes.
//!
//! Maintains a WebSocket connection keyed by the wallet's backend-assigned
//! id. The server requires an auth handshake before it accepts an event
//! subscription; once subscribed, `transaction.status.changed` events run
//! the same refresh path as post-confirmation reconciliation, so status
//! changes originating elsewhere (e.g. scheduled execution on the backend)
//! are reflected without a manual refresh.

use crate::ledger::TransactionLedgerStore;
use crate::realtime::types::{
    ClientMessage, RealtimeError, STATUS_CHANGED_EVENT, ServerMessage, StatusChangedPayload,
};
use crate::wallet::balance::BalanceCache;
use crate::wallet::session::WalletSession;

use backoff::ExponentialBackoff;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Receiver of status-change events.
#[async_trait::async_trait]
pub trait StatusChangeSink: Send + Sync {
    async fn on_status_changed(&self, event: &StatusChangedPayload);
}

/// Sink that refreshes the balance cache and re-lists history, mirroring
/// the orchestrator's reconciliation refresh.
pub struct CacheRefreshSink {
    session: Arc<WalletSession>,
    balances: Arc<BalanceCache>,
    ledger: Arc<dyn TransactionLedgerStore>,
    history_page_size: u32,
}

impl CacheRefreshSink {
    pub fn new(
        session: Arc<WalletSession>,
        balances: Arc<BalanceCache>,
        ledger: Arc<dyn TransactionLedgerStore>,
        history_page_size: u32,
    ) -> Self {
        Self {
            session,
            balances,
            ledger,
            history_page_size,
        }
    }
}

#[async_trait::async_trait]
impl StatusChangeSink for CacheRefreshSink {
    async fn on_status_changed(&self, event: &StatusChangedPayload) {
        info!(
            "Transaction {} changed to {:?}, refreshing caches",
            event.transaction_id, event.status
        );

        if let Some(identity) = self.session.identity() {
            if let Err(e) = self.balances.refresh(identity.chain, &identity.address).await {
                warn!("Balance refresh after status change failed: {}", e);
            }
        }
        if let Some(wallet_id) = self.session.backend_wallet_id() {
            if let Err(e) = self
                .ledger
                .list(&wallet_id, 1, self.history_page_size)
                .await
            {
                warn!("History re-list after status change failed: {}", e);
            }
        }
    }
}

/// Push-channel client for one registered wallet.
pub struct RealtimeNotifier {
    ws_url: String,
    wallet_id: String,
    sink: Arc<dyn StatusChangeSink>,
}

impl RealtimeNotifier {
    /// Create a notifier for the backend events endpoint (the `/events`
    /// namespace URL) and a registered wallet id.
    pub fn new(ws_url: String, wallet_id: String, sink: Arc<dyn StatusChangeSink>) -> Self {
        Self {
            ws_url,
            wallet_id,
            sink,
        }
    }

    /// Run the channel until it is torn down, reconnecting with bounded
    /// exponential backoff. Auth and subscription rejections are permanent;
    /// transport drops are transient.
    pub async fn run(&self) -> Result<(), RealtimeError> {
        let policy = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(300)),
            ..ExponentialBackoff::default()
        };

        backoff::future::retry(policy, || async {
            self.connect_and_listen().await.map_err(|e| match e {
                RealtimeError::Handshake(_) | RealtimeError::SubscriptionRejected(_) => {
                    backoff::Error::permanent(e)
                }
                other => {
                    warn!("Push channel dropped, reconnecting: {}", other);
                    backoff::Error::transient(other)
                }
            })
        })
        .await
    }

    /// One connection lifecycle: connect, auth, subscribe, pump events.
    async fn connect_and_listen(&self) -> Result<(), RealtimeError> {
        debug!("Connecting push channel to {}", self.ws_url);
        let (ws_stream, response) = connect_async(&self.ws_url).await?;
        debug!("Push channel connected, response status: {}", response.status());
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let auth = ClientMessage::Auth {
            wallet_id: self.wallet_id.clone(),
        };
        ws_sender
            .send(Message::Text(serde_json::to_string(&auth)?))
            .await?;
        match Self::next_server_message(&mut ws_receiver).await? {
            ServerMessage::AuthSuccess => {}
            other => {
                return Err(RealtimeError::Handshake(format!(
                    "expected auth_success, got {:?}",
                    other
                )));
            }
        }

        let subscribe = ClientMessage::Subscribe {
            event_types: vec![STATUS_CHANGED_EVENT.to_string()],
        };
        ws_sender
            .send(Message::Text(serde_json::to_string(&subscribe)?))
            .await?;
        match Self::next_server_message(&mut ws_receiver).await? {
            ServerMessage::SubscribeSuccess => {}
            ServerMessage::SubscribeError { message } => {
                return Err(RealtimeError::SubscriptionRejected(
                    message.unwrap_or_else(|| "no reason given".to_string()),
                ));
            }
            other => {
                return Err(RealtimeError::Handshake(format!(
                    "expected subscribe_success, got {:?}",
                    other
                )));
            }
        }

        info!("Subscribed to {} for wallet {}", STATUS_CHANGED_EVENT, self.wallet_id);

        while let Some(message) = ws_receiver.next().await {
            match message? {
                Message::Text(text) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(ServerMessage::TransactionStatusChanged { data }) => {
                        self.sink.on_status_changed(&data).await;
                    }
                    Ok(other) => debug!("Ignoring push message: {:?}", other),
                    Err(e) => warn!("Unparseable push message: {}", e),
                },
                Message::Close(_) => return Err(RealtimeError::ChannelClosed),
                _ => {}
            }
        }

        Err(RealtimeError::ChannelClosed)
    }

    async fn next_server_message<S>(receiver: &mut S) -> Result<ServerMessage, RealtimeError>
    where
        S: StreamExt<
                Item = Result<Message, tokio_tungstenite::tungstenite::Error>,
            > + Unpin,
    {
        while let Some(message) = receiver.next().await {
            match message? {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(_) => return Err(RealtimeError::ChannelClosed),
                _ => continue,
            }
        }
        Err(RealtimeError::ChannelClosed)
    }
}
