//! Wallet session: the single source of truth for "who is connected, on
//! which chain, with what capability".
//!
//! All identity mutation funnels through session methods; no other module
//! writes identity fields. The transfer backend (provider-backed or
//! simulated) is selected once at connect time and handed to the
//! orchestrator as a capability, so nothing downstream branches on a mock
//! flag. A manual disconnect is persisted through a small file-backed store
//! so auto-reconnect stays suppressed across restarts until the user
//! reconnects explicitly.

use crate::chain::{
    ChainSigner, ChainTag, ProviderError, SimulatedSigner, WalletProvider,
};
use crate::wallet::types::{WalletError, WalletIdentity};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

struct SessionState {
    identity: Option<WalletIdentity>,
    backend: Option<Arc<dyn ChainSigner>>,
    backend_wallet_id: Option<String>,
}

pub struct WalletSession {
    provider: Arc<dyn WalletProvider>,
    store: SessionStore,
    state: Mutex<SessionState>,
}

impl WalletSession {
    pub fn new(provider: Arc<dyn WalletProvider>, store: SessionStore) -> Self {
        Self {
            provider,
            store,
            state: Mutex::new(SessionState {
                identity: None,
                backend: None,
                backend_wallet_id: None,
            }),
        }
    }

    /// Connect through the external provider: request accounts, switch
    /// chain, take the signer capability. Failure leaves state unchanged.
    pub async fn connect(&self, chain: ChainTag) -> Result<WalletIdentity, WalletError> {
        let accounts = self.provider.request_accounts().await.map_err(|e| match e {
            ProviderError::Rejected => WalletError::ConnectionRejected,
            ProviderError::Unavailable => WalletError::ProviderUnavailable,
            ProviderError::Other(msg) => WalletError::Provider(msg),
        })?;
        let address = accounts
            .into_iter()
            .next()
            .ok_or(WalletError::ConnectionRejected)?;

        self.provider
            .request_chain_switch(&chain.config())
            .await
            .map_err(|e| WalletError::Provider(e.to_string()))?;

        let identity = WalletIdentity {
            address,
            chain,
            is_mock: false,
        };
        let signer = self.provider.signer(chain);
        {
            let mut state = self.state.lock().unwrap();
            state.identity = Some(identity.clone());
            state.backend = Some(signer);
        }
        self.store.set_manual_disconnect(false).await?;

        info!("Connected {} on {}", identity.address, chain);
        Ok(identity)
    }

    /// Connect against a simulated backend. No provider interaction; the
    /// transfer backend is a simulated signer selected here, once.
    pub async fn connect_simulated(
        &self,
        chain: ChainTag,
        address: String,
    ) -> Result<WalletIdentity, WalletError> {
        let identity = WalletIdentity {
            address,
            chain,
            is_mock: true,
        };
        {
            let mut state = self.state.lock().unwrap();
            state.identity = Some(identity.clone());
            state.backend = Some(Arc::new(SimulatedSigner::new(chain)));
        }
        self.store.set_manual_disconnect(false).await?;

        info!("Connected simulated session {} on {}", identity.address, chain);
        Ok(identity)
    }

    /// Disconnect explicitly and persist the manual-disconnect flag.
    pub async fn disconnect(&self) -> Result<(), WalletError> {
        self.clear_identity();
        self.store.set_manual_disconnect(true).await
    }

    /// Whether a reload should attempt reconnection. False after an
    /// explicit disconnect, until the user reconnects.
    pub async fn should_auto_reconnect(&self) -> bool {
        !self.store.manual_disconnect().await
    }

    /// Provider-pushed account change. Empty list is treated as a
    /// provider-side disconnect; otherwise the address is updated and the
    /// signer capability refreshed.
    pub fn on_external_accounts_changed(&self, accounts: &[String]) {
        let mut state = self.state.lock().unwrap();
        let Some(identity) = state.identity.as_mut() else {
            return;
        };

        match accounts.first() {
            None => {
                info!("Provider reported no accounts, clearing session");
                state.identity = None;
                state.backend = None;
                state.backend_wallet_id = None;
            }
            Some(address) => {
                identity.address = address.clone();
                if !identity.is_mock {
                    let chain = identity.chain;
                    state.backend = Some(self.provider.signer(chain));
                }
                state.backend_wallet_id = None;
            }
        }
    }

    /// Provider-pushed chain change. Unknown ids surface a warning but do
    /// not disconnect.
    pub fn on_external_chain_changed(&self, chain_id: u64) -> Result<(), WalletError> {
        let Some(chain) = ChainTag::from_chain_id(chain_id) else {
            warn!("Provider switched to unsupported chain id {}", chain_id);
            return Err(WalletError::UnsupportedChain(chain_id));
        };

        let mut state = self.state.lock().unwrap();
        if let Some(identity) = state.identity.as_mut() {
            identity.chain = chain;
            if !identity.is_mock {
                state.backend = Some(self.provider.signer(chain));
            }
        }
        Ok(())
    }

    pub fn identity(&self) -> Option<WalletIdentity> {
        self.state.lock().unwrap().identity.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().unwrap().identity.is_some()
    }

    /// Transfer backend selected at connect time, if connected.
    pub fn transfer_backend(&self) -> Option<Arc<dyn ChainSigner>> {
        self.state.lock().unwrap().backend.clone()
    }

    /// Backend-assigned wallet id, once registered.
    pub fn backend_wallet_id(&self) -> Option<String> {
        self.state.lock().unwrap().backend_wallet_id.clone()
    }

    pub fn set_backend_wallet_id(&self, id: String) {
        self.state.lock().unwrap().backend_wallet_id = Some(id);
    }

    fn clear_identity(&self) {
        let mut state = self.state.lock().unwrap();
        state.identity = None;
        state.backend = None;
        state.backend_wallet_id = None;
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct SessionFile {
    #[serde(rename = "manualDisconnect")]
    manual_disconnect: bool,
    #[serde(rename = "updatedAt")]
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// File-backed store for session flags that must survive a restart.
#[derive(Clone)]
pub struct SessionStore {
    data_dir: PathBuf,
}

impl SessionStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn session_file(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub async fn manual_disconnect(&self) -> bool {
        match tokio::fs::read_to_string(self.session_file()).await {
            Ok(content) => serde_json::from_str::<SessionFile>(&content)
                .map(|f| f.manual_disconnect)
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    pub async fn set_manual_disconnect(&self, value: bool) -> Result<(), WalletError> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| WalletError::Store(format!("failed to create data dir: {}", e)))?;

        let file = SessionFile {
            manual_disconnect: value,
            updated_at: Some(chrono::Utc::now()),
        };
        let content = serde_json::to_string_pretty(&file)
            .map_err(|e| WalletError::Store(format!("failed to serialize session file: {}", e)))?;
        tokio::fs::write(self.session_file(), content)
            .await
            .map_err(|e| WalletError::Store(format!("failed to write session file: {}", e)))
    }
}
