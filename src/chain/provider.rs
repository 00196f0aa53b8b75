//! Wallet-provider connection surface.
//!
//! Abstracts the browser-extension provider contract: account requests,
//! chain switching, and the signer capability handed out after connection.
//! Provider-pushed `accountsChanged` / `chainChanged` notifications are
//! delivered by the host to `WalletSession::on_external_accounts_changed`
//! and `WalletSession::on_external_chain_changed`.

use crate::chain::signer::{ChainSigner, SimulatedSigner};
use crate::chain::types::{ChainConfig, ChainTag, ProviderError};

use std::sync::Arc;
use tracing::info;

/// External wallet provider contract.
#[async_trait::async_trait]
pub trait WalletProvider: Send + Sync {
    /// Request the user's accounts. Fails with `Rejected` if the user
    /// declines, `Unavailable` if no provider is installed.
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError>;

    /// Ask the provider to switch to the given chain.
    async fn request_chain_switch(&self, config: &ChainConfig) -> Result<(), ProviderError>;

    /// Signer capability for the connected account on the given chain.
    fn signer(&self, chain: ChainTag) -> Arc<dyn ChainSigner>;
}

/// Provider that approves every request and hands out simulated signers.
/// Used by the demo binary and by tests that exercise the real connect path.
pub struct SimulatedProvider {
    accounts: Vec<String>,
}

impl SimulatedProvider {
    pub fn new(accounts: Vec<String>) -> Self {
        Self { accounts }
    }
}

#[async_trait::async_trait]
impl WalletProvider for SimulatedProvider {
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        if self.accounts.is_empty() {
            return Err(ProviderError::Rejected);
        }
        Ok(self.accounts.clone())
    }

    async fn request_chain_switch(&self, config: &ChainConfig) -> Result<(), ProviderError> {
        info!("Simulated chain switch to {} ({})", config.name, config.chain_id);
        Ok(())
    }

    fn signer(&self, chain: ChainTag) -> Arc<dyn ChainSigner> {
        Arc::new(SimulatedSigner::new(chain))
    }
}
