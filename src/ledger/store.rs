//! Seams between the orchestrator and the backend.
//!
//! The orchestrator and caches depend on these narrow traits rather than on
//! the HTTP client directly, so tests can substitute in-memory fakes and the
//! client stays the single place that knows about endpoints.

use crate::chain::{ChainError, ChainSigner, ChainTag};
use crate::ledger::client::LedgerApiClient;
use crate::ledger::types::{
    CreateTransactionRequest, LedgerApiError, LedgerStatus, TransactionPage,
};
use crate::utils::parse_token_amount;

use std::sync::Arc;

/// CRUD surface for backend transaction records.
#[async_trait::async_trait]
pub trait TransactionLedgerStore: Send + Sync {
    async fn create(&self, request: &CreateTransactionRequest) -> Result<String, LedgerApiError>;

    async fn patch(
        &self,
        id: &str,
        status: LedgerStatus,
        fee: Option<String>,
    ) -> Result<(), LedgerApiError>;

    async fn list(
        &self,
        wallet_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<TransactionPage, LedgerApiError>;
}

#[async_trait::async_trait]
impl TransactionLedgerStore for LedgerApiClient {
    async fn create(&self, request: &CreateTransactionRequest) -> Result<String, LedgerApiError> {
        self.create_transaction(request).await
    }

    async fn patch(
        &self,
        id: &str,
        status: LedgerStatus,
        fee: Option<String>,
    ) -> Result<(), LedgerApiError> {
        self.patch_transaction(id, status, fee).await
    }

    async fn list(
        &self,
        wallet_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<TransactionPage, LedgerApiError> {
        self.transaction_history(wallet_id, page, limit).await
    }
}

/// One coherent read of both balances, taken at a single point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceReading {
    pub native_balance: u128,
    pub token_balance: u128,
    pub decimals: u32,
}

/// Source of balance readings for the cache.
#[async_trait::async_trait]
pub trait BalanceSource: Send + Sync {
    async fn read_balances(
        &self,
        chain: ChainTag,
        address: &str,
    ) -> Result<BalanceReading, LedgerApiError>;
}

/// Balance source combining the backend token proxy with a chain-side
/// native-balance read.
pub struct BackendBalanceSource {
    api: Arc<LedgerApiClient>,
    signer: Arc<dyn ChainSigner>,
}

impl BackendBalanceSource {
    pub fn new(api: Arc<LedgerApiClient>, signer: Arc<dyn ChainSigner>) -> Self {
        Self { api, signer }
    }
}

#[async_trait::async_trait]
impl BalanceSource for BackendBalanceSource {
    async fn read_balances(
        &self,
        chain: ChainTag,
        address: &str,
    ) -> Result<BalanceReading, LedgerApiError> {
        let payload = self.api.token_balance(chain, address).await?;
        let token_balance = payload
            .balance
            .parse::<u128>()
            .or_else(|_| parse_token_amount(&payload.balance, payload.decimals))
            .map_err(|e| LedgerApiError::Api {
                status_code: 500,
                message: format!("unparseable balance payload: {}", e),
            })?;

        let native_balance = self
            .signer
            .read_native_balance(address)
            .await
            .map_err(|e: ChainError| LedgerApiError::NetworkUnavailable(e.to_string()))?;

        Ok(BalanceReading {
            native_balance,
            token_balance,
            decimals: payload.decimals,
        })
    }
}

/// Backend availability probe.
#[async_trait::async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe_system(&self) -> Result<bool, LedgerApiError>;
}

#[async_trait::async_trait]
impl HealthProbe for LedgerApiClient {
    async fn probe_system(&self) -> Result<bool, LedgerApiError> {
        self.system_health().await
    }
}
