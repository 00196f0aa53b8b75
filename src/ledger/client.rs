//!
//! HTTP client for the KSC backend REST API.
//!
//! Thin typed wrapper over the backend endpoints: transaction record CRUD,
//! wallet registration, balance and health reads, token info, and the admin
//! mint/burn/pause surface. All methods are async and designed for use with
//! Tokio.

use crate::chain::ChainTag;
use crate::ledger::types::*;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// KSC backend API client
#[derive(Clone)]
pub struct LedgerApiClient {
    http_client: Client,
    base_url: String,
}

impl LedgerApiClient {
    /// Create a new backend client for the given base URL.
    pub fn new(base_url: String) -> Result<Self, LedgerApiError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LedgerApiError::NetworkUnavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decode an envelope, mapping `success: false` to an API error.
    fn unwrap_envelope<T>(envelope: ApiEnvelope<T>) -> Result<T, LedgerApiError> {
        if !envelope.success {
            let status_code = envelope.status_code.unwrap_or(500);
            return Err(LedgerApiError::Api {
                status_code,
                message: envelope
                    .message
                    .unwrap_or_else(|| LedgerApiError::message_key(status_code).to_string()),
            });
        }
        envelope
            .data
            .ok_or_else(|| LedgerApiError::Api {
                status_code: 500,
                message: "missing data in success envelope".to_string(),
            })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, LedgerApiError> {
        debug!("GET {}", path);
        let response = self.http_client.get(self.url(path)).send().await?;
        let body = response.text().await?;
        let envelope: ApiEnvelope<T> = serde_json::from_str(&body)?;
        Self::unwrap_envelope(envelope)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, LedgerApiError> {
        debug!("POST {}", path);
        let response = self.http_client.post(self.url(path)).json(body).send().await?;
        let body = response.text().await?;
        let envelope: ApiEnvelope<T> = serde_json::from_str(&body)?;
        Self::unwrap_envelope(envelope)
    }

    /// Token balance of an address, via the backend proxy.
    pub async fn token_balance(
        &self,
        chain: ChainTag,
        address: &str,
    ) -> Result<BalancePayload, LedgerApiError> {
        self.get(&format!("/balance/{}/{}", chain.as_str(), address))
            .await
    }

    /// Lightweight backend/bridge availability probe. Any transport failure
    /// or non-success payload reads as unhealthy.
    pub async fn system_health(&self) -> Result<bool, LedgerApiError> {
        let response = self
            .http_client
            .get(self.url("/health/system"))
            .send()
            .await?;
        let body = response.text().await?;
        let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_str(&body)?;
        Ok(envelope.success)
    }

    /// Register (or look up) a wallet, returning the backend-internal id
    /// used for history queries and push-channel auth.
    pub async fn register_wallet(
        &self,
        address: &str,
        chain: ChainTag,
    ) -> Result<String, LedgerApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Body<'a> {
            address: &'a str,
            network_type: ChainTag,
        }

        #[derive(serde::Deserialize)]
        struct Registered {
            id: String,
        }

        let registered: Registered = self
            .post(
                "/wallet",
                &Body {
                    address,
                    network_type: chain,
                },
            )
            .await?;
        info!("Registered wallet {} as backend id {}", address, registered.id);
        Ok(registered.id)
    }

    /// Create a transaction record, returning its backend id.
    pub async fn create_transaction(
        &self,
        request: &CreateTransactionRequest,
    ) -> Result<String, LedgerApiError> {
        #[derive(serde::Deserialize)]
        struct Created {
            id: String,
        }

        let created: Created = self
            .post("/transaction", request)
            .await
            .map_err(|e| LedgerApiError::PersistenceFailed(e.to_string()))?;
        Ok(created.id)
    }

    /// Patch a record to a new status, with the actual fee once known.
    pub async fn patch_transaction(
        &self,
        id: &str,
        status: LedgerStatus,
        fee: Option<String>,
    ) -> Result<(), LedgerApiError> {
        #[derive(Serialize)]
        struct Body {
            status: LedgerStatus,
            #[serde(skip_serializing_if = "Option::is_none")]
            fee: Option<String>,
        }

        debug!("PATCH /transaction/{} -> {:?}", id, status);
        let response = self
            .http_client
            .patch(self.url(&format!("/transaction/{}", id)))
            .json(&Body { status, fee })
            .send()
            .await
            .map_err(|e| LedgerApiError::ReconciliationFailed(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| LedgerApiError::ReconciliationFailed(e.to_string()))?;
        let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_str(&body)
            .map_err(|e| LedgerApiError::ReconciliationFailed(e.to_string()))?;
        Self::unwrap_envelope(envelope)
            .map(|_| ())
            .map_err(|e| LedgerApiError::ReconciliationFailed(e.to_string()))
    }

    /// Paginated transaction history for a registered wallet.
    pub async fn transaction_history(
        &self,
        wallet_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<TransactionPage, LedgerApiError> {
        self.get(&format!(
            "/transaction/history/{}?limit={}&page={}",
            wallet_id, limit, page
        ))
        .await
    }

    /// Token supply figures for the dashboard.
    pub async fn token_info(&self, chain: ChainTag) -> Result<TokenInfo, LedgerApiError> {
        self.get(&format!("/external/token-info/{}", chain.as_str()))
            .await
    }

    /// Admin: mint tokens to an address.
    pub async fn mint(&self, request: &AdminTokenRequest) -> Result<String, LedgerApiError> {
        self.admin_action("/admin/mint", request).await
    }

    /// Admin: burn tokens from an address.
    pub async fn burn(&self, request: &AdminTokenRequest) -> Result<String, LedgerApiError> {
        self.admin_action("/admin/burn", request).await
    }

    /// Admin: pause token transfers on a chain.
    pub async fn pause(&self, chain: ChainTag) -> Result<String, LedgerApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Body {
            network_type: ChainTag,
        }
        self.admin_action("/admin/pause", &Body { network_type: chain })
            .await
    }

    /// Admin: resume token transfers on a chain.
    pub async fn unpause(&self, chain: ChainTag) -> Result<String, LedgerApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Body {
            network_type: ChainTag,
        }
        self.admin_action("/admin/unpause", &Body { network_type: chain })
            .await
    }

    /// Admin endpoints answer `{success, message}` with no data payload.
    async fn admin_action<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, LedgerApiError> {
        debug!("POST {}", path);
        let response = self.http_client.post(self.url(path)).json(body).send().await?;
        let text = response.text().await?;
        let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_str(&text)?;
        if !envelope.success {
            let status_code = envelope.status_code.unwrap_or(500);
            return Err(LedgerApiError::Api {
                status_code,
                message: envelope
                    .message
                    .unwrap_or_else(|| LedgerApiError::message_key(status_code).to_string()),
            });
        }
        Ok(envelope.message.unwrap_or_default())
    }
}
