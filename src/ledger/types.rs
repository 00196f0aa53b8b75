//! Wire types for the KSC backend REST API.

use crate::chain::ChainTag;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response envelope shared by every backend endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(rename = "statusCode")]
    pub status_code: Option<u16>,
}

/// Status of a backend transaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Kind of payment a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Instant,
    Batch,
    Scheduled,
}

/// Backend-owned transaction record. Created PENDING before chain
/// confirmation and patched at most once to a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub id: String,
    pub tx_hash: Option<String>,
    pub status: LedgerStatus,
    /// Actual fee in native base units, set on confirmation.
    pub fee: Option<String>,
    /// Token amount in base units.
    pub amount: String,
    pub from_address: String,
    pub to_address: String,
    pub payment_type: PaymentType,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub status_updated_at: Option<DateTime<Utc>>,
}

/// Pagination metadata for history listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub limit: u32,
    pub current_page: u32,
    pub total_page: u32,
    pub total_count: u64,
}

/// One page of the transaction history.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionPage {
    pub items: Vec<LedgerRecord>,
    pub pagination: Pagination,
}

/// Payload of the backend balance endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancePayload {
    /// Token balance in base units.
    pub balance: String,
    pub formatted_balance: String,
    pub symbol: String,
    pub decimals: u32,
}

/// Token supply figures for the dashboard.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub max_supply: String,
    pub total_supply: String,
    pub total_burned: String,
    pub network_type: ChainTag,
}

/// Body of `POST /transaction`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub network_type: ChainTag,
    pub payment_type: PaymentType,
    pub from_address: String,
    pub to_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Token amount in base units.
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Body of `POST /admin/mint` and `POST /admin/burn`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminTokenRequest {
    pub network_type: ChainTag,
    pub address: String,
    /// Token amount in base units.
    pub amount: String,
}

/// Errors from the backend API client.
#[derive(Debug, thiserror::Error)]
pub enum LedgerApiError {
    /// A transaction record could not be created.
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),

    /// A terminal-status patch was not accepted. Never retried.
    #[error("reconciliation failed: {0}")]
    ReconciliationFailed(String),

    /// The backend answered with an error envelope.
    #[error("backend error ({status_code}): {message}")]
    Api { status_code: u16, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The response body did not decode as an envelope.
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl From<reqwest::Error> for LedgerApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LedgerApiError::Timeout
        } else {
            LedgerApiError::NetworkUnavailable(err.to_string())
        }
    }
}

impl LedgerApiError {
    /// Localization key for a backend status code. The string tables
    /// themselves live in the front-end layer.
    pub fn message_key(status_code: u16) -> &'static str {
        match status_code {
            400 => "error.badRequest",
            404 => "error.notFound",
            422 => "error.unprocessable",
            500 => "error.internal",
            _ => "error.unknown",
        }
    }
}
