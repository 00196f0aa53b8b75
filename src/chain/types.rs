//! Types for the external wallet-provider and chain-submission interface.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Supported chains, as a closed set. Unknown chain ids reported by the
/// provider never map into this enum; callers surface them as warnings
/// instead of defaulting silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainTag {
    #[serde(rename = "avalanche")]
    Avalanche,
    #[serde(rename = "xrpl")]
    XrplEvm,
}

impl ChainTag {
    /// Wire value used in backend URLs and request bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainTag::Avalanche => "avalanche",
            ChainTag::XrplEvm => "xrpl",
        }
    }

    /// Map a provider-reported chain id to a supported chain, if any.
    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            43113 => Some(ChainTag::Avalanche),
            1440002 => Some(ChainTag::XrplEvm),
            _ => None,
        }
    }

    /// Static connection parameters for this chain.
    pub fn config(&self) -> ChainConfig {
        match self {
            ChainTag::Avalanche => ChainConfig {
                chain_id: 43113,
                name: "Avalanche Fuji",
                rpc_url: "https://api.avax-test.network/ext/bc/C/rpc",
                currency_symbol: "AVAX",
            },
            ChainTag::XrplEvm => ChainConfig {
                chain_id: 1440002,
                name: "XRPL EVM Devnet",
                rpc_url: "https://rpc-evm-sidechain.xrpl.org",
                currency_symbol: "XRP",
            },
        }
    }
}

impl std::fmt::Display for ChainTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters passed to the provider when requesting a chain switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: &'static str,
    pub rpc_url: &'static str,
    pub currency_symbol: &'static str,
}

/// Terminal result of a mined chain submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Mined successfully; fee components in native base units.
    Confirmed {
        gas_used: u128,
        effective_gas_price: u128,
    },
    /// Mined but reverted.
    Reverted,
}

impl ChainOutcome {
    /// Actual fee paid, or zero for reverted-without-fee reporting.
    pub fn fee(&self) -> u128 {
        match self {
            ChainOutcome::Confirmed {
                gas_used,
                effective_gas_price,
            } => gas_used.saturating_mul(*effective_gas_price),
            ChainOutcome::Reverted => 0,
        }
    }
}

/// A submission the chain has accepted but not yet mined. The hash is
/// assigned immediately; the outcome resolves when finality is observed.
#[derive(Debug)]
pub struct PendingSubmission {
    pub tx_hash: String,
    pub outcome: oneshot::Receiver<ChainOutcome>,
}

/// Errors from the chain-side signer capability.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The user declined to sign the transfer.
    #[error("signature request rejected by user")]
    SubmissionRejected,

    #[error("provider error: {0}")]
    Provider(String),

    #[error("failed to read token decimals: {0}")]
    Decimals(String),
}

/// Errors from the wallet-provider connection surface.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("connection request rejected by user")]
    Rejected,

    #[error("no wallet provider available")]
    Unavailable,

    #[error("provider error: {0}")]
    Other(String),
}

/// Events pushed by the provider after connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(u64),
}
