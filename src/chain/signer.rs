//! Chain-submission capability and its simulated implementation.
//!
//! The `ChainSigner` trait is the single seam through which transfers reach a
//! chain. A provider-backed implementation wraps a browser-extension style
//! signer; the `SimulatedSigner` stands in for it when the session runs
//! against a simulated backend. The implementation is selected once at
//! connect time, so no call site branches on a mock flag.

use crate::chain::types::{ChainError, ChainOutcome, ChainTag, PendingSubmission};

use rand::Rng;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Capability for reading token metadata and submitting signed transfers.
#[async_trait::async_trait]
pub trait ChainSigner: Send + Sync {
    /// Token precision, read from the deployed contract at call time.
    async fn read_decimals(&self) -> Result<u32, ChainError>;

    /// Native-currency balance of an address, in base units.
    async fn read_native_balance(&self, address: &str) -> Result<u128, ChainError>;

    /// Submit a single transfer. Resolves as soon as a hash is assigned.
    async fn send_transfer(
        &self,
        to: &str,
        amount_base_units: u128,
    ) -> Result<PendingSubmission, ChainError>;

    /// Submit a batch transfer: one signature, one hash, many recipients.
    async fn send_batch_transfer(
        &self,
        recipients: &[String],
        amounts_base_units: &[u128],
    ) -> Result<PendingSubmission, ChainError>;
}

const SIMULATED_DECIMALS: u32 = 18;
const SIMULATED_GAS_USED: u128 = 52_000;
const SIMULATED_GAS_PRICE: u128 = 25_000_000_000;

/// Signer that fabricates hashes and confirms after a short delay, for
/// local development without a wallet extension.
pub struct SimulatedSigner {
    chain: ChainTag,
    confirmation_delay: Duration,
}

impl SimulatedSigner {
    pub fn new(chain: ChainTag) -> Self {
        Self {
            chain,
            confirmation_delay: Duration::from_millis(400),
        }
    }

    pub fn with_confirmation_delay(chain: ChainTag, delay: Duration) -> Self {
        Self {
            chain,
            confirmation_delay: delay,
        }
    }

    fn fabricate_hash() -> String {
        let mut bytes = [0u8; 32];
        rand::rng().fill(&mut bytes);
        format!("0x{}", hex::encode(bytes))
    }

    fn submit(&self) -> PendingSubmission {
        let tx_hash = Self::fabricate_hash();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let delay = self.confirmation_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = outcome_tx.send(ChainOutcome::Confirmed {
                gas_used: SIMULATED_GAS_USED,
                effective_gas_price: SIMULATED_GAS_PRICE,
            });
        });

        PendingSubmission {
            tx_hash,
            outcome: outcome_rx,
        }
    }
}

#[async_trait::async_trait]
impl ChainSigner for SimulatedSigner {
    async fn read_decimals(&self) -> Result<u32, ChainError> {
        Ok(SIMULATED_DECIMALS)
    }

    async fn read_native_balance(&self, address: &str) -> Result<u128, ChainError> {
        debug!("Simulated native balance read for {}", address);
        Ok(10u128.pow(SIMULATED_DECIMALS))
    }

    async fn send_transfer(
        &self,
        to: &str,
        amount_base_units: u128,
    ) -> Result<PendingSubmission, ChainError> {
        let pending = self.submit();
        info!(
            "Simulated transfer of {} base units to {} on {} ({})",
            amount_base_units, to, self.chain, pending.tx_hash
        );
        Ok(pending)
    }

    async fn send_batch_transfer(
        &self,
        recipients: &[String],
        amounts_base_units: &[u128],
    ) -> Result<PendingSubmission, ChainError> {
        if recipients.len() != amounts_base_units.len() {
            return Err(ChainError::Provider(
                "batch recipients and amounts differ in length".to_string(),
            ));
        }
        let pending = self.submit();
        info!(
            "Simulated batch transfer to {} recipients on {} ({})",
            recipients.len(),
            self.chain,
            pending.tx_hash
        );
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_signer_confirms_with_fee_components() {
        let signer =
            SimulatedSigner::with_confirmation_delay(ChainTag::Avalanche, Duration::from_millis(5));
        let pending = signer.send_transfer("0xabc", 1_000).await.unwrap();
        assert!(pending.tx_hash.starts_with("0x"));
        assert_eq!(pending.tx_hash.len(), 66);

        let outcome = pending.outcome.await.unwrap();
        assert!(matches!(outcome, ChainOutcome::Confirmed { .. }));
        assert_eq!(outcome.fee(), SIMULATED_GAS_USED * SIMULATED_GAS_PRICE);
    }

    #[tokio::test]
    async fn batch_length_mismatch_is_rejected() {
        let signer = SimulatedSigner::new(ChainTag::XrplEvm);
        let err = signer
            .send_batch_transfer(&["0xa".to_string()], &[1, 2])
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Provider(_)));
    }
}
