//! Cached native and token balances for the active address.
//!
//! The snapshot is replaced wholesale on refresh so both figures always come
//! from the same read. The orchestrator's optimistic debit is a provisional
//! overlay on the cached token balance; it is never ground truth and every
//! successful refresh supersedes it.

use crate::chain::ChainTag;
use crate::ledger::BalanceSource;
use crate::wallet::types::{BalanceSnapshot, WalletError};

use chrono::Utc;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub struct BalanceCache {
    source: Arc<dyn BalanceSource>,
    state: Mutex<Option<BalanceSnapshot>>,
}

impl BalanceCache {
    pub fn new(source: Arc<dyn BalanceSource>) -> Self {
        Self {
            source,
            state: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> Option<BalanceSnapshot> {
        *self.state.lock().unwrap()
    }

    /// Fetch both balances and replace the snapshot atomically. A failed
    /// fetch keeps the previous snapshot in place so the UI never flashes a
    /// spurious zero balance.
    pub async fn refresh(
        &self,
        chain: ChainTag,
        address: &str,
    ) -> Result<BalanceSnapshot, WalletError> {
        match self.source.read_balances(chain, address).await {
            Ok(reading) => {
                let snapshot = BalanceSnapshot {
                    native_balance: reading.native_balance,
                    token_balance: reading.token_balance,
                    decimals: reading.decimals,
                    as_of: Utc::now(),
                };
                *self.state.lock().unwrap() = Some(snapshot);
                debug!(
                    "Refreshed balances for {}: token={} native={}",
                    address, reading.token_balance, reading.native_balance
                );
                Ok(snapshot)
            }
            Err(e) => {
                warn!("Balance refresh failed, keeping previous snapshot: {}", e);
                Err(WalletError::BalanceUnavailable(e.to_string()))
            }
        }
    }

    /// Provisionally debit the cached token balance after a submission the
    /// client believes succeeded, clamped at zero. Overwritten by the next
    /// successful refresh.
    pub fn apply_optimistic_debit(&self, amount_base_units: u128) {
        let mut state = self.state.lock().unwrap();
        if let Some(snapshot) = state.as_mut() {
            snapshot.token_balance = snapshot.token_balance.saturating_sub(amount_base_units);
        }
    }

    /// Drop the snapshot entirely (used on disconnect).
    pub fn clear(&self) {
        *self.state.lock().unwrap() = None;
    }
}
