//! Pre-flight backend availability gate.

use crate::ledger::store::HealthProbe;

use std::sync::Arc;
use tracing::warn;

/// Gate consulted once per transfer attempt before anything is signed or
/// persisted. Fails closed: any probe failure reads as unavailable. Results
/// are never cached across attempts.
#[derive(Clone)]
pub struct HealthGate {
    probe: Arc<dyn HealthProbe>,
}

impl HealthGate {
    pub fn new(probe: Arc<dyn HealthProbe>) -> Self {
        Self { probe }
    }

    pub async fn check_healthy(&self) -> bool {
        match self.probe.probe_system().await {
            Ok(true) => true,
            Ok(false) => {
                warn!("Backend reported unhealthy system status");
                false
            }
            Err(e) => {
                warn!("Health probe failed, treating system as unavailable: {}", e);
                false
            }
        }
    }
}
