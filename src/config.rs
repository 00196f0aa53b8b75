//! Runtime configuration, read from the environment with local-dev defaults.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the KSC backend REST API.
    pub backend_base_url: String,
    /// WebSocket URL of the backend events namespace.
    pub events_ws_url: String,
    /// Bound on the chain-confirmation wait per transfer attempt.
    pub confirmation_timeout: Duration,
    /// Directory for persisted session flags.
    pub data_dir: PathBuf,
    /// Page size used for history re-lists.
    pub history_page_size: u32,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self {
            backend_base_url: env_or("KSC_BACKEND_URL", "http://localhost:4000"),
            events_ws_url: env_or("KSC_EVENTS_WS_URL", "ws://localhost:4000/events"),
            confirmation_timeout: Duration::from_secs(
                env_or("KSC_CONFIRMATION_TIMEOUT_SECS", "90")
                    .parse()
                    .unwrap_or(90),
            ),
            data_dir: PathBuf::from(env_or("KSC_DATA_DIR", ".ksc-wallet")),
            history_page_size: env_or("KSC_HISTORY_PAGE_SIZE", "10").parse().unwrap_or(10),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
