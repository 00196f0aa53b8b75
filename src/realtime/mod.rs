//! Realtime push-channel module.
//!
//! Inbound event channel for backend-originated transaction status changes,
//! with the auth/subscribe handshake and bounded reconnection.

/// Push-channel client and refresh sink
mod notifier;
/// Channel message types
mod types;

pub use notifier::{CacheRefreshSink, RealtimeNotifier, StatusChangeSink};
pub use types::*;
