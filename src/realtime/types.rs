//! Message types for the backend push channel.

use crate::ledger::LedgerStatus;

use serde::{Deserialize, Serialize};

/// Event type the client subscribes to.
pub const STATUS_CHANGED_EVENT: &str = "transaction.status.changed";

/// Messages emitted by the client on the push channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "auth")]
    Auth {
        #[serde(rename = "walletId")]
        wallet_id: String,
    },
    #[serde(rename = "subscribe")]
    Subscribe {
        #[serde(rename = "eventTypes")]
        event_types: Vec<String>,
    },
}

/// Messages emitted by the server. Unknown types are skipped.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "auth_success")]
    AuthSuccess,
    #[serde(rename = "subscribe_success")]
    SubscribeSuccess,
    #[serde(rename = "subscribe_error")]
    SubscribeError { message: Option<String> },
    #[serde(rename = "transaction.status.changed")]
    TransactionStatusChanged { data: StatusChangedPayload },
    #[serde(other)]
    Unknown,
}

/// Payload of a transaction status-change event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangedPayload {
    pub transaction_id: String,
    pub status: LedgerStatus,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub fee: Option<String>,
}

/// Errors for the push channel.
#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("subscription rejected: {0}")]
    SubscriptionRejected(String),

    #[error("push channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_match_wire_shape() {
        let auth = serde_json::to_value(ClientMessage::Auth {
            wallet_id: "w-1".into(),
        })
        .unwrap();
        assert_eq!(auth["type"], "auth");
        assert_eq!(auth["walletId"], "w-1");

        let subscribe = serde_json::to_value(ClientMessage::Subscribe {
            event_types: vec![STATUS_CHANGED_EVENT.to_string()],
        })
        .unwrap();
        assert_eq!(subscribe["type"], "subscribe");
        assert_eq!(subscribe["eventTypes"][0], STATUS_CHANGED_EVENT);
    }

    #[test]
    fn status_event_deserializes() {
        let json = r#"{
            "type": "transaction.status.changed",
            "data": {"transactionId": "tx-9", "status": "CONFIRMED", "fee": "1300000000000000"}
        }"#;
        let message: ServerMessage = serde_json::from_str(json).unwrap();
        match message {
            ServerMessage::TransactionStatusChanged { data } => {
                assert_eq!(data.transaction_id, "tx-9");
                assert_eq!(data.status, LedgerStatus::Confirmed);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn unknown_server_messages_are_tolerated() {
        let message: ServerMessage = serde_json::from_str(r#"{"type": "heartbeat"}"#).unwrap();
        assert!(matches!(message, ServerMessage::Unknown));
    }
}
