//! WebSocket message protocol definitions.
//!
//! All messages are JSON-encoded and tagged by a snake_case `type` field.

use fairway_engine::{CollectionName, DrawNotice};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent from client to server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start receiving `changed` messages for a collection.
    ///
    /// The current value is sent immediately.
    Subscribe {
        collection: CollectionName,
        #[serde(default)]
        request_id: Option<String>,
    },

    /// Stop receiving `changed` messages for a collection.
    Unsubscribe {
        collection: CollectionName,
        #[serde(default)]
        request_id: Option<String>,
    },

    /// Keep-alive ping.
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The full current value of a subscribed collection.
    Changed {
        collection: CollectionName,
        value: Value,
    },

    /// A draw notice addressed to this connection's player.
    DrawNotification { notice: DrawNotice },

    /// Response to ping.
    Pong,

    /// Error message.
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(message: impl Into<String>, request_id: Option<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            request_id,
        }
    }

    /// A `changed` message; a missing document is sent as `null`.
    pub fn changed(collection: CollectionName, value: Option<Value>) -> Self {
        ServerMessage::Changed {
            collection,
            value: value.unwrap_or(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_message_deserialization() {
        let json = r#"{"type": "subscribe", "collection": "admittedPlayers", "request_id": "r1"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Subscribe {
                collection,
                request_id,
            } => {
                assert_eq!(collection, CollectionName::AdmittedPlayers);
                assert_eq!(request_id.as_deref(), Some("r1"));
            }
            _ => panic!("Expected Subscribe message"),
        }

        let json = r#"{"type": "ping"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));

        let json = r#"{"type": "subscribe", "collection": "leaderboard"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn test_server_message_serialization() {
        let msg = ServerMessage::Pong;
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);

        let msg = ServerMessage::error("test error", Some("req-1".to_string()));
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""message":"test error""#));
        assert!(json.contains(r#""request_id":"req-1""#));

        let msg = ServerMessage::changed(CollectionName::Draws, None);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "changed", "collection": "draws", "value": null})
        );
    }
}
