//! WebSocket message types.
//!
//! Every frame is a JSON envelope `{"type": ..., "payload": ...}`. Payloads are
//! typed on the Rust side and carried as JSON values on the wire.

use serde::{Deserialize, Serialize};

/// Server -> Client message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub payload: serde_json::Value,
}

impl ServerMessage {
    pub fn new(msg_type: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn empty(msg_type: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::new(msg_types::ERROR, system::Error::new(code, message))
    }
}

/// Client -> Server message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

pub mod system {
    use serde::{Deserialize, Serialize};

    /// Sent right after the upgrade.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Connected {
        pub user_id: usize,
        pub server_version: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Error {
        pub code: String,
        pub message: String,
    }

    impl Error {
        pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
            Self {
                code: code.into(),
                message: message.into(),
            }
        }
    }
}

pub mod msg_types {
    pub const CONNECTED: &str = "connected";
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
    pub const ERROR: &str = "error";
    /// Payload is a `FeedEvent`.
    pub const FEED: &str = "feed";
    /// Payload is a `PlaybackUpdate`.
    pub const PLAYBACK_COMMANDS: &str = "playback.commands";
    /// Client request, payload is a `PlaybackOp`.
    pub const PLAYBACK_COMMAND: &str = "playback.command";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::FeedEvent;

    #[test]
    fn server_message_envelope() {
        let msg = ServerMessage::new(
            msg_types::FEED,
            FeedEvent::PostDeleted {
                post_id: "p1".to_string(),
            },
        );
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "feed");
        assert_eq!(json["payload"]["event"], "post_deleted");
        assert_eq!(json["payload"]["post_id"], "p1");
    }

    #[test]
    fn client_message_payload_is_optional() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg.msg_type, msg_types::PING);
        assert!(msg.payload.is_null());
    }

    #[test]
    fn error_message_carries_code() {
        let json = serde_json::to_value(ServerMessage::error("parse_error", "bad")).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["payload"]["code"], "parse_error");
    }
}
