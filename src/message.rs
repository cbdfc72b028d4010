//! Message protocol definitions
//!
//! JSON-based bidirectional frame protocol using Serde's tagged enum
//! for type-safe serialization/deserialization.

use serde::{Deserialize, Serialize};

use crate::room::{MessageRecord, MetadataPatch, RoomMetadata};

/// Client → Room frame
///
/// Unrecognized `type` values decode to `Unknown` and are ignored by the room.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Chat message to append and broadcast
    Chat(MessageRecord),
    /// Merge fields into the room metadata
    MetaUpdate { data: MetadataPatch },
    /// Any other frame type
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse a raw text frame, `None` when it is not a valid frame
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// Room → Client frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Current room metadata, first frame on a new connection
    Meta { meta: RoomMetadata },
    /// Recent history oldest first, second frame on a new connection
    History { messages: Vec<MessageRecord> },
    /// Live chat message
    Chat(MessageRecord),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_deserialize() {
        let json = r#"{"type": "chat", "text": "hi", "sender": "u1", "ts": 1000}"#;
        match ClientMessage::parse(json) {
            Some(ClientMessage::Chat(record)) => {
                assert_eq!(record.text, "hi");
                assert_eq!(record.sender.as_str(), "u1");
                assert_eq!(record.timestamp, 1000);
            }
            other => panic!("Wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_meta_update_deserialize() {
        let json = r#"{"type": "meta-update", "data": {"name": "Renamed"}}"#;
        match ClientMessage::parse(json) {
            Some(ClientMessage::MetaUpdate { data }) => {
                assert_eq!(data.name.as_deref(), Some("Renamed"));
                assert!(data.members.is_none());
            }
            other => panic!("Wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_tolerated() {
        let json = r#"{"type": "typing", "sender": "u1"}"#;
        assert!(matches!(ClientMessage::parse(json), Some(ClientMessage::Unknown)));
    }

    #[test]
    fn test_malformed_frames_rejected() {
        assert!(ClientMessage::parse("not json").is_none());
        assert!(ClientMessage::parse(r#"{"type": "chat", "text": "hi"}"#).is_none());
        assert!(ClientMessage::parse(r#"{"text": "no type"}"#).is_none());
    }

    #[test]
    fn test_server_message_serialize() {
        let msg = ServerMessage::History { messages: vec![] };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"history\""));
        assert!(json.contains("\"messages\":[]"));
    }

    #[test]
    fn test_chat_event_serialize() {
        let msg = ServerMessage::Chat(MessageRecord {
            text: "hi".to_string(),
            sender: crate::types::UserId::new("u1").unwrap(),
            timestamp: 1000,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "chat", "text": "hi", "sender": "u1", "ts": 1000})
        );
    }
}
