//! Wire envelopes for the `/ws` channel.
//!
//! Frames are JSON text. Every frame carries a `type` tag; the set of
//! kinds is closed on both sides, so anything else is rejected with an
//! `error` envelope rather than ignored.

use axum::extract::ws::Message as WsMessage;
use serde::{Deserialize, Serialize};
use serde_json::error::Category;

use crate::db::models::{ActivityId, Message, UserId};

/// Client → server frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEnvelope {
    /// Post `content` to the chat of `activity_id`.
    #[serde(rename = "activity-chat", rename_all = "camelCase")]
    ActivityChat {
        activity_id: ActivityId,
        sender_id: UserId,
        content: String,
    },
}

/// Server → client frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEnvelope {
    /// A persisted chat message, fanned out to every connected participant
    /// (the sender included).
    ActivityMessage { message: Message },
    /// A rejected frame. Only ever sent to the connection that sent it.
    Error { message: String },
}

impl ServerEnvelope {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Encode as a WebSocket text frame.
    pub fn to_ws_message(&self) -> Result<WsMessage, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(WsMessage::Text(json.into()))
    }
}

/// Message sent back when a frame is not even valid JSON.
pub const GENERIC_FRAME_ERROR: &str = "Failed to process message";

/// Decode an inbound text frame.
///
/// On failure returns the text for the error envelope: schema violations
/// (missing fields, wrong types, unknown `type`) are described, anything
/// else gets the generic message.
pub fn decode_client_frame(text: &str) -> Result<ClientEnvelope, String> {
    serde_json::from_str::<ClientEnvelope>(text).map_err(|e| match e.classify() {
        Category::Data => format!("Invalid message: {}", e),
        Category::Syntax | Category::Eof | Category::Io => GENERIC_FRAME_ERROR.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_decode_activity_chat() {
        let frame = r#"{"type":"activity-chat","activityId":7,"senderId":1,"content":"hi"}"#;
        let decoded = decode_client_frame(frame).unwrap();
        assert_eq!(
            decoded,
            ClientEnvelope::ActivityChat {
                activity_id: 7,
                sender_id: 1,
                content: "hi".to_string(),
            }
        );
    }

    #[test]
    fn test_client_timestamp_is_ignored() {
        let frame = r#"{"type":"activity-chat","activityId":7,"senderId":1,"content":"hi","sentAt":"1999-01-01T00:00:00Z"}"#;
        assert!(decode_client_frame(frame).is_ok());
    }

    #[test]
    fn test_schema_violation_is_described() {
        let err = decode_client_frame(r#"{"type":"activity-chat","activityId":"seven","senderId":1,"content":"hi"}"#)
            .unwrap_err();
        assert!(err.starts_with("Invalid message"), "got: {}", err);

        let err = decode_client_frame(r#"{"type":"activity-chat","activityId":7,"senderId":1}"#).unwrap_err();
        assert!(err.contains("content"), "got: {}", err);

        let err = decode_client_frame(r#"{"type":"typing","activityId":7}"#).unwrap_err();
        assert!(err.starts_with("Invalid message"), "got: {}", err);
    }

    #[test]
    fn test_garbage_gets_generic_error() {
        assert_eq!(decode_client_frame("not json").unwrap_err(), GENERIC_FRAME_ERROR);
        assert_eq!(decode_client_frame("{\"type\":").unwrap_err(), GENERIC_FRAME_ERROR);
    }

    #[test]
    fn test_server_envelope_wire_shape() {
        let sent_at = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let envelope = ServerEnvelope::ActivityMessage {
            message: Message {
                id: 3,
                activity_id: 7,
                sender_id: 1,
                content: "hi".to_string(),
                sent_at,
            },
        };

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "activity-message",
                "message": {
                    "id": 3,
                    "activityId": 7,
                    "senderId": 1,
                    "content": "hi",
                    "sentAt": "2026-05-01T12:00:00Z"
                }
            })
        );

        let value = serde_json::to_value(ServerEnvelope::error("nope")).unwrap();
        assert_eq!(value, json!({ "type": "error", "message": "nope" }));
    }
}
