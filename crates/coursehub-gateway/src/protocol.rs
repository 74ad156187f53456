//! Wire frames exchanged over the WebSocket channels.

use crate::error::GatewayError;
use crate::Result;
use chrono::{DateTime, Utc};
use coursehub_core::{
    ChatMessage, Notification, NotificationKind, NotificationPayload, RoomName, SenderInfo,
};
use serde::{Deserialize, Serialize};

/// Frame kind assumed when an inbound frame carries no `type` tag.
pub const DEFAULT_FRAME_KIND: &str = "chat_message";

/// An inbound client frame, split into its dispatch tag and raw payload.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    /// Dispatch tag (`type` field).
    pub kind: String,

    /// The full JSON object. Handlers deserialize what they need from it.
    pub payload: serde_json::Value,
}

impl InboundFrame {
    /// Parse a text frame. Anything but a JSON object is malformed.
    pub fn parse(text: &str) -> Result<Self> {
        let payload: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| GatewayError::Malformed(format!("invalid JSON: {}", e)))?;

        let object = payload
            .as_object()
            .ok_or_else(|| GatewayError::Malformed("expected a JSON object".to_string()))?;

        let kind = match object.get("type") {
            None => DEFAULT_FRAME_KIND.to_string(),
            Some(serde_json::Value::String(kind)) => kind.clone(),
            Some(_) => {
                return Err(GatewayError::Malformed("'type' must be a string".to_string()))
            }
        };

        Ok(Self { kind, payload })
    }

    /// Deserialize the payload into a typed body.
    pub fn decode<T: serde::de::DeserializeOwned>(payload: serde_json::Value) -> Result<T> {
        serde_json::from_value(payload).map_err(|e| GatewayError::Malformed(e.to_string()))
    }
}

/// An outbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A chat message posted to a room.
    ChatMessage {
        id: i64,
        room: RoomName,
        sender: SenderInfo,
        body: String,
        timestamp: DateTime<Utc>,
    },

    /// A notification. Room-wide notices carry no id.
    Notification {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<i64>,
        kind: NotificationKind,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        course_id: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Acknowledgement of a client request.
    Ack { action: String, updated: u64 },

    /// Reply to `ping`.
    Pong,

    /// Per-message failure; the connection stays open.
    Error { code: String, message: String },
}

impl ServerEvent {
    /// Event for a stored chat message.
    pub fn chat(message: &ChatMessage) -> Self {
        Self::ChatMessage {
            id: message.id,
            room: message.room.clone(),
            sender: message.sender.clone(),
            body: message.body.clone(),
            timestamp: message.created_at,
        }
    }

    /// Event for a stored notification.
    pub fn notification(notification: &Notification) -> Self {
        Self::Notification {
            id: Some(notification.id),
            kind: notification.kind,
            message: notification.message.clone(),
            course_id: notification.course_id.clone(),
            timestamp: notification.created_at,
        }
    }

    /// Event for an unpersisted room-wide notice.
    pub fn notice(payload: &NotificationPayload) -> Self {
        Self::Notification {
            id: None,
            kind: payload.kind,
            message: payload.message.clone(),
            course_id: payload.course_id.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Error frame for a failed message.
    pub fn error(err: &GatewayError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }

    /// Serialize to a text frame.
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
