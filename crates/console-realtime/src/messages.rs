//! Realtime protocol messages.
//!
//! Frames are JSON objects tagged by `type`. The server pushes
//! `{"type":"message","group_id":..,"message":{..}}`; the client sends
//! `subscribe` / `unsubscribe` commands for a group.

use serde::{Deserialize, Deserializer, Serialize};

/// A chat message as delivered to group handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatMessage {
    #[serde(deserialize_with = "lenient_string")]
    pub user_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub nickname: String,
    #[serde(deserialize_with = "lenient_string")]
    pub avatar_url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(deserialize_with = "lenient_string")]
    pub timestamp: String,
}

/// Accepts strings, numbers and null for text fields. Bot servers commonly
/// send numeric user ids and epoch timestamps.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string, found {}",
            other
        ))),
    }
}

/// An event received from the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// A chat message posted in a group.
    Message {
        group_id: String,
        message: ChatMessage,
    },
    /// Any other event type; accepted and ignored.
    #[serde(other)]
    Other,
}

impl InboundEvent {
    /// Deserialize from a JSON text frame.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// A command sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundCommand {
    Subscribe { group_id: String },
    Unsubscribe { group_id: String },
}

impl OutboundCommand {
    pub fn subscribe(group_id: &str) -> Self {
        Self::Subscribe {
            group_id: group_id.to_string(),
        }
    }

    pub fn unsubscribe(group_id: &str) -> Self {
        Self::Unsubscribe {
            group_id: group_id.to_string(),
        }
    }

    pub fn group_id(&self) -> &str {
        match self {
            Self::Subscribe { group_id } | Self::Unsubscribe { group_id } => group_id,
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
