// Socket protocol for the chat backend.
// One JSON object per text frame: {"event": <name>, "data": {...}}.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::models::Notification;

/// Events pushed to us by the server.
///
/// This is a closed set: a frame whose `event` tag or `data` shape does not
/// match any variant is logged and dropped, never guessed at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum InboundEvent {
    #[serde(rename_all = "camelCase")]
    ReceiveMessage {
        sender_id: String,
        sender_name: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    UserOnline { user_id: String },
    #[serde(rename_all = "camelCase")]
    UserOffline { user_id: String },
    #[serde(rename_all = "camelCase")]
    UserTyping {
        sender_id: String,
        sender_name: String,
        is_typing: bool,
    },
    Notification(Notification),
}

/// Events we emit to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum OutboundEvent {
    #[serde(rename_all = "camelCase")]
    Register { user_id: String },
    #[serde(rename_all = "camelCase")]
    SendMessage {
        receiver_id: String,
        sender_id: String,
        sender_name: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Typing {
        receiver_id: String,
        sender_id: String,
        sender_name: String,
        is_typing: bool,
    },
}

/// Parse one inbound text frame. Returns None (after logging) on anything
/// that does not match the closed event set.
pub fn decode_frame(text: &str) -> Option<InboundEvent> {
    match serde_json::from_str::<InboundEvent>(text) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Dropping malformed socket frame: {}", e);
            None
        }
    }
}

pub fn encode_frame(event: &OutboundEvent) -> String {
    // The outbound enum only contains string/bool fields; serialization
    // cannot fail for any constructible value.
    serde_json::to_string(event).unwrap_or_default()
}
