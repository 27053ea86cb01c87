use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A counterpart in a 1:1 conversation, as cached locally.
///
/// `is_online` is never persisted by the backend; it is re-derived from the
/// presence tracker whenever the list is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub role: Option<RoleTag>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unread_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleTag {
    Customer,
    Provider,
    Admin,
}

/// One chat line. Immutable once created.
///
/// `id` is server-assigned and absent on messages that arrived over the
/// socket only; those get a local placeholder id for list keying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: Option<String>,
    pub sender_id: String,
    pub sender_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A dashboard notification pushed over the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub category: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Contact {
    /// Minimal contact built from a first inbound message whose sender is not
    /// in the list yet. The next full list load replaces it with the server's
    /// record.
    pub fn from_first_message(sender_id: &str, sender_name: &str) -> Self {
        Contact {
            id: sender_id.to_string(),
            display_name: sender_name.to_string(),
            role: None,
            avatar_url: None,
            is_online: false,
            last_message: None,
            last_message_time: None,
            unread_count: 0,
        }
    }
}
