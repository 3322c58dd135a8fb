// Data model shared by the store, the push bridge and the API layer.
// Field names on the wire follow the backend's JSON documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::time::Instant;

// The backend sends `null` for fields it has no value for yet
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The other side of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "name", default, deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(rename = "image", default, skip_serializing_if = "Option::is_none")]
    pub avatar_ref: Option<String>,
}

/// An accepted relationship with another user, as seen by the viewer.
///
/// Push events carry the full record, so updates always replace the whole
/// value rather than patching fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "user")]
    pub peer: Peer,
    #[serde(rename = "lastMessage", default, deserialize_with = "null_as_default")]
    pub last_message_preview: String,
    #[serde(rename = "lastMessageAt", default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(rename = "unreadCount", default, deserialize_with = "null_as_default")]
    pub unread_count: u32,
}

impl Connection {
    pub fn new(id: &str, peer: Peer) -> Self {
        Connection {
            id: id.to_string(),
            peer,
            last_message_preview: String::new(),
            last_message_at: None,
            unread_count: 0,
        }
    }

    /// Text shown under the name in the chat list
    pub fn preview_or_placeholder(&self) -> &str {
        if self.last_message_preview.is_empty() {
            "No messages yet"
        } else {
            &self.last_message_preview
        }
    }
}

/// One hit from the global user search. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "name", default, deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(rename = "image", default, skip_serializing_if = "Option::is_none")]
    pub avatar_ref: Option<String>,
}

/// Something a request can be sent to. Used as the in-flight key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestTarget {
    /// A connection request to another user
    Connection { receiver_id: String },
    /// A request to contribute to a project
    Contribution { proj_id: String },
}

impl RequestTarget {
    pub fn id(&self) -> &str {
        match self {
            RequestTarget::Connection { receiver_id } => receiver_id,
            RequestTarget::Contribution { proj_id } => proj_id,
        }
    }
}

impl std::fmt::Display for RequestTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestTarget::Connection { receiver_id } => write!(f, "connection request to {}", receiver_id),
            RequestTarget::Contribution { proj_id } => write!(f, "contribution request for project {}", proj_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToastMessage {
    pub text: String,
    pub kind: ToastKind,
    pub expires_at: Instant,
}

impl ToastMessage {
    pub fn is_error(&self) -> bool {
        self.kind == ToastKind::Error
    }
}
