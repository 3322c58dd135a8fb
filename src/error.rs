// Error taxonomy for the synchronizer
//! Every fallible library operation returns [`SyncError`]. None of these are
//! fatal: callers degrade to an empty or partial state instead.

use thiserror::Error;

/// Errors that can occur while talking to the backend or the push channel
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport-level failure: offline, timeout, connection refused
    #[error("Network error: {0}")]
    Network(String),

    /// Well-formed response with `success: false` or a non-2xx status
    #[error("Request rejected (status {status}): {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    /// 2xx response whose body is not the documented shape
    #[error("Malformed response: {0}")]
    Decode(String),

    /// A required identifier was empty, so no call was attempted
    #[error("Missing required identifier: {0}")]
    MissingIdentifier(&'static str),

    /// A request for the same target is still outstanding
    #[error("A {0} is already pending")]
    DuplicateRequest(String),

    /// The push bridge already holds its one subscription
    #[error("Push bridge is already subscribed to '{0}'")]
    AlreadySubscribed(&'static str),

    /// A configured value (such as an endpoint URL) is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The push transport could not connect or read
    #[error("Push channel error: {0}")]
    Channel(String),
}

impl SyncError {
    /// Message the server attached to a rejection, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            SyncError::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, SyncError::Network(_))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::Decode(err.to_string())
        } else {
            SyncError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}
