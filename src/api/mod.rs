// Backend API contract
// The synchronizer only talks to the backend through `SocialApi`, so tests can
// substitute an in-memory fake for the HTTP client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::models::{Connection, SearchResult};

pub mod http;

pub use http::HttpApi;

#[async_trait]
pub trait SocialApi: Send + Sync {
    /// Full list of accepted connections for the viewer (or `user_id`)
    async fn fetch_connections(&self, user_id: Option<&str>) -> Result<Vec<Connection>, SyncError>;

    /// Global user search. `terms` are the whitespace-separated query words.
    async fn search_users(&self, terms: &[String]) -> Result<Vec<SearchResult>, SyncError>;

    /// Create a connection request. `Ok` carries the server's message, if any.
    async fn send_connection_request(&self, receiver_id: &str) -> Result<Option<String>, SyncError>;

    /// Ask to contribute to a project. `Ok` carries the server's message, if any.
    async fn send_contribution_request(&self, proj_id: &str) -> Result<Option<String>, SyncError>;
}

/// Endpoint paths relative to the backend base URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiPaths {
    pub fetch_connections: String,
    pub search_users: String,
    pub send_connection: String,
    pub send_contribution: String,
}

impl Default for ApiPaths {
    fn default() -> Self {
        ApiPaths {
            fetch_connections: "/connection/fetchcon".to_string(),
            search_users: "/api/findskilled".to_string(),
            send_connection: "/connection/send".to_string(),
            send_contribution: "/contribution/request".to_string(),
        }
    }
}

// Wire documents

#[derive(Debug, Serialize)]
pub(crate) struct FetchConnectionsBody<'a> {
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConnectionsReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchBody<'a> {
    pub search: &'a [String],
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub users: Vec<SearchResult>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ConnectionRequestBody<'a> {
    #[serde(rename = "receiverId")]
    pub receiver_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ContributionRequestBody<'a> {
    #[serde(rename = "projId")]
    pub proj_id: &'a str,
}

/// Generic `{ success?, message? }` reply used by the request endpoints and
/// by most error bodies
#[derive(Debug, Default, Deserialize)]
pub(crate) struct MessageReply {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Split a search box value into the terms the backend expects
pub fn search_terms(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_string).collect()
}
