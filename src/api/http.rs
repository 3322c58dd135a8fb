//! reqwest implementation of [`SocialApi`].
//!
//! Every call is a JSON POST. The client keeps a cookie jar so the session
//! cookie issued at login rides along on later requests.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use super::{
    ApiPaths, ConnectionRequestBody, ConnectionsReply, ContributionRequestBody, FetchConnectionsBody,
    MessageReply, SearchBody, SearchReply, SocialApi,
};
use crate::error::SyncError;
use crate::models::{Connection, SearchResult};

#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    paths: ApiPaths,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        url::Url::parse(base_url).map_err(|e| SyncError::InvalidConfig(format!("invalid backend url '{}': {}", base_url, e)))?;

        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;

        Ok(HttpApi {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            paths: ApiPaths::default(),
        })
    }

    pub fn with_paths(mut self, paths: ApiPaths) -> Self {
        self.paths = paths;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST `body` and decode a 2xx reply as `TRes`.
    /// Non-2xx replies become `Rejected` with whatever message the body had.
    async fn post_json<TReq: Serialize + ?Sized, TRes: DeserializeOwned>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<TRes, SyncError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let resp = self.client.post(&url).json(body).send().await?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| SyncError::Network(format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<MessageReply>(&text).unwrap_or_default().message;
            warn!("POST {} failed with {}: {:?}", url, status, message);
            return Err(SyncError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl SocialApi for HttpApi {
    async fn fetch_connections(&self, user_id: Option<&str>) -> Result<Vec<Connection>, SyncError> {
        let reply: ConnectionsReply = self
            .post_json(&self.paths.fetch_connections, &FetchConnectionsBody { user_id })
            .await?;

        if !reply.success {
            return Err(SyncError::Rejected {
                status: 200,
                message: reply.message,
            });
        }
        Ok(reply.connections)
    }

    async fn search_users(&self, terms: &[String]) -> Result<Vec<SearchResult>, SyncError> {
        let reply: SearchReply = self.post_json(&self.paths.search_users, &SearchBody { search: terms }).await?;

        if !reply.success {
            return Err(SyncError::Rejected { status: 200, message: None });
        }
        Ok(reply.users)
    }

    async fn send_connection_request(&self, receiver_id: &str) -> Result<Option<String>, SyncError> {
        let reply: MessageReply = self
            .post_json(&self.paths.send_connection, &ConnectionRequestBody { receiver_id })
            .await?;

        if reply.success == Some(false) {
            return Err(SyncError::Rejected {
                status: 200,
                message: reply.message,
            });
        }
        Ok(reply.message)
    }

    async fn send_contribution_request(&self, proj_id: &str) -> Result<Option<String>, SyncError> {
        let reply: MessageReply = self
            .post_json(&self.paths.send_contribution, &ContributionRequestBody { proj_id })
            .await?;
        Ok(reply.message)
    }
}
