// Common test utilities for integration tests
// Shared fake backend, logging setup and data builders.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use log::LevelFilter;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, Once};
use std::time::Duration;

use skillmate::{Connection, Peer, RequestTarget, SearchResult, SocialApi, SyncError};

// Initialize logging once
static INIT_LOGGER: Once = Once::new();

/// Set up the logger for the tests
pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

/// Scripted outcome for a fake backend call
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    Network(String),
    Rejected(Option<String>),
}

impl<T: Clone> Reply<T> {
    fn to_result(&self) -> Result<T, SyncError> {
        match self {
            Reply::Ok(value) => Ok(value.clone()),
            Reply::Network(msg) => Err(SyncError::Network(msg.clone())),
            Reply::Rejected(message) => Err(SyncError::Rejected {
                status: 400,
                message: message.clone(),
            }),
        }
    }
}

/// In-memory stand-in for the HTTP API. Every reply can be delayed so tests
/// running on paused time control exactly when responses land.
pub struct FakeApi {
    connections: Mutex<Reply<Vec<Connection>>>,
    fetch_delay: Mutex<Duration>,
    fetch_calls: Mutex<Vec<Option<String>>>,
    search: Mutex<HashMap<String, (Duration, Reply<Vec<SearchResult>>)>>,
    search_calls: Mutex<Vec<Vec<String>>>,
    request_reply: Mutex<Reply<Option<String>>>,
    request_delay: Mutex<Duration>,
    request_calls: Mutex<Vec<RequestTarget>>,
}

impl FakeApi {
    pub fn new() -> Self {
        FakeApi {
            connections: Mutex::new(Reply::Ok(Vec::new())),
            fetch_delay: Mutex::new(Duration::ZERO),
            fetch_calls: Mutex::new(Vec::new()),
            search: Mutex::new(HashMap::new()),
            search_calls: Mutex::new(Vec::new()),
            request_reply: Mutex::new(Reply::Ok(None)),
            request_delay: Mutex::new(Duration::ZERO),
            request_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_connections(&self, reply: Reply<Vec<Connection>>) {
        *self.connections.lock().unwrap() = reply;
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = delay;
    }

    /// Script the answer for a query; `query` is the terms joined by spaces
    pub fn set_search(&self, query: &str, delay: Duration, reply: Reply<Vec<SearchResult>>) {
        self.search.lock().unwrap().insert(query.to_string(), (delay, reply));
    }

    pub fn set_request_reply(&self, reply: Reply<Option<String>>) {
        *self.request_reply.lock().unwrap() = reply;
    }

    pub fn set_request_delay(&self, delay: Duration) {
        *self.request_delay.lock().unwrap() = delay;
    }

    pub fn fetch_calls(&self) -> Vec<Option<String>> {
        self.fetch_calls.lock().unwrap().clone()
    }

    pub fn search_calls(&self) -> Vec<Vec<String>> {
        self.search_calls.lock().unwrap().clone()
    }

    pub fn request_calls(&self) -> Vec<RequestTarget> {
        self.request_calls.lock().unwrap().clone()
    }

    async fn request(&self, target: RequestTarget) -> Result<Option<String>, SyncError> {
        self.request_calls.lock().unwrap().push(target);
        let delay = *self.request_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        let reply = self.request_reply.lock().unwrap().clone();
        reply.to_result()
    }
}

#[async_trait]
impl SocialApi for FakeApi {
    async fn fetch_connections(&self, user_id: Option<&str>) -> Result<Vec<Connection>, SyncError> {
        self.fetch_calls.lock().unwrap().push(user_id.map(str::to_string));
        let delay = *self.fetch_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        let reply = self.connections.lock().unwrap().clone();
        reply.to_result()
    }

    async fn search_users(&self, terms: &[String]) -> Result<Vec<SearchResult>, SyncError> {
        self.search_calls.lock().unwrap().push(terms.to_vec());
        let scripted = self.search.lock().unwrap().get(&terms.join(" ")).cloned();
        let (delay, reply) = scripted.unwrap_or((Duration::ZERO, Reply::Ok(Vec::new())));
        tokio::time::sleep(delay).await;
        reply.to_result()
    }

    async fn send_connection_request(&self, receiver_id: &str) -> Result<Option<String>, SyncError> {
        self.request(RequestTarget::Connection {
            receiver_id: receiver_id.to_string(),
        })
        .await
    }

    async fn send_contribution_request(&self, proj_id: &str) -> Result<Option<String>, SyncError> {
        self.request(RequestTarget::Contribution {
            proj_id: proj_id.to_string(),
        })
        .await
    }
}

/// Connection `id` with peer `name`, last message at `secs` (Unix time)
pub fn conn(id: &str, name: &str, secs: Option<i64>) -> Connection {
    let mut c = Connection::new(id, Peer {
        id: format!("user-{}", id),
        display_name: name.to_string(),
        avatar_ref: Some(format!("{}.png", id)),
    });
    c.last_message_at = secs.map(|s| Utc.timestamp_opt(s, 0).unwrap());
    c.last_message_preview = format!("last from {}", name);
    c
}

/// Push payload for a connection, as the backend would send it
pub fn push_payload(connection: &Connection) -> Value {
    serde_json::to_value(connection).unwrap()
}

pub fn user(id: &str, name: &str) -> SearchResult {
    SearchResult {
        id: id.to_string(),
        display_name: name.to_string(),
        avatar_ref: None,
    }
}

pub fn ids(list: &[Connection]) -> Vec<String> {
    list.iter().map(|c| c.id.clone()).collect()
}
