// Push event bridge
// Forwards "connection changed" events from an explicit push channel handle
// into the connection store for as long as a subscription is held.

use log::{debug, info, warn};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::SyncError;
use crate::models::Connection;
use crate::store::{self, SharedStore};

pub mod local;
pub mod ws;

pub use local::LocalPushChannel;
pub use ws::{ChannelState, WsPushChannel};

/// Event name the backend emits whenever a connection record changes
pub const CONNECTION_UPDATED: &str = "connectionUpdated";

pub type HandlerId = u64;

/// Callback invoked with the raw JSON payload of an event
pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Anything that can deliver named push events to registered handlers.
///
/// Delivery is at-least-once: the same payload may arrive more than once.
pub trait PushChannel: Send + Sync {
    /// Register `handler` for `event` and return the id needed to remove it
    fn on(&self, event: &str, handler: EventHandler) -> HandlerId;

    /// Remove a handler. Returns false if it was not registered.
    fn off(&self, event: &str, id: HandlerId) -> bool;
}

/// Owns at most one `CONNECTION_UPDATED` subscription at a time
pub struct PushBridge {
    channel: Arc<dyn PushChannel>,
    active: Arc<Mutex<Option<HandlerId>>>,
}

impl PushBridge {
    pub fn new(channel: Arc<dyn PushChannel>) -> Self {
        PushBridge {
            channel,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Start forwarding pushed connections into `store`.
    ///
    /// The returned guard removes the handler when dropped. Fails with
    /// `AlreadySubscribed` while a previous guard is still alive.
    pub fn subscribe(&self, store: SharedStore) -> Result<Subscription, SyncError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.is_some() {
            warn!("Refusing second subscription to {}", CONNECTION_UPDATED);
            return Err(SyncError::AlreadySubscribed(CONNECTION_UPDATED));
        }

        let handler: EventHandler = Arc::new(move |payload: &Value| {
            match serde_json::from_value::<Connection>(payload.clone()) {
                Ok(connection) => {
                    debug!("Push update for connection {}", connection.id);
                    store::lock(&store).apply_update(connection);
                }
                Err(e) => warn!("Dropping malformed {} payload: {}", CONNECTION_UPDATED, e),
            }
        });

        let id = self.channel.on(CONNECTION_UPDATED, handler);
        *active = Some(id);
        info!("Subscribed to {} (handler {})", CONNECTION_UPDATED, id);

        Ok(Subscription {
            channel: self.channel.clone(),
            active: self.active.clone(),
            id,
        })
    }

    pub fn is_subscribed(&self) -> bool {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}

/// Live handler registration; dropping it unsubscribes
pub struct Subscription {
    channel: Arc<dyn PushChannel>,
    active: Arc<Mutex<Option<HandlerId>>>,
    id: HandlerId,
}

impl Subscription {
    /// Explicit teardown, same as dropping the guard
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.channel.off(CONNECTION_UPDATED, self.id) {
            warn!("Handler {} was already gone from the push channel", self.id);
        }
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if *active == Some(self.id) {
            *active = None;
        }
        info!("Unsubscribed from {} (handler {})", CONNECTION_UPDATED, self.id);
    }
}
