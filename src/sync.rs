// Connection list view context
// Owns the store for one active view: subscribes the push bridge, pulls the
// initial snapshot and serves the filtered list.

use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::watch;

use crate::api::SocialApi;
use crate::error::SyncError;
use crate::models::Connection;
use crate::push::{PushBridge, PushChannel, Subscription};
use crate::requests::GENERIC_FAILURE;
use crate::store::{self, ConnectionStore, SharedStore};
use crate::toast::Toaster;

pub struct ConnectionList {
    api: Arc<dyn SocialApi>,
    store: SharedStore,
    bridge: PushBridge,
    toaster: Toaster,
    subscription: Option<Subscription>,
    user_id: Option<String>,
    loading: watch::Sender<bool>,
}

impl ConnectionList {
    pub fn new(api: Arc<dyn SocialApi>, channel: Arc<dyn PushChannel>, toaster: Toaster) -> Self {
        let (loading, _) = watch::channel(false);
        ConnectionList {
            api,
            store: store::shared(ConnectionStore::new()),
            bridge: PushBridge::new(channel),
            toaster,
            subscription: None,
            user_id: None,
            loading,
        }
    }

    /// Activate the view: start listening for pushes, then fetch the snapshot.
    ///
    /// Pushes that land while the fetch is outstanding are applied normally and
    /// then replaced by the snapshot. Returns whether the snapshot loaded; a
    /// failed fetch leaves an empty list and an error toast.
    pub async fn mount(&mut self, user_id: Option<&str>) -> Result<bool, SyncError> {
        let subscription = self.bridge.subscribe(self.store.clone())?;
        self.subscription = Some(subscription);
        self.user_id = user_id.map(str::to_string);
        info!("Connection list mounted");

        Ok(self.refresh().await)
    }

    /// Deactivate the view. Later pushes no longer touch the store.
    pub fn unmount(&mut self) {
        if self.subscription.take().is_some() {
            info!("Connection list unmounted");
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Re-fetch the full list. Connections the server no longer returns are
    /// removed.
    pub async fn refresh(&self) -> bool {
        self.loading.send_replace(true);
        let result = self.api.fetch_connections(self.user_id.as_deref()).await;
        self.loading.send_replace(false);

        match result {
            Ok(connections) => {
                store::lock(&self.store).load_snapshot(connections);
                true
            }
            Err(e) => {
                error!("Failed to fetch connections: {}", e);
                store::lock(&self.store).clear();
                self.toaster.error(failure_message(&e));
                false
            }
        }
    }

    /// Connections to render for the current search box contents
    pub fn visible(&self, query: &str) -> Vec<Connection> {
        store::lock(&self.store).filter(query)
    }

    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    pub fn total_unread(&self) -> u32 {
        store::lock(&self.store).total_unread()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }
}

impl Drop for ConnectionList {
    fn drop(&mut self) {
        if self.subscription.is_some() {
            warn!("Connection list dropped while mounted; releasing push subscription");
        }
    }
}

fn failure_message(err: &SyncError) -> String {
    match err {
        SyncError::Network(e) => e.clone(),
        other => other.server_message().unwrap_or(GENERIC_FAILURE).to_string(),
    }
}
