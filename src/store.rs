// Connection store: the authoritative in-memory chat list
// Merges the initial snapshot with pushed updates and serves the filtered view.

use log::{debug, info};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::Connection;

/// Shortest query (after trimming) that actually filters the list
pub const MIN_FILTER_LEN: usize = 2;

/// Store handle shared between the view and the push bridge
pub type SharedStore = Arc<Mutex<ConnectionStore>>;

pub fn shared(store: ConnectionStore) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// Lock a shared store. Every mutation leaves the list sorted, so the value
/// behind a poisoned lock is still consistent and safe to reuse.
pub fn lock(store: &SharedStore) -> MutexGuard<'_, ConnectionStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Viewer's connections, kept unique by id and sorted by recency
#[derive(Debug, Default, Clone)]
pub struct ConnectionStore {
    connections: Vec<Connection>,
}

impl ConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list with a freshly fetched snapshot.
    /// Connections missing from the snapshot are dropped.
    pub fn load_snapshot(&mut self, connections: Vec<Connection>) {
        let mut deduped: Vec<Connection> = Vec::with_capacity(connections.len());
        for conn in connections {
            // Later duplicates win but keep the slot of the first occurrence
            match deduped.iter_mut().find(|c| c.id == conn.id) {
                Some(existing) => *existing = conn,
                None => deduped.push(conn),
            }
        }

        self.connections = deduped;
        self.sort();
        info!("Loaded snapshot with {} connections", self.connections.len());
    }

    /// Insert or fully replace a connection by id, then restore the order.
    ///
    /// Applying the same update twice leaves the list exactly as one call did.
    /// Precedence is arrival order: whatever was applied last wins, whatever
    /// its timestamp says.
    pub fn apply_update(&mut self, connection: Connection) {
        match self.connections.iter_mut().find(|c| c.id == connection.id) {
            Some(existing) => {
                debug!("Replacing connection {}", connection.id);
                *existing = connection;
            }
            None => {
                debug!("Inserting new connection {}", connection.id);
                self.connections.insert(0, connection);
            }
        }
        self.sort();
    }

    /// Connections whose peer name contains `query`, ignoring case.
    /// Queries shorter than `MIN_FILTER_LEN` characters once trimmed return
    /// everything. The match itself uses the query as typed.
    pub fn filter(&self, query: &str) -> Vec<Connection> {
        if query.trim().chars().count() < MIN_FILTER_LEN {
            return self.connections.clone();
        }

        let needle = query.to_lowercase();
        self.connections
            .iter()
            .filter(|c| c.peer.display_name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn get(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn total_unread(&self) -> u32 {
        self.connections
            .iter()
            .fold(0u32, |total, c| total.saturating_add(c.unread_count))
    }

    pub fn clear(&mut self) {
        self.connections.clear();
    }

    // Vec::sort_by is stable, so ties keep their current relative order
    fn sort(&mut self) {
        self.connections.sort_by(recency);
    }
}

/// Newest first, connections without messages last
fn recency(a: &Connection, b: &Connection) -> Ordering {
    match (&a.last_message_at, &b.last_message_at) {
        (Some(ta), Some(tb)) => tb.cmp(ta),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
