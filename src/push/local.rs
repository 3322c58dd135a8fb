// In-process push channel
// A handler registry keyed by event name. Used directly in tests and as the
// dispatch hub behind the WebSocket channel.

use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{EventHandler, HandlerId, PushChannel};

#[derive(Default)]
pub struct LocalPushChannel {
    handlers: Mutex<HashMap<String, Vec<(HandlerId, EventHandler)>>>,
    next_id: AtomicU64,
}

impl LocalPushChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `payload` to every handler registered for `event`.
    /// Returns how many handlers ran.
    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        // Snapshot the handlers so one of them may call `off` while running
        let targets: Vec<EventHandler> = {
            let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
            match handlers.get(event) {
                Some(list) => list.iter().map(|(_, h)| h.clone()).collect(),
                None => Vec::new(),
            }
        };

        debug!("Emitting '{}' to {} handler(s)", event, targets.len());
        for handler in &targets {
            handler(payload);
        }
        targets.len()
    }

    pub fn handler_count(&self, event: &str) -> usize {
        let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        handlers.get(event).map_or(0, Vec::len)
    }
}

impl PushChannel for LocalPushChannel {
    fn on(&self, event: &str, handler: EventHandler) -> HandlerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        handlers.entry(event.to_string()).or_default().push((id, handler));
        id
    }

    fn off(&self, event: &str, id: HandlerId) -> bool {
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = handlers.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(handler_id, _)| *handler_id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(event);
        }
        removed
    }
}
