// Single-slot toast notifier
// One banner at a time; a newer message replaces the current one and owns
// the auto-clear timer.

use log::{debug, info};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::models::{ToastKind, ToastMessage};

pub const DEFAULT_TOAST_TTL: Duration = Duration::from_millis(4000);

struct Slot {
    // Bumped on every show/clear so a timer can tell it has been superseded
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    slot: Mutex<Slot>,
    tx: watch::Sender<Option<ToastMessage>>,
    ttl: Duration,
}

/// Cloneable handle to the shared toast slot.
///
/// `show` spawns the expiry timer, so it must be called from inside a Tokio
/// runtime.
#[derive(Clone)]
pub struct Toaster {
    inner: Arc<Inner>,
}

impl Toaster {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TOAST_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        Toaster {
            inner: Arc::new(Inner {
                slot: Mutex::new(Slot { generation: 0, timer: None }),
                tx,
                ttl,
            }),
        }
    }

    /// Display `text`, replacing whatever is showing, and restart the timer
    pub fn show(&self, text: impl Into<String>, kind: ToastKind) {
        let text = text.into();
        let mut slot = self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner);

        slot.generation += 1;
        let generation = slot.generation;
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }

        info!("Toast ({:?}): {}", kind, text);
        let message = ToastMessage {
            text,
            kind,
            expires_at: Instant::now() + self.inner.ttl,
        };
        self.inner.tx.send_replace(Some(message));

        let inner = self.inner.clone();
        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.ttl).await;
            let mut slot = inner.slot.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.generation == generation {
                debug!("Toast expired");
                slot.timer = None;
                inner.tx.send_replace(None);
            }
        }));
    }

    pub fn success(&self, text: impl Into<String>) {
        self.show(text, ToastKind::Success);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.show(text, ToastKind::Error);
    }

    /// Empty the slot now and cancel the pending expiry
    pub fn clear(&self) {
        let mut slot = self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.generation += 1;
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        self.inner.tx.send_replace(None);
    }

    pub fn current(&self) -> Option<ToastMessage> {
        self.inner.tx.borrow().clone()
    }

    /// Watch the slot; the receiver always sees the latest message or `None`
    pub fn subscribe(&self) -> watch::Receiver<Option<ToastMessage>> {
        self.inner.tx.subscribe()
    }
}

impl Default for Toaster {
    fn default() -> Self {
        Self::new()
    }
}
