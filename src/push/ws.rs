//! WebSocket push channel using tokio-tungstenite.
//!
//! The server sends JSON text frames shaped `{"event": "...", "data": {...}}`.
//! Each frame is dispatched through a [`LocalPushChannel`] hub, so handlers
//! are registered the same way as with the in-process channel. The reader
//! reconnects after a fixed delay whenever the socket closes.

use futures_util::StreamExt;
use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{EventHandler, HandlerId, LocalPushChannel, PushChannel};
use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelState {
    Connecting,
    Connected,
    Disconnected { reason: String },
}

/// One frame from the push endpoint
#[derive(Debug, Deserialize)]
pub struct PushEnvelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

pub fn decode_frame(text: &str) -> Result<PushEnvelope, SyncError> {
    Ok(serde_json::from_str(text)?)
}

pub struct WsPushChannel {
    hub: Arc<LocalPushChannel>,
    state: watch::Receiver<ChannelState>,
    task: JoinHandle<()>,
}

impl WsPushChannel {
    /// Validate `url` and start the background connection loop.
    /// Must be called from inside a Tokio runtime.
    pub fn connect(url: &str, reconnect_delay: Duration) -> Result<Self, SyncError> {
        let parsed = url::Url::parse(url).map_err(|e| SyncError::Channel(format!("invalid push url '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(SyncError::Channel(format!("push url must use ws:// or wss://, got '{}'", url)));
        }

        let hub = Arc::new(LocalPushChannel::new());
        let (state_tx, state) = watch::channel(ChannelState::Connecting);
        let task = tokio::spawn(run_connection_loop(parsed.to_string(), hub.clone(), state_tx, reconnect_delay));

        Ok(WsPushChannel { hub, state, task })
    }

    pub fn state(&self) -> watch::Receiver<ChannelState> {
        self.state.clone()
    }
}

impl PushChannel for WsPushChannel {
    fn on(&self, event: &str, handler: EventHandler) -> HandlerId {
        self.hub.on(event, handler)
    }

    fn off(&self, event: &str, id: HandlerId) -> bool {
        self.hub.off(event, id)
    }
}

impl Drop for WsPushChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_connection_loop(
    url: String,
    hub: Arc<LocalPushChannel>,
    state: watch::Sender<ChannelState>,
    reconnect_delay: Duration,
) {
    loop {
        state.send_replace(ChannelState::Connecting);

        let reason = match connect_async(url.as_str()).await {
            Ok((mut stream, _response)) => {
                info!("Push channel connected to {}", url);
                state.send_replace(ChannelState::Connected);

                let mut reason = String::from("stream ended");
                while let Some(frame) = stream.next().await {
                    match frame {
                        Ok(Message::Text(text)) => match decode_frame(text.as_str()) {
                            Ok(envelope) => {
                                hub.emit(&envelope.event, &envelope.data);
                            }
                            Err(e) => warn!("Ignoring undecodable push frame: {}", e),
                        },
                        Ok(Message::Close(frame)) => {
                            info!("Push channel closed by server: {:?}", frame);
                            reason = String::from("closed by server");
                            break;
                        }
                        Ok(Message::Ping(_)) => debug!("Push channel ping"),
                        Ok(_) => {}
                        Err(e) => {
                            error!("Push channel read error: {}", e);
                            reason = e.to_string();
                            break;
                        }
                    }
                }
                reason
            }
            Err(e) => {
                error!("Push channel failed to connect to {}: {}", url, e);
                e.to_string()
            }
        };

        state.send_replace(ChannelState::Disconnected { reason });
        info!("Reconnecting push channel in {}ms", reconnect_delay.as_millis());
        tokio::time::sleep(reconnect_delay).await;
    }
}
