use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    events::{ConnectionHooks, ConnectionLostEvent, ConnectionRestoredEvent, ReconnectedEvent},
    ChannelState,
};

const NO_LIVE_CHANNELS: &str = "No active realtime channels";

/// A snapshot of what the monitor knows about the connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub last_connected_at: Option<DateTime<Utc>>,
    pub connection_error: Option<String>,
}

/// Watches channel states and publishes an event on each edge between "some channel is live" and "none is".
#[derive(Default)]
pub struct ConnectionMonitor {
    status: Mutex<ConnectionStatus>,
    hooks: ConnectionHooks,
}

impl ConnectionMonitor {
    pub fn new(hooks: ConnectionHooks) -> Self {
        Self { status: Mutex::new(ConnectionStatus::default()), hooks }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.lock().clone()
    }

    /// Updates the connection status from the given channel states, and fires the lost/restored hooks if it changed.
    pub async fn observe(&self, states: &[ChannelState]) {
        let live_channels = states.iter().filter(|s| s.is_live()).count();
        let now = Utc::now();
        let was_connected = self.lock().is_connected;
        match (live_channels > 0, was_connected) {
            (true, false) => {
                {
                    let mut status = self.lock();
                    status.is_connected = true;
                    status.last_connected_at = Some(now);
                    status.connection_error = None;
                }
                info!("📡️ Realtime connection restored. {live_channels} live channel(s)");
                if let Some(hook) = &self.hooks.on_connection_restored {
                    (hook)(ConnectionRestoredEvent { live_channels, at: now }).await;
                }
            },
            (false, true) => {
                {
                    let mut status = self.lock();
                    status.is_connected = false;
                    status.connection_error = Some(NO_LIVE_CHANNELS.to_string());
                }
                warn!("📡️ Realtime connection lost");
                if let Some(hook) = &self.hooks.on_connection_lost {
                    let event = ConnectionLostEvent { reason: NO_LIVE_CHANNELS.to_string(), at: now };
                    (hook)(event).await;
                }
            },
            _ => trace!("📡️ Connection unchanged. {live_channels} live channel(s)"),
        }
    }

    pub(crate) async fn reconnected(&self, event: ReconnectedEvent) {
        if let Some(hook) = &self.hooks.on_reconnected {
            (hook)(event).await;
        }
    }

    pub(crate) fn record_error(&self, error: String) {
        self.lock().connection_error = Some(error);
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionStatus> {
        self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
