//! Connection events and the hooks that receive them.
//!
//! Hooks run inline on the manager's task, in the order the events happen. A slow hook delays the next trigger, so
//! hooks that do real work should hand it off.
use std::{future::Future, pin::Pin, sync::Arc};

use chrono::{DateTime, Utc};

use crate::ReconnectTrigger;

pub type Hook<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Every channel has stopped delivering messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionLostEvent {
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// At least one channel is live again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRestoredEvent {
    pub live_channels: usize,
    pub at: DateTime<Utc>,
}

/// A reconnect cycle completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectedEvent {
    pub trigger: ReconnectTrigger,
    pub channels: usize,
    pub at: DateTime<Utc>,
}

#[derive(Default, Clone)]
pub struct ConnectionHooks {
    pub on_connection_lost: Option<Hook<ConnectionLostEvent>>,
    pub on_connection_restored: Option<Hook<ConnectionRestoredEvent>>,
    pub on_reconnected: Option<Hook<ReconnectedEvent>>,
}

impl ConnectionHooks {
    pub fn on_connection_lost<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ConnectionLostEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_connection_lost = Some(Arc::new(f));
        self
    }

    pub fn on_connection_restored<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ConnectionRestoredEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_connection_restored = Some(Arc::new(f));
        self
    }

    pub fn on_reconnected<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ReconnectedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_reconnected = Some(Arc::new(f));
        self
    }
}
