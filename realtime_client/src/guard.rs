//! Reconnect debounce.
//!
//! App-resume, network-regain and the health sweep often fire within milliseconds of each other. Each of them would
//! tear down and re-join every channel, and stacking those cycles is what causes reconnect storms. The guard lets
//! exactly one cycle run at a time, and refuses new cycles for a short window after the last one started. Refused
//! triggers are dropped, not queued.
use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use log::*;
use tokio::time::Instant;

pub const RECONNECT_DEBOUNCE: Duration = Duration::from_millis(1500);

#[derive(Debug, Default)]
struct GuardState {
    in_flight: bool,
    last_started: Option<Instant>,
}

/// Shared by every trigger source of one manager. Clones share the same state.
#[derive(Debug, Clone)]
pub struct ReconnectGuard {
    state: Arc<Mutex<GuardState>>,
    debounce: Duration,
}

impl Default for ReconnectGuard {
    fn default() -> Self {
        Self::new(RECONNECT_DEBOUNCE)
    }
}

impl ReconnectGuard {
    pub fn new(debounce: Duration) -> Self {
        Self { state: Arc::new(Mutex::new(GuardState::default())), debounce }
    }

    /// Claims the right to run a reconnect cycle. Returns `None` if a cycle is running, or if the last one started
    /// less than the debounce window ago. The cycle ends when the ticket is dropped.
    pub fn try_begin(&self) -> Option<ReconnectTicket> {
        let mut state = lock(&self.state);
        if state.in_flight {
            trace!("📡️ A reconnect cycle is already running");
            return None;
        }
        let now = Instant::now();
        if let Some(last) = state.last_started {
            if now.duration_since(last) < self.debounce {
                trace!("📡️ Last reconnect cycle started {}ms ago", now.duration_since(last).as_millis());
                return None;
            }
        }
        state.in_flight = true;
        state.last_started = Some(now);
        Some(ReconnectTicket { state: Arc::clone(&self.state) })
    }

    pub fn is_in_flight(&self) -> bool {
        lock(&self.state).in_flight
    }

    pub fn last_started(&self) -> Option<Instant> {
        lock(&self.state).last_started
    }
}

/// Proof that the holder is running the one permitted reconnect cycle.
#[derive(Debug)]
pub struct ReconnectTicket {
    state: Arc<Mutex<GuardState>>,
}

impl Drop for ReconnectTicket {
    fn drop(&mut self) {
        lock(&self.state).in_flight = false;
    }
}

// The state is two plain fields, so a panic elsewhere cannot leave it half-written.
fn lock(state: &Mutex<GuardState>) -> MutexGuard<'_, GuardState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
