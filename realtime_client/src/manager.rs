//! The realtime connection manager.
//!
//! The platform delivers auth, app-state and network callbacks on one task, and the health sweep runs on a timer on the
//! same task. Every trigger that wants the channels rebuilt goes through the manager's [`ReconnectGuard`], so at most
//! one reconnect cycle is ever in flight.
use std::{
    fmt::Display,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use chrono::Utc;
use log::*;

use crate::{
    events::{ConnectionHooks, ReconnectedEvent},
    AppState,
    ConnectionMonitor,
    ConnectionStatus,
    NetworkStatus,
    RealtimeError,
    RealtimeTransport,
    ReconnectGuard,
    Session,
    SessionSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealtimeConfig {
    /// Minimum time between the starts of two reconnect cycles
    pub debounce: Duration,
    /// How long to let the app settle after coming to the foreground
    pub settle_delay: Duration,
    /// Sessions expiring within this margin are refreshed before reconnecting
    pub refresh_margin: Duration,
    pub health_interval: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1500),
            settle_delay: Duration::from_millis(600),
            refresh_margin: Duration::from_secs(60),
            health_interval: Duration::from_secs(7),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectTrigger {
    AppResume,
    NetworkRegain,
    HealthSweep,
}

impl Display for ReconnectTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AppResume => write!(f, "app resume"),
            Self::NetworkRegain => write!(f, "network regain"),
            Self::HealthSweep => write!(f, "health sweep"),
        }
    }
}

/// What a trigger led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The callback did not call for a reconnect.
    NotNeeded,
    /// A cycle is running, or one started too recently. The trigger was dropped.
    Debounced,
    Reconnected { channels: usize },
    Failed(RealtimeError),
}

pub struct RealtimeConnectionManager<T, S> {
    transport: T,
    sessions: S,
    guard: ReconnectGuard,
    monitor: ConnectionMonitor,
    config: RealtimeConfig,
    app_state: Mutex<AppState>,
}

impl<T, S> RealtimeConnectionManager<T, S>
where
    T: RealtimeTransport,
    S: SessionSource,
{
    pub fn new(transport: T, sessions: S, config: RealtimeConfig) -> Self {
        Self::new_with_hooks(transport, sessions, config, ConnectionHooks::default())
    }

    pub fn new_with_hooks(transport: T, sessions: S, config: RealtimeConfig, hooks: ConnectionHooks) -> Self {
        Self {
            transport,
            sessions,
            guard: ReconnectGuard::new(config.debounce),
            monitor: ConnectionMonitor::new(hooks),
            config,
            app_state: Mutex::new(AppState::Active),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn guard(&self) -> &ReconnectGuard {
        &self.guard
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.monitor.status()
    }

    pub fn app_state(&self) -> AppState {
        *self.lock_app_state()
    }

    /// Session callback. Open channels keep authorizing with whatever token the transport was last given, so every new
    /// token is handed over straight away.
    pub fn on_auth_state_change(&self, session: Option<&Session>) {
        match session {
            Some(s) if !s.access_token.is_empty() => {
                debug!("📡️ Session changed. Updating realtime auth");
                self.transport.set_auth(&s.access_token);
            },
            _ => trace!("📡️ Session cleared. Realtime auth left as is"),
        }
    }

    /// App-state callback. Coming back to the foreground from the background (or from inactive) runs a reconnect
    /// cycle after a short settle delay.
    pub async fn on_app_state_change(&self, next: AppState) -> CycleOutcome {
        let previous = std::mem::replace(&mut *self.lock_app_state(), next);
        if previous.is_foreground() || !next.is_foreground() {
            trace!("📡️ App state {previous:?} -> {next:?}");
            return CycleOutcome::NotNeeded;
        }
        info!("📡️ App resumed from {previous:?}");
        self.reconnect(ReconnectTrigger::AppResume).await
    }

    /// Network callback. Only a status that is online triggers a cycle.
    pub async fn on_network_change(&self, status: NetworkStatus) -> CycleOutcome {
        if !status.is_online() {
            debug!("📡️ Network is offline. Waiting for it to come back");
            return CycleOutcome::NotNeeded;
        }
        self.reconnect(ReconnectTrigger::NetworkRegain).await
    }

    /// One tick of the health sweep. Skipped while the app is not in the foreground. Rebuilds the channels if any of
    /// them is closed or errored.
    pub async fn health_check(&self) -> CycleOutcome {
        if !self.app_state().is_foreground() {
            return CycleOutcome::NotNeeded;
        }
        let states = self.transport.channel_states();
        self.monitor.observe(&states).await;
        let broken = states.iter().filter(|s| s.is_broken()).count();
        if broken == 0 {
            return CycleOutcome::NotNeeded;
        }
        debug!("📡️ {broken} of {} channels are down", states.len());
        self.reconnect(ReconnectTrigger::HealthSweep).await
    }

    /// Runs the health sweep forever. Abort the task running it to stop.
    pub async fn run_health_sweep(&self) {
        let mut interval = tokio::time::interval(self.config.health_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.health_check().await;
        }
    }

    async fn reconnect(&self, trigger: ReconnectTrigger) -> CycleOutcome {
        let Some(_ticket) = self.guard.try_begin() else {
            debug!("📡️ Ignoring {trigger}. A reconnect cycle is already under way");
            return CycleOutcome::Debounced;
        };
        info!("📡️ Reconnecting realtime channels after {trigger}");
        match trigger {
            ReconnectTrigger::AppResume => {
                tokio::time::sleep(self.config.settle_delay).await;
                self.refresh_auth().await;
            },
            ReconnectTrigger::NetworkRegain => self.refresh_auth().await,
            ReconnectTrigger::HealthSweep => {},
        }
        match self.transport.resubscribe_all().await {
            Ok(channels) => {
                info!("📡️ {channels} channel(s) re-joined after {trigger}");
                let event = ReconnectedEvent { trigger, channels, at: Utc::now() };
                self.monitor.reconnected(event).await;
                CycleOutcome::Reconnected { channels }
            },
            Err(e) => {
                warn!("📡️ Reconnect after {trigger} failed. {e}");
                self.monitor.record_error(e.to_string());
                CycleOutcome::Failed(e)
            },
        }
    }

    /// Refreshes the session if it is about to expire, then hands the current token to the transport. Failures are
    /// logged; the channels are rebuilt regardless.
    async fn refresh_auth(&self) {
        let session = match self.sessions.current_session().await {
            Ok(s) => s,
            Err(e) => {
                warn!("📡️ {e}");
                return;
            },
        };
        let Some(session) = session else {
            trace!("📡️ No session. Reconnecting anonymously");
            return;
        };
        let margin =
            chrono::Duration::from_std(self.config.refresh_margin).unwrap_or_else(|_| chrono::Duration::zero());
        let session = if session.expires_within(Utc::now(), margin) {
            debug!("📡️ Session is about to expire. Refreshing");
            match self.sessions.refresh_session().await {
                Ok(Some(fresh)) => fresh,
                Ok(None) => session,
                Err(e) => {
                    warn!("📡️ {e}");
                    session
                },
            }
        } else {
            session
        };
        self.on_auth_state_change(Some(&session));
    }

    fn lock_app_state(&self) -> MutexGuard<'_, AppState> {
        self.app_state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
