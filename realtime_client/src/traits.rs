use chrono::{DateTime, Duration, Utc};

use crate::RealtimeError;

/// The state of one subscription channel, as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Closed,
    Errored,
    Joined,
    Joining,
    Leaving,
}

impl ChannelState {
    /// A channel in this state will not recover without being re-joined.
    pub fn is_broken(&self) -> bool {
        matches!(self, Self::Closed | Self::Errored)
    }

    /// The channel is delivering messages, or about to.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Joined | Self::Joining)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Active,
    Inactive,
    Background,
}

impl AppState {
    pub fn is_foreground(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// A network status callback. `is_internet_reachable` is `None` when the platform cannot tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStatus {
    pub is_connected: bool,
    pub is_internet_reachable: Option<bool>,
}

impl NetworkStatus {
    pub fn online() -> Self {
        Self { is_connected: true, is_internet_reachable: Some(true) }
    }

    pub fn offline() -> Self {
        Self { is_connected: false, is_internet_reachable: Some(false) }
    }

    /// Unknown reachability counts as online.
    pub fn is_online(&self) -> bool {
        self.is_connected && self.is_internet_reachable.unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new<S: Into<String>>(access_token: S, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { access_token: access_token.into(), expires_at }
    }

    /// True if the session has expired, or will within `margin` of `now`. Sessions without an expiry never do.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at.map(|t| t - now <= margin).unwrap_or(false)
    }
}

/// The realtime layer the channels are subscribed through.
#[allow(async_fn_in_trait)]
pub trait RealtimeTransport {
    /// Sets the access token used to authorize channel joins and already-open channels.
    fn set_auth(&self, access_token: &str);
    fn channel_states(&self) -> Vec<ChannelState>;
    /// Tears down and re-joins every channel. Returns the number of channels re-joined.
    async fn resubscribe_all(&self) -> Result<usize, RealtimeError>;
}

/// Where the user's session lives.
#[allow(async_fn_in_trait)]
pub trait SessionSource {
    async fn current_session(&self) -> Result<Option<Session>, RealtimeError>;
    async fn refresh_session(&self) -> Result<Option<Session>, RealtimeError>;
}
