//! Realtime Client
//!
//! The app keeps a handful of subscription channels open against the realtime layer of the data store (chat messages,
//! deposit status, notifications). Mobile sockets die quietly: the app is backgrounded, the phone changes networks, or
//! the access token the channels were joined with expires. This crate keeps those channels alive.
//!
//! * [`RealtimeConnectionManager`] reacts to auth, app-state and network callbacks, and runs the periodic health sweep.
//! * [`ReconnectGuard`] collapses overlapping triggers into a single reconnect cycle.
//! * [`ConnectionMonitor`] tracks whether any channel is live and publishes [`events`] when that changes.
//!
//! The realtime transport and the session store are reached through the traits in [`traits`], so the manager holds no
//! global state and can be driven entirely from tests.
pub mod errors;
pub mod events;
pub mod guard;
pub mod manager;
pub mod monitor;
pub mod traits;

pub use errors::RealtimeError;
pub use guard::{ReconnectGuard, ReconnectTicket};
pub use manager::{CycleOutcome, RealtimeConfig, RealtimeConnectionManager, ReconnectTrigger};
pub use monitor::{ConnectionMonitor, ConnectionStatus};
pub use traits::{AppState, ChannelState, NetworkStatus, RealtimeTransport, Session, SessionSource};
