use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    #[error("Could not read the current session. {0}")]
    SessionUnavailable(String),
    #[error("Session refresh failed. {0}")]
    RefreshFailed(String),
    #[error("The realtime transport refused to reconnect. {0}")]
    TransportError(String),
}
