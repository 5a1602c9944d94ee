use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PaystackApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    /// The request never got an answer: connection failure, timeout and the like.
    #[error("Could not reach Paystack: {0}")]
    Transport(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    /// Paystack answered with an error status. `message` is Paystack's own explanation when it gave one.
    #[error("{message}")]
    QueryError { status: u16, message: String },
    /// A 2xx answer with `"status": false`
    #[error("{0}")]
    Declined(String),
    #[error("Paystack returned no data")]
    EmptyResponse,
}

impl PaystackApiError {
    /// True when retrying later might succeed, i.e. the problem is on the network or Paystack's side.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::QueryError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
