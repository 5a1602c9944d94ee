use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use deposit_engine::{
    traits::PaymentProviderError,
    DepositFlowError,
    DepositGatewayError,
    ReconciliationError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("{0}")]
    AuthenticationError(#[from] AuthError),
    #[error("{0}")]
    NoRecordFound(String),
    #[error("{0}")]
    InsufficientPermissions(String),
    /// The store refused the request. The message is passed on to the caller verbatim.
    #[error("{0}")]
    Rejected(String),
    /// The gateway said no. Its message is passed on.
    #[error("{0}")]
    GatewayRejected(String),
    #[error("{0}")]
    GatewayUnavailable(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::ForbiddenPeer => StatusCode::FORBIDDEN,
                AuthError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::UNAUTHORIZED,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Rejected(_) => StatusCode::BAD_REQUEST,
            Self::GatewayRejected(_) => StatusCode::BAD_REQUEST,
            Self::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingToken,
    #[error("Invalid or expired session")]
    InvalidSession,
    #[error("Could not reach the auth service. {0}")]
    ServiceUnavailable(String),
    #[error("Unauthorized")]
    InvalidCronSecret,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Requests from this address are not accepted")]
    ForbiddenPeer,
}

impl From<DepositGatewayError> for ServerError {
    fn from(e: DepositGatewayError) -> Self {
        match e {
            DepositGatewayError::DatabaseError(_) | DepositGatewayError::SerializationError(_) => {
                Self::BackendError(e.to_string())
            },
            _ => Self::Rejected(e.to_string()),
        }
    }
}

impl From<PaymentProviderError> for ServerError {
    fn from(e: PaymentProviderError) -> Self {
        match e {
            PaymentProviderError::Rejected(msg) => Self::GatewayRejected(msg),
            PaymentProviderError::Unavailable(_) | PaymentProviderError::InvalidResponse(_) => {
                Self::GatewayUnavailable(e.to_string())
            },
        }
    }
}

impl From<DepositFlowError> for ServerError {
    fn from(e: DepositFlowError) -> Self {
        match e {
            DepositFlowError::Forbidden => Self::InsufficientPermissions(e.to_string()),
            DepositFlowError::Validation(msg) => Self::InvalidRequestBody(msg),
            DepositFlowError::Store(e) => e.into(),
            DepositFlowError::Gateway(e) => e.into(),
        }
    }
}

impl From<ReconciliationError> for ServerError {
    fn from(e: ReconciliationError) -> Self {
        match e {
            // Anything the store refuses during reconciliation means the transition did not commit.
            ReconciliationError::Store(e) => Self::BackendError(e.to_string()),
            ReconciliationError::TransactionNotFound(_) => Self::NoRecordFound(e.to_string()),
            ReconciliationError::Gateway(e) => e.into(),
            ReconciliationError::UnreadableEvent(_) => Self::BackendError(e.to_string()),
        }
    }
}
