use thiserror::Error;

use crate::traits::{DepositGatewayError, PaymentProviderError};

#[derive(Debug, Clone, Error)]
pub enum DepositFlowError {
    #[error("You can only place deposits for yourself")]
    Forbidden,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Store(#[from] DepositGatewayError),
    #[error("{0}")]
    Gateway(#[from] PaymentProviderError),
}

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("{0}")]
    Store(#[from] DepositGatewayError),
    #[error("Transaction {0} not found")]
    TransactionNotFound(String),
    #[error("{0}")]
    Gateway(#[from] PaymentProviderError),
    #[error("Unreadable webhook payload. {0}")]
    UnreadableEvent(String),
}
