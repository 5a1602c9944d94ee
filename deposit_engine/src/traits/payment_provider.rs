use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{PaymentPurpose, Pesewas},
    traits::{ChargeOutcome, ChargeStatus},
};

#[derive(Debug, Clone, Error)]
pub enum PaymentProviderError {
    /// The gateway answered, and said no.
    #[error("{0}")]
    Rejected(String),
    /// The gateway could not be reached, or timed out.
    #[error("Payment gateway unavailable. {0}")]
    Unavailable(String),
    #[error("Unexpected response from payment gateway. {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub reference: String,
    pub email: String,
    pub amount: Pesewas,
    pub currency: String,
    pub purpose: PaymentPurpose,
    /// Free-form context attached to the gateway transaction for traceability
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub reference: String,
    pub authorization_url: String,
    pub access_code: String,
}

/// The gateway's view of a transaction. `status` is `None` while the charge is still in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedCharge {
    pub reference: String,
    pub status: Option<ChargeStatus>,
    pub amount: Pesewas,
    pub paid_at: Option<DateTime<Utc>>,
    pub gateway_response: serde_json::Value,
}

impl VerifiedCharge {
    /// The charge outcome, if the gateway has reached a verdict.
    pub fn outcome(&self) -> Option<ChargeOutcome> {
        self.status.map(|status| ChargeOutcome {
            reference: self.reference.clone(),
            status,
            amount: self.amount,
            paid_at: self.paid_at,
            gateway_response: self.gateway_response.clone(),
        })
    }
}

/// The hosted payment gateway.
#[allow(async_fn_in_trait)]
pub trait PaymentProvider {
    /// Opens a gateway transaction and returns the hosted checkout page for it.
    async fn start_checkout(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentProviderError>;

    /// Asks the gateway for the current state of the transaction with the given reference.
    async fn verify_charge(&self, reference: &str) -> Result<VerifiedCharge, PaymentProviderError>;
}
