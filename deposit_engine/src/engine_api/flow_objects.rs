use serde::{Deserialize, Serialize};

use crate::{
    db_types::{PaymentTransaction, Pesewas},
    traits::ChargeOutcome,
};

/// Everything the client needs to send the buyer to the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositCheckout {
    pub reference: String,
    pub amount: Pesewas,
    pub authorization_url: String,
    pub access_code: String,
}

/// An authenticated webhook delivery, reduced to what the engine cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub event_type: String,
    pub reference: Option<String>,
    pub outcome: EventOutcome,
    /// The raw body, for the audit log
    pub payload: String,
}

/// What a webhook delivery means for the charges the engine tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventOutcome {
    Charge(ChargeOutcome),
    /// A delivery that should settle a charge, but whose payload cannot be read. Carries the reason.
    Unreadable(String),
    /// An event type that does not settle charges
    NoCharge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookDisposition {
    Applied(PaymentTransaction),
    AlreadySettled(PaymentTransaction),
    UnknownReference(String),
    /// An event type that does not settle charges. It is acknowledged and otherwise ignored.
    Ignored(String),
}
