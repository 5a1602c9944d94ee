use deposit_engine::{
    db_types::{DepositRequest, Pesewas},
    traits::{RecoveryResult, ReminderReport, TrialExpiryResult},
    DepositCheckout,
};
use serde::{Deserialize, Serialize};

fn one() -> i64 {
    1
}

/// Body of `POST /initialize-deposit-payment`.
///
/// The ids default to empty so that a missing field produces the same validation error as a blank one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeDepositParams {
    #[serde(default)]
    pub listing_id: String,
    #[serde(default)]
    pub buyer_id: String,
    #[serde(default = "one")]
    pub reserved_quantity: i64,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub offer_id: Option<String>,
}

impl From<InitializeDepositParams> for DepositRequest {
    fn from(p: InitializeDepositParams) -> Self {
        Self {
            listing_id: p.listing_id,
            buyer_id: p.buyer_id,
            reserved_quantity: p.reserved_quantity,
            conversation_id: p.conversation_id,
            offer_id: p.offer_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeDepositResponse {
    pub success: bool,
    pub reference: String,
    pub amount: Pesewas,
    pub authorization_url: String,
    pub access_code: String,
}

impl From<DepositCheckout> for InitializeDepositResponse {
    fn from(c: DepositCheckout) -> Self {
        Self {
            success: true,
            reference: c.reference,
            amount: c.amount,
            authorization_url: c.authorization_url,
            access_code: c.access_code,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyParams {
    pub reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryResponse {
    pub success: bool,
    pub recovered: usize,
    pub notified: usize,
}

impl From<RecoveryResult> for RecoveryResponse {
    fn from(r: RecoveryResult) -> Self {
        Self { success: true, recovered: r.recovered_count(), notified: r.notified }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemindersSent {
    pub day1: usize,
    pub day2: usize,
    pub day3: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderResponse {
    pub success: bool,
    pub processed: usize,
    pub reminders_sent: RemindersSent,
}

impl From<ReminderReport> for ReminderResponse {
    fn from(r: ReminderReport) -> Self {
        let reminders_sent = RemindersSent { day1: r.day1, day2: r.day2, day3: r.day3, total: r.total() };
        Self { success: true, processed: r.processed, reminders_sent }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialExpiryResponse {
    pub success: bool,
    pub expired: usize,
}

impl From<TrialExpiryResult> for TrialExpiryResponse {
    fn from(r: TrialExpiryResult) -> Self {
        Self { success: true, expired: r.count() }
    }
}
