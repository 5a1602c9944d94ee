use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db_types::{Deposit, PaymentTransaction, Pesewas, ReminderTier, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeStatus {
    Success,
    Failed,
}

/// A charge result reported by the gateway, either via webhook or via an explicit verification call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeOutcome {
    pub reference: String,
    pub status: ChargeStatus,
    pub amount: Pesewas,
    pub paid_at: Option<DateTime<Utc>>,
    /// The raw gateway payload, stored verbatim on the transaction
    pub gateway_response: serde_json::Value,
}

impl ChargeOutcome {
    pub fn success<S: Into<String>>(reference: S, amount: Pesewas) -> Self {
        Self {
            reference: reference.into(),
            status: ChargeStatus::Success,
            amount,
            paid_at: Some(Utc::now()),
            gateway_response: serde_json::Value::Null,
        }
    }

    pub fn failed<S: Into<String>>(reference: S, amount: Pesewas) -> Self {
        Self {
            reference: reference.into(),
            status: ChargeStatus::Failed,
            amount,
            paid_at: None,
            gateway_response: serde_json::Value::Null,
        }
    }

    pub fn with_gateway_response(mut self, response: serde_json::Value) -> Self {
        self.gateway_response = response;
        self
    }
}

/// What happened to the row a transaction was paying for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurposeEffect {
    /// `granted` is false when the purchase had already been completed by an earlier call.
    CreditsGranted { purchase_id: i64, granted: bool },
    SubscriptionActivated { subscription_id: i64 },
    DepositPaid(Deposit),
    /// The charge succeeded, but the deposit was no longer pending (typically, the hold had lapsed). The buyer is owed a
    /// refund.
    LateDepositPayment(Deposit),
    PurchaseFailed { purchase_id: i64 },
    SubscriptionCancelled { subscription_id: i64 },
    DepositCancelled(Deposit),
    /// The purpose row was missing or already in a final state.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementResult {
    /// The transaction moved out of `pending` in this call.
    Applied { transaction: PaymentTransaction, effect: PurposeEffect },
    /// Some earlier delivery already settled this transaction. Nothing was changed.
    AlreadySettled(PaymentTransaction),
    /// No transaction with this reference exists.
    UnknownReference(String),
}

impl SettlementResult {
    pub fn transaction(&self) -> Option<&PaymentTransaction> {
        match self {
            Self::Applied { transaction, .. } => Some(transaction),
            Self::AlreadySettled(transaction) => Some(transaction),
            Self::UnknownReference(_) => None,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryResult {
    pub recovered: Vec<Deposit>,
    pub notified: usize,
}

impl RecoveryResult {
    pub fn recovered_count(&self) -> usize {
        self.recovered.len()
    }

    pub fn units_released(&self) -> i64 {
        self.recovered.iter().map(|d| d.reserved_quantity).sum()
    }
}

/// A paid deposit with the listing and seller details needed to write reminder copy.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ReminderCandidate {
    pub deposit_id: i64,
    pub listing_id: String,
    pub buyer_id: String,
    pub expires_at: DateTime<Utc>,
    pub last_reminder_sent: Option<i64>,
    pub listing_title: String,
    pub seller_name: Option<String>,
}

impl ReminderCandidate {
    pub fn hours_until_expiry(&self, now: DateTime<Utc>) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let secs = (self.expires_at - now).num_seconds() as f64;
        secs / 3600.0
    }

    pub fn already_sent(&self, tier: ReminderTier) -> bool {
        self.last_reminder_sent.map(|rank| rank >= tier.rank()).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderReport {
    pub processed: usize,
    pub day1: usize,
    pub day2: usize,
    pub day3: usize,
}

impl ReminderReport {
    pub fn total(&self) -> usize {
        self.day1 + self.day2 + self.day3
    }

    pub fn record(&mut self, tier: ReminderTier) {
        match tier {
            ReminderTier::Day1 => self.day1 += 1,
            ReminderTier::Day2 => self.day2 += 1,
            ReminderTier::Day3 => self.day3 += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialExpiryResult {
    pub expired: Vec<Subscription>,
}

impl TrialExpiryResult {
    pub fn count(&self) -> usize {
        self.expired.len()
    }
}
