use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use dg_common::Pesewas;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

/// Every gateway transaction is charged in Ghana cedis.
pub const DEPOSIT_CURRENCY: &str = dg_common::GHS_CURRENCY_CODE;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion from string: {0}")]
pub struct ConversionError(String);

//--------------------------------------   DepositStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    /// The deposit row exists and the buyer has been sent to the gateway, but no payment has been confirmed.
    Pending,
    /// The gateway confirmed the charge. The countdown to the meetup deadline is running.
    Paid,
    /// Buyer and seller confirmed the meetup.
    Confirmed,
    /// The hold lapsed and the reserved quantity went back to the listing.
    Expired,
    /// The deposit was returned to the buyer.
    Refunded,
    /// The charge failed, or the hold was released before any payment was made.
    Cancelled,
}

impl DepositStatus {
    /// `Pending` and `Paid` deposits hold inventory. Everything else is terminal.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Paid)
    }
}

impl Display for DepositStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Confirmed => "confirmed",
            Self::Expired => "expired",
            Self::Refunded => "refunded",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for DepositStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "confirmed" => Ok(Self::Confirmed),
            "expired" => Ok(Self::Expired),
            "refunded" => Ok(Self::Refunded),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid deposit status: {s}"))),
        }
    }
}

//--------------------------------------      Deposit        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Deposit {
    pub id: i64,
    pub listing_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub reserved_quantity: i64,
    pub amount: Pesewas,
    pub status: DepositStatus,
    pub payment_reference: String,
    pub conversation_id: Option<String>,
    pub offer_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// The rank of the last [`ReminderTier`] sent for this deposit
    pub last_reminder_sent: Option<i64>,
    pub expiry_notified: bool,
    /// Set when a charge succeeded after the hold had already been released
    pub needs_refund: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A buyer's request to reserve `reserved_quantity` units of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub listing_id: String,
    pub buyer_id: String,
    pub reserved_quantity: i64,
    pub conversation_id: Option<String>,
    pub offer_id: Option<String>,
}

impl DepositRequest {
    pub fn new<S1: Into<String>, S2: Into<String>>(listing_id: S1, buyer_id: S2, reserved_quantity: i64) -> Self {
        Self {
            listing_id: listing_id.into(),
            buyer_id: buyer_id.into(),
            reserved_quantity,
            conversation_id: None,
            offer_id: None,
        }
    }

    pub fn with_conversation<S: Into<String>>(mut self, conversation_id: S) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_offer<S: Into<String>>(mut self, offer_id: S) -> Self {
        self.offer_id = Some(offer_id.into());
        self
    }
}

/// The result of the atomic deposit creation procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositInitialization {
    pub deposit_id: i64,
    pub reference: String,
    pub amount: Pesewas,
    pub email: String,
    pub listing_title: String,
    pub expires_at: DateTime<Utc>,
}

//--------------------------------------      Listing        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub seller_id: String,
    pub title: String,
    pub price: Pesewas,
    pub available_quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------  TransactionStatus  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Success => f.write_str("success"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

//--------------------------------------   PaymentPurpose    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentPurpose {
    CreditPurchase,
    Subscription,
    Deposit,
}

impl Display for PaymentPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreditPurchase => f.write_str("credit_purchase"),
            Self::Subscription => f.write_str("subscription"),
            Self::Deposit => f.write_str("deposit"),
        }
    }
}

//-------------------------------------- PaymentTransaction  ---------------------------------------------------------
/// The gateway-side record of a charge attempt. `reference` is the idempotency key for every callback.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: i64,
    pub reference: String,
    pub user_id: String,
    pub amount: Pesewas,
    pub currency: String,
    pub purpose: PaymentPurpose,
    pub purpose_id: i64,
    pub status: TransactionStatus,
    pub webhook_received: bool,
    pub webhook_processed: bool,
    /// Raw JSON payload from the gateway
    pub gateway_response: Option<String>,
    pub review_reason: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPaymentTransaction {
    pub reference: String,
    pub user_id: String,
    pub amount: Pesewas,
    pub currency: String,
    pub purpose: PaymentPurpose,
    pub purpose_id: i64,
}

//--------------------------------------   CreditPurchase    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CreditPurchase {
    pub id: i64,
    pub user_id: String,
    pub credits: i64,
    pub amount: Pesewas,
    pub status: String,
    pub payment_reference: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    Subscription     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Trial,
    Active,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user_id: String,
    pub plan: String,
    pub status: SubscriptionStatus,
    pub payment_reference: Option<String>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    Notification     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Payment,
    PaymentReview,
    DepositReminder,
    DepositExpired,
    TrialExpired,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    /// JSON blob for the client's deep link
    pub data: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl NewNotification {
    pub fn new<S1, S2, S3>(user_id: S1, notification_type: NotificationType, title: S2, message: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self { user_id: user_id.into(), notification_type, title: title.into(), message: message.into(), data: None }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

//--------------------------------------     PushToken       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PushToken {
    pub id: i64,
    pub user_id: String,
    pub token: String,
    pub platform: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   WebhookEvent      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: i64,
    pub event_type: String,
    pub reference: Option<String>,
    pub payload: String,
    pub processed: bool,
    pub processing_error: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWebhookEvent {
    pub event_type: String,
    pub reference: Option<String>,
    pub payload: String,
}

//--------------------------------------   ReminderTier      ---------------------------------------------------------
/// The three countdown reminders for a paid deposit. The tier rank is persisted in `last_reminder_sent` so that each
/// tier goes out at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderTier {
    Day1,
    Day2,
    Day3,
}

impl ReminderTier {
    pub const ALL: [ReminderTier; 3] = [ReminderTier::Day1, ReminderTier::Day2, ReminderTier::Day3];

    pub fn rank(&self) -> i64 {
        match self {
            Self::Day1 => 1,
            Self::Day2 => 2,
            Self::Day3 => 3,
        }
    }

    /// Inclusive window of hours-until-expiry during which this reminder fires.
    pub fn window(&self) -> (f64, f64) {
        match self {
            Self::Day1 => (46.0, 50.0),
            Self::Day2 => (22.0, 26.0),
            Self::Day3 => (4.0, 8.0),
        }
    }

    /// Which reminder, if any, is due when a deposit has `hours` left before it expires.
    pub fn for_hours_remaining(hours: f64) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| {
            let (lo, hi) = tier.window();
            hours >= lo && hours <= hi
        })
    }
}

impl Display for ReminderTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Day1 => f.write_str("day1"),
            Self::Day2 => f.write_str("day2"),
            Self::Day3 => f.write_str("day3"),
        }
    }
}
