use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{
        Deposit,
        DepositInitialization,
        DepositRequest,
        NewNotification,
        NewWebhookEvent,
        Notification,
        PaymentTransaction,
        Pesewas,
        ReminderTier,
        Subscription,
    },
    traits::{
        data_objects::{ChargeOutcome, ReminderCandidate, SettlementResult},
        NotificationManagement,
    },
};

#[derive(Debug, Clone, Error)]
pub enum DepositGatewayError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Listing {0} does not exist")]
    ListingNotFound(String),
    #[error("Listing is unavailable. Requested {requested}, but only {available} left")]
    ListingUnavailable { requested: i64, available: i64 },
    #[error("You already have an active deposit for this listing")]
    DuplicateActiveDeposit,
    #[error("You cannot place a deposit on your own listing")]
    OwnListing,
    #[error("Reserved quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),
    #[error("No profile found for user {0}")]
    ProfileNotFound(String),
    #[error("Transaction {0} does not exist")]
    TransactionNotFound(String),
    #[error("Could not serialize data for storage. {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for DepositGatewayError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            // The live-deposit index is the only unique constraint a caller can trip over.
            sqlx::Error::Database(err) if err.is_unique_violation() => Self::DuplicateActiveDeposit,
            _ => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for DepositGatewayError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

/// The data store backing the deposit gateway.
///
/// Every method is a self-contained atomic procedure. Implementations must guarantee that concurrent or repeated calls
/// never apply an effect twice. Guards are expressed as conditions on row status (e.g. `WHERE status = 'pending'`),
/// so rows that a previous call already moved are simply excluded.
#[allow(async_fn_in_trait)]
pub trait DepositDatabase: Clone + NotificationManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Creates a pending deposit for the given request, in a single atomic transaction:
    /// * Decrements the listing's available quantity, failing with [`DepositGatewayError::ListingUnavailable`] if
    ///   there is not enough left.
    /// * Rejects the request if the buyer already has a pending or paid deposit on this listing, or owns the listing.
    /// * Generates a fresh payment reference and computes `amount = amount_per_unit * reserved_quantity`.
    /// * Inserts the deposit (status `pending`, expiring at `hold_expires_at`) and its `pending` payment transaction.
    async fn initialize_deposit(
        &self,
        request: DepositRequest,
        amount_per_unit: Pesewas,
        hold_expires_at: DateTime<Utc>,
    ) -> Result<DepositInitialization, DepositGatewayError>;

    /// Undoes [`Self::initialize_deposit`] for a deposit that can never be paid, e.g. because the gateway refused to
    /// open a transaction for it. Only `pending` deposits are affected: the deposit is cancelled, its quantity goes
    /// back to the listing and the transaction is marked failed.
    ///
    /// Returns `None` if there was no pending deposit for the reference.
    async fn release_pending_deposit(
        &self,
        reference: &str,
        reason: &str,
    ) -> Result<Option<Deposit>, DepositGatewayError>;

    async fn fetch_transaction(&self, reference: &str) -> Result<Option<PaymentTransaction>, DepositGatewayError>;

    /// Applies a gateway charge result to the transaction and the row it pays for, in one atomic step.
    ///
    /// Only a `pending` transaction is updated. If the transaction is already `success` or `failed` the call is a
    /// no-op and returns [`SettlementResult::AlreadySettled`].
    ///
    /// A successful charge whose amount differs from the recorded amount is stored as `failed`, with a
    /// `review_reason`, and the failure side effects are applied.
    ///
    /// Deposits moved to `paid` get `paid_expires_at` as their new expiry.
    async fn apply_charge_outcome(
        &self,
        outcome: ChargeOutcome,
        paid_expires_at: DateTime<Utc>,
    ) -> Result<SettlementResult, DepositGatewayError>;

    /// Sets `webhook_received` and `webhook_processed` on the transaction.
    async fn mark_webhook_processed(&self, reference: &str) -> Result<(), DepositGatewayError>;

    /// Marks a credit purchase as completed and grants its credits. Idempotent: returns `false` if the purchase was
    /// not pending.
    async fn complete_credit_purchase(&self, purchase_id: i64, reference: &str) -> Result<bool, DepositGatewayError>;

    /// Appends a webhook delivery to the audit log, returning its id.
    async fn log_webhook_event(&self, event: NewWebhookEvent) -> Result<i64, DepositGatewayError>;

    /// Marks an audit log entry as processed, recording the error if there was one.
    async fn finish_webhook_event(&self, id: i64, error: Option<String>) -> Result<(), DepositGatewayError>;

    /// Moves every `pending` or `paid` deposit whose `expires_at` is not after `now` to `expired`, returning its
    /// reserved quantity to the listing. Set-based and atomic: a concurrent or repeated call cannot release the same
    /// deposit twice.
    async fn auto_recover_expired_reservations(&self, now: DateTime<Utc>)
        -> Result<Vec<Deposit>, DepositGatewayError>;

    /// Writes "reservation expired" notifications for expired deposits that have not been notified yet. Returns the
    /// number of deposits notified.
    async fn notify_expired_reservations(&self) -> Result<usize, DepositGatewayError>;

    /// All `paid` deposits with an expiry time.
    async fn fetch_reminder_candidates(&self) -> Result<Vec<ReminderCandidate>, DepositGatewayError>;

    /// Claims the reminder `tier` for the deposit and stores the notification, atomically. Returns `None` without
    /// writing anything if this tier (or a later one) was already sent, or the deposit is no longer paid.
    async fn record_reminder(
        &self,
        deposit_id: i64,
        tier: ReminderTier,
        notification: NewNotification,
    ) -> Result<Option<Notification>, DepositGatewayError>;

    /// Moves `trial` subscriptions whose trial ended before `now` to `expired` and notifies their owners.
    async fn expire_trials(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>, DepositGatewayError>;
}
