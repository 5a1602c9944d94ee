//! `SqliteDatabase` is the concrete SQLite backend for the deposit engine.
//!
//! It implements [`DepositDatabase`] and [`NotificationManagement`].
//!
//! SQLite allows a single writer at a time. Every atomic procedure here opens its transaction with a write statement,
//! so the transaction holds the write lock before it reads anything. Competing procedures wait on the busy timeout
//! rather than reading stale rows and failing on lock upgrade.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, deposits, listings, new_pool, notifications, purchases, transactions, webhook_events};
use crate::{
    db_types::{
        Deposit,
        DepositInitialization,
        DepositRequest,
        DepositStatus,
        DEPOSIT_CURRENCY,
        NewNotification,
        NewPaymentTransaction,
        NewWebhookEvent,
        Notification,
        PaymentPurpose,
        PaymentTransaction,
        Pesewas,
        PushToken,
        ReminderTier,
        Subscription,
        TransactionStatus,
    },
    helpers::{new_deposit_reference, reservation_expired_for_buyer, reservation_expired_for_seller, trial_expired},
    traits::{
        ChargeOutcome,
        ChargeStatus,
        DepositDatabase,
        DepositGatewayError,
        NotificationManagement,
        PurposeEffect,
        ReminderCandidate,
        SettlementResult,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl DepositDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn initialize_deposit(
        &self,
        request: DepositRequest,
        amount_per_unit: Pesewas,
        hold_expires_at: DateTime<Utc>,
    ) -> Result<DepositInitialization, DepositGatewayError> {
        let qty = request.reserved_quantity;
        if qty < 1 {
            return Err(DepositGatewayError::InvalidQuantity(qty));
        }
        let mut tx = self.pool.begin().await?;
        if !listings::try_reserve(&request.listing_id, &request.buyer_id, qty, &mut tx).await? {
            // Nothing was written, so dropping `tx` rolls back cleanly.
            let listing = listings::fetch_listing(&request.listing_id, &mut tx).await?;
            return Err(match listing {
                None => DepositGatewayError::ListingNotFound(request.listing_id),
                Some(l) if l.seller_id == request.buyer_id => DepositGatewayError::OwnListing,
                Some(l) => DepositGatewayError::ListingUnavailable { requested: qty, available: l.available_quantity },
            });
        }
        if deposits::fetch_active_for_buyer(&request.listing_id, &request.buyer_id, &mut tx).await?.is_some() {
            debug!("🗃️ {} already has a live deposit on listing {}", request.buyer_id, request.listing_id);
            return Err(DepositGatewayError::DuplicateActiveDeposit);
        }
        let listing = listings::fetch_listing(&request.listing_id, &mut tx)
            .await?
            .ok_or_else(|| DepositGatewayError::ListingNotFound(request.listing_id.clone()))?;
        let email = listings::fetch_profile_email(&request.buyer_id, &mut tx)
            .await?
            .ok_or_else(|| DepositGatewayError::ProfileNotFound(request.buyer_id.clone()))?;
        let amount = amount_per_unit * qty;
        let reference = new_deposit_reference();
        let deposit =
            deposits::insert_deposit(&request, &listing.seller_id, amount, &reference, hold_expires_at, &mut tx).await?;
        let payment = NewPaymentTransaction {
            reference: reference.clone(),
            user_id: request.buyer_id.clone(),
            amount,
            currency: DEPOSIT_CURRENCY.to_string(),
            purpose: PaymentPurpose::Deposit,
            purpose_id: deposit.id,
        };
        transactions::insert_transaction(&payment, &mut tx).await?;
        tx.commit().await?;
        info!(
            "🗃️ Deposit #{} [{reference}] reserves {qty} of listing {} for {}. Amount {amount}",
            deposit.id, listing.id, request.buyer_id
        );
        Ok(DepositInitialization {
            deposit_id: deposit.id,
            reference,
            amount,
            email,
            listing_title: listing.title,
            expires_at: hold_expires_at,
        })
    }

    async fn release_pending_deposit(
        &self,
        reference: &str,
        reason: &str,
    ) -> Result<Option<Deposit>, DepositGatewayError> {
        let mut tx = self.pool.begin().await?;
        let Some(deposit) = deposits::cancel_pending(reference, &mut tx).await? else {
            debug!("🗃️ No pending deposit for {reference}. Nothing to release");
            return Ok(None);
        };
        listings::release(&deposit.listing_id, deposit.reserved_quantity, &mut tx).await?;
        transactions::settle(reference, TransactionStatus::Failed, None, Some(reason.to_string()), None, &mut tx)
            .await?;
        tx.commit().await?;
        info!("🗃️ Deposit #{} [{reference}] released. {reason}", deposit.id);
        Ok(Some(deposit))
    }

    async fn fetch_transaction(&self, reference: &str) -> Result<Option<PaymentTransaction>, DepositGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let tx = transactions::fetch_by_reference(reference, &mut conn).await?;
        Ok(tx)
    }

    /// In a single atomic transaction:
    /// * flags the transaction as having received a callback (this takes the write lock),
    /// * returns early if the transaction is unknown or already settled,
    /// * works out whether the charge can be applied as-is, or needs a human to look at it,
    /// * settles the transaction,
    /// * applies the effect to the credit purchase, subscription or deposit it pays for.
    async fn apply_charge_outcome(
        &self,
        outcome: ChargeOutcome,
        paid_expires_at: DateTime<Utc>,
    ) -> Result<SettlementResult, DepositGatewayError> {
        let reference = outcome.reference.as_str();
        let mut tx = self.pool.begin().await?;
        if !transactions::mark_received(reference, &mut tx).await? {
            warn!("🗃️ Charge outcome for unknown reference {reference}");
            return Ok(SettlementResult::UnknownReference(outcome.reference));
        }
        let current = transactions::fetch_by_reference(reference, &mut tx)
            .await?
            .ok_or_else(|| DepositGatewayError::TransactionNotFound(reference.to_string()))?;
        if current.status.is_terminal() {
            debug!("🗃️ Transaction {reference} is already {}. Ignoring repeat delivery", current.status);
            tx.commit().await?;
            return Ok(SettlementResult::AlreadySettled(current));
        }
        let mut status = match outcome.status {
            ChargeStatus::Success => TransactionStatus::Success,
            ChargeStatus::Failed => TransactionStatus::Failed,
        };
        let mut review_reason = None;
        if status == TransactionStatus::Success && outcome.amount != current.amount {
            warn!(
                "🗃️ Amount mismatch on {reference}. Expected {}, gateway reported {}",
                current.amount, outcome.amount
            );
            review_reason = Some(format!("Amount mismatch: expected {}, received {}", current.amount, outcome.amount));
            status = TransactionStatus::Failed;
        }
        if status == TransactionStatus::Success && current.purpose == PaymentPurpose::Deposit {
            if let Some(d) = deposits::fetch_by_reference(reference, &mut tx).await? {
                if d.status != DepositStatus::Pending {
                    review_reason = Some(format!("Charge arrived after deposit #{} was {}. Refund required", d.id, d.status));
                }
            }
        }
        let gateway_response = match &outcome.gateway_response {
            serde_json::Value::Null => None,
            v => Some(serde_json::to_string(v)?),
        };
        let paid_at = if status == TransactionStatus::Success { outcome.paid_at.or_else(|| Some(Utc::now())) } else { None };
        let Some(settled) =
            transactions::settle(reference, status, gateway_response, review_reason, paid_at, &mut tx).await?
        else {
            tx.commit().await?;
            return Ok(SettlementResult::AlreadySettled(current));
        };
        let effect = match (settled.status, settled.purpose) {
            (TransactionStatus::Success, PaymentPurpose::CreditPurchase) => {
                let granted = purchases::complete_credit_purchase(settled.purpose_id, reference, &mut tx).await?;
                PurposeEffect::CreditsGranted { purchase_id: settled.purpose_id, granted }
            },
            (TransactionStatus::Success, PaymentPurpose::Subscription) => {
                if purchases::activate_subscription(settled.purpose_id, reference, &mut tx).await? {
                    PurposeEffect::SubscriptionActivated { subscription_id: settled.purpose_id }
                } else {
                    PurposeEffect::Unchanged
                }
            },
            (TransactionStatus::Success, PaymentPurpose::Deposit) => {
                match deposits::mark_paid(reference, paid_expires_at, &mut tx).await? {
                    Some(deposit) => PurposeEffect::DepositPaid(deposit),
                    None => match deposits::flag_for_refund(reference, &mut tx).await? {
                        Some(deposit) => PurposeEffect::LateDepositPayment(deposit),
                        None => PurposeEffect::Unchanged,
                    },
                }
            },
            (_, PaymentPurpose::CreditPurchase) => {
                if purchases::fail_credit_purchase(settled.purpose_id, &mut tx).await? {
                    PurposeEffect::PurchaseFailed { purchase_id: settled.purpose_id }
                } else {
                    PurposeEffect::Unchanged
                }
            },
            (_, PaymentPurpose::Subscription) => {
                if purchases::cancel_subscription(settled.purpose_id, &mut tx).await? {
                    PurposeEffect::SubscriptionCancelled { subscription_id: settled.purpose_id }
                } else {
                    PurposeEffect::Unchanged
                }
            },
            (_, PaymentPurpose::Deposit) => match deposits::cancel_pending(reference, &mut tx).await? {
                Some(deposit) => {
                    listings::release(&deposit.listing_id, deposit.reserved_quantity, &mut tx).await?;
                    PurposeEffect::DepositCancelled(deposit)
                },
                None => PurposeEffect::Unchanged,
            },
        };
        tx.commit().await?;
        info!("🗃️ Transaction {reference} settled as {}. Effect: {effect:?}", settled.status);
        Ok(SettlementResult::Applied { transaction: settled, effect })
    }

    async fn mark_webhook_processed(&self, reference: &str) -> Result<(), DepositGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let n = transactions::mark_webhook_processed(reference, &mut conn).await?;
        if n == 0 {
            return Err(DepositGatewayError::TransactionNotFound(reference.to_string()));
        }
        Ok(())
    }

    async fn complete_credit_purchase(&self, purchase_id: i64, reference: &str) -> Result<bool, DepositGatewayError> {
        let mut tx = self.pool.begin().await?;
        let granted = purchases::complete_credit_purchase(purchase_id, reference, &mut tx).await?;
        tx.commit().await?;
        Ok(granted)
    }

    async fn log_webhook_event(&self, event: NewWebhookEvent) -> Result<i64, DepositGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let id = webhook_events::insert_event(event, &mut conn).await?;
        Ok(id)
    }

    async fn finish_webhook_event(&self, id: i64, error: Option<String>) -> Result<(), DepositGatewayError> {
        let mut conn = self.pool.acquire().await?;
        webhook_events::finish_event(id, error, &mut conn).await?;
        Ok(())
    }

    async fn auto_recover_expired_reservations(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Deposit>, DepositGatewayError> {
        let mut tx = self.pool.begin().await?;
        let expired = deposits::expire_overdue(now, &mut tx).await?;
        for deposit in &expired {
            listings::release(&deposit.listing_id, deposit.reserved_quantity, &mut tx).await?;
        }
        tx.commit().await?;
        if !expired.is_empty() {
            info!("🗃️ {} expired reservations recovered", expired.len());
        }
        Ok(expired)
    }

    async fn notify_expired_reservations(&self) -> Result<usize, DepositGatewayError> {
        let pending = {
            let mut conn = self.pool.acquire().await?;
            deposits::fetch_unnotified_expired(&mut conn).await?
        };
        let mut notified = 0;
        for d in pending {
            let mut tx = self.pool.begin().await?;
            // Another sweeper may have notified this one since we looked.
            if !deposits::mark_expiry_notified(d.id, &mut tx).await? {
                continue;
            }
            let buyer = reservation_expired_for_buyer(d.id, &d.listing_id, &d.buyer_id, &d.listing_title);
            let seller =
                reservation_expired_for_seller(d.id, &d.listing_id, &d.seller_id, &d.listing_title, d.reserved_quantity);
            notifications::insert_notification(buyer, &mut tx).await?;
            notifications::insert_notification(seller, &mut tx).await?;
            tx.commit().await?;
            notified += 1;
        }
        Ok(notified)
    }

    async fn fetch_reminder_candidates(&self) -> Result<Vec<ReminderCandidate>, DepositGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let candidates = deposits::fetch_reminder_candidates(&mut conn).await?;
        Ok(candidates)
    }

    async fn record_reminder(
        &self,
        deposit_id: i64,
        tier: ReminderTier,
        notification: NewNotification,
    ) -> Result<Option<Notification>, DepositGatewayError> {
        let mut tx = self.pool.begin().await?;
        if !deposits::claim_reminder_tier(deposit_id, tier.rank(), &mut tx).await? {
            trace!("🗃️ Reminder {tier} for deposit #{deposit_id} already sent");
            return Ok(None);
        }
        let notification = notifications::insert_notification(notification, &mut tx).await?;
        tx.commit().await?;
        Ok(Some(notification))
    }

    async fn expire_trials(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>, DepositGatewayError> {
        let mut tx = self.pool.begin().await?;
        let expired = purchases::expire_trials(now, &mut tx).await?;
        for subscription in &expired {
            notifications::insert_notification(trial_expired(subscription), &mut tx).await?;
        }
        tx.commit().await?;
        if !expired.is_empty() {
            info!("🗃️ {} trials expired", expired.len());
        }
        Ok(expired)
    }
}

impl NotificationManagement for SqliteDatabase {
    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, DepositGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let notification = notifications::insert_notification(notification, &mut conn).await?;
        Ok(notification)
    }

    async fn fetch_notifications_for_user(&self, user_id: &str) -> Result<Vec<Notification>, DepositGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let result = notifications::fetch_notifications_for_user(user_id, &mut conn).await?;
        Ok(result)
    }

    async fn fetch_active_push_tokens(&self, user_id: &str) -> Result<Vec<PushToken>, DepositGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let tokens = notifications::fetch_active_push_tokens(user_id, &mut conn).await?;
        Ok(tokens)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `DG_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Applies any outstanding migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
