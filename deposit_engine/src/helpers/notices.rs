//! User-facing notification copy.
//!
//! Every notification the engine writes is built here, so wording stays consistent between the webhook, the sweeper
//! and the reminder dispatcher.
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::db_types::{NewNotification, NotificationType, PaymentTransaction, ReminderTier, Subscription};

pub fn payment_succeeded(tx: &PaymentTransaction) -> NewNotification {
    NewNotification::new(
        &tx.user_id,
        NotificationType::Payment,
        "Payment Successful",
        format!("Your payment of GHS {} has been processed successfully.", tx.amount.cedis_string()),
    )
    .with_data(json!({ "reference": tx.reference, "purpose": tx.purpose, "status": tx.status }))
}

pub fn payment_failed(tx: &PaymentTransaction) -> NewNotification {
    NewNotification::new(
        &tx.user_id,
        NotificationType::Payment,
        "Payment Failed",
        "Your payment could not be processed. Please try again.",
    )
    .with_data(json!({ "reference": tx.reference, "purpose": tx.purpose, "status": tx.status }))
}

/// The charge went through but could not be applied automatically, e.g. the amount did not match or the hold had
/// already lapsed.
pub fn payment_under_review(tx: &PaymentTransaction, reason: &str) -> NewNotification {
    NewNotification::new(
        &tx.user_id,
        NotificationType::PaymentReview,
        "Payment Under Review",
        format!(
            "We received your payment of GHS {} but could not apply it automatically. Our team will review it and \
             arrange a refund if needed.",
            tx.amount.cedis_string()
        ),
    )
    .with_data(json!({ "reference": tx.reference, "purpose": tx.purpose, "reason": reason }))
}

pub fn reservation_expired_for_buyer(deposit_id: i64, listing_id: &str, buyer_id: &str, title: &str) -> NewNotification {
    NewNotification::new(
        buyer_id,
        NotificationType::DepositExpired,
        "Reservation Expired",
        format!("Your reservation for \"{title}\" has expired and the item has been released."),
    )
    .with_data(json!({ "deposit_id": deposit_id, "listing_id": listing_id }))
}

pub fn reservation_expired_for_seller(
    deposit_id: i64,
    listing_id: &str,
    seller_id: &str,
    title: &str,
    quantity: i64,
) -> NewNotification {
    NewNotification::new(
        seller_id,
        NotificationType::DepositExpired,
        "Reservation Expired",
        format!("A reservation for \"{title}\" expired. {quantity} unit(s) are available again."),
    )
    .with_data(json!({ "deposit_id": deposit_id, "listing_id": listing_id }))
}

pub fn trial_expired(subscription: &Subscription) -> NewNotification {
    NewNotification::new(
        &subscription.user_id,
        NotificationType::TrialExpired,
        "Trial Ended",
        format!("Your free trial of the {} plan has ended. Subscribe to keep your benefits.", subscription.plan),
    )
    .with_data(json!({ "subscription_id": subscription.id, "plan": subscription.plan }))
}

/// Title and body for a countdown reminder.
pub fn reminder_copy(tier: ReminderTier, title: &str, seller_name: Option<&str>, hours_left: f64) -> (String, String) {
    match tier {
        ReminderTier::Day1 => (
            "🔔 Deposit Active".to_string(),
            format!(
                "Remember to meet with {} for \"{title}\". You have 2 days left to confirm.",
                seller_name.unwrap_or("the seller")
            ),
        ),
        ReminderTier::Day2 => (
            "⏰ Deposit Expires in 1 Day".to_string(),
            format!("Don't forget to confirm your transaction for \"{title}\" after meeting the seller. Expires tomorrow!"),
        ),
        ReminderTier::Day3 => (
            "🚨 Last Chance to Confirm Deposit".to_string(),
            format!(
                "Your deposit for \"{title}\" expires in {} hours. Confirm after meetup or it will be auto-refunded.",
                hours_left.floor()
            ),
        ),
    }
}

pub fn deposit_reminder(
    buyer_id: &str,
    deposit_id: i64,
    listing_id: &str,
    tier: ReminderTier,
    expires_at: DateTime<Utc>,
    title: String,
    body: String,
) -> NewNotification {
    NewNotification::new(buyer_id, NotificationType::DepositReminder, title, body).with_data(json!({
        "deposit_id": deposit_id,
        "listing_id": listing_id,
        "reminder_type": tier.to_string(),
        "expires_at": expires_at,
    }))
}
