//! Seed data for the tables that other parts of the marketplace own (profiles, listings, purchases, devices).
use chrono::{DateTime, Utc};

use crate::{
    db_types::{Deposit, Listing, PaymentPurpose, PaymentTransaction, Pesewas, SubscriptionStatus},
    SqliteDatabase,
};

pub async fn seed_profile(db: &SqliteDatabase, id: &str, full_name: &str) {
    sqlx::query("INSERT INTO profiles (id, email, full_name) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(format!("{id}@example.com"))
        .bind(full_name)
        .execute(db.pool())
        .await
        .expect("Error seeding profile");
}

pub async fn seed_listing(db: &SqliteDatabase, id: &str, seller_id: &str, title: &str, quantity: i64) {
    sqlx::query("INSERT INTO listings (id, seller_id, title, price, available_quantity) VALUES ($1, $2, $3, $4, $5)")
        .bind(id)
        .bind(seller_id)
        .bind(title)
        .bind(Pesewas::from_cedis(150))
        .bind(quantity)
        .execute(db.pool())
        .await
        .expect("Error seeding listing");
}

pub async fn fetch_listing(db: &SqliteDatabase, id: &str) -> Listing {
    sqlx::query_as("SELECT * FROM listings WHERE id = $1")
        .bind(id)
        .fetch_one(db.pool())
        .await
        .expect("Error fetching listing")
}

pub async fn fetch_deposit(db: &SqliteDatabase, reference: &str) -> Deposit {
    sqlx::query_as("SELECT * FROM listing_deposits WHERE payment_reference = $1")
        .bind(reference)
        .fetch_one(db.pool())
        .await
        .expect("Error fetching deposit")
}

/// Moves the deposit's deadline, e.g. to simulate the passage of time.
pub async fn set_deposit_expiry(db: &SqliteDatabase, reference: &str, expires_at: DateTime<Utc>) {
    sqlx::query("UPDATE listing_deposits SET expires_at = $1 WHERE payment_reference = $2")
        .bind(expires_at)
        .bind(reference)
        .execute(db.pool())
        .await
        .expect("Error updating deposit expiry");
}

/// A pending credit purchase and its pending gateway transaction. Returns the purchase id.
pub async fn seed_credit_purchase(
    db: &SqliteDatabase,
    user_id: &str,
    credits: i64,
    amount: Pesewas,
    reference: &str,
) -> i64 {
    let (id,): (i64,) =
        sqlx::query_as("INSERT INTO credit_purchases (user_id, credits, amount) VALUES ($1, $2, $3) RETURNING id")
            .bind(user_id)
            .bind(credits)
            .bind(amount)
            .fetch_one(db.pool())
            .await
            .expect("Error seeding credit purchase");
    seed_transaction(db, user_id, amount, PaymentPurpose::CreditPurchase, id, reference).await;
    id
}

pub async fn seed_subscription(
    db: &SqliteDatabase,
    user_id: &str,
    plan: &str,
    status: SubscriptionStatus,
    trial_ends_at: Option<DateTime<Utc>>,
) -> i64 {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO user_subscriptions (user_id, plan, status, trial_ends_at) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(user_id)
    .bind(plan)
    .bind(status)
    .bind(trial_ends_at)
    .fetch_one(db.pool())
    .await
    .expect("Error seeding subscription");
    id
}

pub async fn fetch_subscription_status(db: &SqliteDatabase, id: i64) -> SubscriptionStatus {
    let (status,): (SubscriptionStatus,) = sqlx::query_as("SELECT status FROM user_subscriptions WHERE id = $1")
        .bind(id)
        .fetch_one(db.pool())
        .await
        .expect("Error fetching subscription");
    status
}

pub async fn seed_transaction(
    db: &SqliteDatabase,
    user_id: &str,
    amount: Pesewas,
    purpose: PaymentPurpose,
    purpose_id: i64,
    reference: &str,
) -> PaymentTransaction {
    sqlx::query_as(
        r#"INSERT INTO paystack_transactions (reference, user_id, amount, purpose, purpose_id)
        VALUES ($1, $2, $3, $4, $5) RETURNING *"#,
    )
    .bind(reference)
    .bind(user_id)
    .bind(amount)
    .bind(purpose)
    .bind(purpose_id)
    .fetch_one(db.pool())
    .await
    .expect("Error seeding transaction")
}

pub async fn seed_push_token(db: &SqliteDatabase, user_id: &str, token: &str, active: bool) {
    sqlx::query("INSERT INTO user_push_tokens (user_id, token, platform, is_active) VALUES ($1, $2, 'ios', $3)")
        .bind(user_id)
        .bind(token)
        .bind(active)
        .execute(db.pool())
        .await
        .expect("Error seeding push token");
}

pub async fn fetch_credit_balance(db: &SqliteDatabase, user_id: &str) -> i64 {
    let balance: Option<(i64,)> = sqlx::query_as("SELECT balance FROM user_credits WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(db.pool())
        .await
        .expect("Error fetching credit balance");
    balance.map(|(b,)| b).unwrap_or_default()
}

/// Makes every change to a deposit's status fail, as a stand-in for a store that refuses writes.
pub async fn lock_deposit_status(db: &SqliteDatabase) {
    sqlx::query(
        r#"
        CREATE TRIGGER lock_deposit_status BEFORE UPDATE OF status ON listing_deposits
        BEGIN
            SELECT RAISE(ABORT, 'deposits are locked');
        END;
        "#,
    )
    .execute(db.pool())
    .await
    .expect("Error locking deposits");
}

/// Every audit log entry for the reference, as `(processed, processing_error)`, oldest first.
pub async fn fetch_webhook_audit(db: &SqliteDatabase, reference: Option<&str>) -> Vec<(bool, Option<String>)> {
    sqlx::query_as("SELECT processed, processing_error FROM webhook_events WHERE reference IS $1 ORDER BY id")
        .bind(reference)
        .fetch_all(db.pool())
        .await
        .expect("Error fetching webhook audit log")
}
