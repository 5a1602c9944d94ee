use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{Deposit, DepositRequest, Pesewas},
    traits::ReminderCandidate,
};

/// Inserts a new `pending` deposit. This is not atomic on its own; call it inside the transaction that reserved the
/// inventory.
pub async fn insert_deposit(
    request: &DepositRequest,
    seller_id: &str,
    amount: Pesewas,
    reference: &str,
    expires_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Deposit, sqlx::Error> {
    let deposit: Deposit = sqlx::query_as(
        r#"
            INSERT INTO listing_deposits (
                listing_id,
                buyer_id,
                seller_id,
                reserved_quantity,
                amount,
                status,
                payment_reference,
                conversation_id,
                offer_id,
                expires_at
            ) VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(&request.listing_id)
    .bind(&request.buyer_id)
    .bind(seller_id)
    .bind(request.reserved_quantity)
    .bind(amount)
    .bind(reference)
    .bind(&request.conversation_id)
    .bind(&request.offer_id)
    .bind(expires_at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Deposit #{} [{reference}] created for listing {}", deposit.id, deposit.listing_id);
    Ok(deposit)
}

pub async fn fetch_by_reference(reference: &str, conn: &mut SqliteConnection) -> Result<Option<Deposit>, sqlx::Error> {
    let deposit = sqlx::query_as("SELECT * FROM listing_deposits WHERE payment_reference = $1")
        .bind(reference)
        .fetch_optional(conn)
        .await?;
    Ok(deposit)
}

/// The buyer's live (`pending` or `paid`) deposit on the listing, if there is one.
pub async fn fetch_active_for_buyer(
    listing_id: &str,
    buyer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Deposit>, sqlx::Error> {
    let deposit = sqlx::query_as(
        "SELECT * FROM listing_deposits WHERE listing_id = $1 AND buyer_id = $2 AND status IN ('pending', 'paid')",
    )
    .bind(listing_id)
    .bind(buyer_id)
    .fetch_optional(conn)
    .await?;
    Ok(deposit)
}

/// `pending` -> `paid`, restarting the countdown at `expires_at`. Returns `None` if the deposit was not pending.
pub async fn mark_paid(
    reference: &str,
    expires_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Deposit>, sqlx::Error> {
    let deposit = sqlx::query_as(
        r#"
        UPDATE listing_deposits SET
            status = 'paid',
            expires_at = $1,
            updated_at = CURRENT_TIMESTAMP
        WHERE payment_reference = $2 AND status = 'pending'
        RETURNING *;
        "#,
    )
    .bind(expires_at)
    .bind(reference)
    .fetch_optional(conn)
    .await?;
    Ok(deposit)
}

/// `pending` -> `cancelled`. Returns `None` if the deposit was not pending. The caller is responsible for releasing the
/// inventory.
pub async fn cancel_pending(reference: &str, conn: &mut SqliteConnection) -> Result<Option<Deposit>, sqlx::Error> {
    let deposit = sqlx::query_as(
        r#"
        UPDATE listing_deposits SET
            status = 'cancelled',
            updated_at = CURRENT_TIMESTAMP
        WHERE payment_reference = $1 AND status = 'pending'
        RETURNING *;
        "#,
    )
    .bind(reference)
    .fetch_optional(conn)
    .await?;
    Ok(deposit)
}

/// Flags a deposit that was charged after its hold had been released, so that it can be refunded.
pub async fn flag_for_refund(reference: &str, conn: &mut SqliteConnection) -> Result<Option<Deposit>, sqlx::Error> {
    let deposit = sqlx::query_as(
        r#"
        UPDATE listing_deposits SET
            needs_refund = TRUE,
            updated_at = CURRENT_TIMESTAMP
        WHERE payment_reference = $1
        RETURNING *;
        "#,
    )
    .bind(reference)
    .fetch_optional(conn)
    .await?;
    Ok(deposit)
}

/// Moves every live deposit whose hold ended at or before `now` to `expired`, in one statement. The status predicate
/// excludes anything a previous run already expired.
pub async fn expire_overdue(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Deposit>, sqlx::Error> {
    let deposits: Vec<Deposit> = sqlx::query_as(
        r#"
        UPDATE listing_deposits SET
            status = 'expired',
            updated_at = CURRENT_TIMESTAMP
        WHERE status IN ('pending', 'paid') AND expires_at IS NOT NULL AND expires_at <= $1
        RETURNING *;
        "#,
    )
    .bind(now)
    .fetch_all(conn)
    .await?;
    trace!("🗃️ {} deposits moved to expired", deposits.len());
    Ok(deposits)
}

#[derive(Debug, Clone, FromRow)]
pub struct ExpiredDeposit {
    pub id: i64,
    pub listing_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub reserved_quantity: i64,
    pub listing_title: String,
}

/// Expired deposits whose parties have not been told yet.
pub async fn fetch_unnotified_expired(conn: &mut SqliteConnection) -> Result<Vec<ExpiredDeposit>, sqlx::Error> {
    let deposits = sqlx::query_as(
        r#"
        SELECT d.id, d.listing_id, d.buyer_id, d.seller_id, d.reserved_quantity, l.title AS listing_title
        FROM listing_deposits d JOIN listings l ON l.id = d.listing_id
        WHERE d.status = 'expired' AND d.expiry_notified = FALSE
        ORDER BY d.id
        "#,
    )
    .fetch_all(conn)
    .await?;
    Ok(deposits)
}

/// Returns `false` if another caller marked the deposit first.
pub async fn mark_expiry_notified(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE listing_deposits SET expiry_notified = TRUE WHERE id = $1 AND expiry_notified = FALSE")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn fetch_reminder_candidates(conn: &mut SqliteConnection) -> Result<Vec<ReminderCandidate>, sqlx::Error> {
    let candidates = sqlx::query_as(
        r#"
        SELECT
            d.id AS deposit_id,
            d.listing_id,
            d.buyer_id,
            d.expires_at,
            d.last_reminder_sent,
            l.title AS listing_title,
            p.full_name AS seller_name
        FROM listing_deposits d
            JOIN listings l ON l.id = d.listing_id
            LEFT JOIN profiles p ON p.id = d.seller_id
        WHERE d.status = 'paid' AND d.expires_at IS NOT NULL
        ORDER BY d.expires_at
        "#,
    )
    .fetch_all(conn)
    .await?;
    Ok(candidates)
}

/// Records that the reminder with rank `tier_rank` went out, unless that tier (or a later one) was already recorded.
/// Returns `true` if this call claimed the tier.
pub async fn claim_reminder_tier(id: i64, tier_rank: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE listing_deposits SET
            last_reminder_sent = $1,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND status = 'paid' AND COALESCE(last_reminder_sent, 0) < $1
        "#,
    )
    .bind(tier_rank)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
