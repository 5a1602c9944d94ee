//! Credit purchases and subscriptions: the other two things a gateway transaction can pay for.
use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{CreditPurchase, Subscription};

/// `pending` -> `completed`, then credits the buyer's balance. Both steps happen on the caller's connection, so
/// wrapping them in a transaction makes the grant atomic. Returns `false` if the purchase was not pending.
pub async fn complete_credit_purchase(
    purchase_id: i64,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let purchase: Option<CreditPurchase> = sqlx::query_as(
        r#"
        UPDATE credit_purchases SET
            status = 'completed',
            payment_reference = $1,
            completed_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND status = 'pending'
        RETURNING *;
        "#,
    )
    .bind(reference)
    .bind(purchase_id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(purchase) = purchase else {
        debug!("🗃️ Credit purchase #{purchase_id} is not pending. Nothing to grant");
        return Ok(false);
    };
    sqlx::query(
        r#"
        INSERT INTO user_credits (user_id, balance, lifetime_earned) VALUES ($1, $2, $2)
        ON CONFLICT (user_id) DO UPDATE SET
            balance = balance + excluded.balance,
            lifetime_earned = lifetime_earned + excluded.lifetime_earned,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&purchase.user_id)
    .bind(purchase.credits)
    .execute(conn)
    .await?;
    debug!("🗃️ {} credits granted to {} for purchase #{purchase_id}", purchase.credits, purchase.user_id);
    Ok(true)
}

/// Returns `false` if the purchase was not pending.
pub async fn fail_credit_purchase(purchase_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE credit_purchases SET status = 'failed' WHERE id = $1 AND status = 'pending'")
        .bind(purchase_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn activate_subscription(
    subscription_id: i64,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE user_subscriptions SET
            status = 'active',
            payment_reference = $1,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND status IN ('pending', 'trial')
        "#,
    )
    .bind(reference)
    .bind(subscription_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn cancel_subscription(subscription_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE user_subscriptions SET
            status = 'cancelled',
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $1 AND status = 'pending'
        "#,
    )
    .bind(subscription_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Moves every trial that ended at or before `now` to `expired`.
pub async fn expire_trials(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Subscription>, sqlx::Error> {
    let expired = sqlx::query_as(
        r#"
        UPDATE user_subscriptions SET
            status = 'expired',
            updated_at = CURRENT_TIMESTAMP
        WHERE status = 'trial' AND trial_ends_at IS NOT NULL AND trial_ends_at <= $1
        RETURNING *;
        "#,
    )
    .bind(now)
    .fetch_all(conn)
    .await?;
    Ok(expired)
}
