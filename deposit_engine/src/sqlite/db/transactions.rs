use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewPaymentTransaction, PaymentTransaction, TransactionStatus};

pub async fn insert_transaction(
    tx: &NewPaymentTransaction,
    conn: &mut SqliteConnection,
) -> Result<PaymentTransaction, sqlx::Error> {
    let transaction: PaymentTransaction = sqlx::query_as(
        r#"
            INSERT INTO paystack_transactions (
                reference,
                user_id,
                amount,
                currency,
                purpose,
                purpose_id,
                status
            ) VALUES ($1, $2, $3, $4, $5, $6, 'pending')
            RETURNING *;
        "#,
    )
    .bind(&tx.reference)
    .bind(&tx.user_id)
    .bind(tx.amount)
    .bind(&tx.currency)
    .bind(tx.purpose)
    .bind(tx.purpose_id)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Transaction [{}] for {} recorded as pending", transaction.reference, transaction.purpose);
    Ok(transaction)
}

pub async fn fetch_by_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    let tx = sqlx::query_as("SELECT * FROM paystack_transactions WHERE reference = $1")
        .bind(reference)
        .fetch_optional(conn)
        .await?;
    Ok(tx)
}

/// Moves a `pending` transaction to its final status. Returns `None` if it was not pending any more, which means some
/// other delivery got there first.
pub async fn settle(
    reference: &str,
    status: TransactionStatus,
    gateway_response: Option<String>,
    review_reason: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    let tx = sqlx::query_as(
        r#"
        UPDATE paystack_transactions SET
            status = $1,
            gateway_response = $2,
            review_reason = $3,
            paid_at = $4,
            webhook_received = TRUE,
            updated_at = CURRENT_TIMESTAMP
        WHERE reference = $5 AND status = 'pending'
        RETURNING *;
        "#,
    )
    .bind(status)
    .bind(gateway_response)
    .bind(review_reason)
    .bind(paid_at)
    .bind(reference)
    .fetch_optional(conn)
    .await?;
    Ok(tx)
}

pub async fn mark_webhook_processed(reference: &str, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE paystack_transactions SET
            webhook_received = TRUE,
            webhook_processed = TRUE,
            updated_at = CURRENT_TIMESTAMP
        WHERE reference = $1
        "#,
    )
    .bind(reference)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Records that a gateway callback arrived for the reference. Returns `false` if there is no such transaction.
///
/// Being a write, this also makes the enclosing transaction take the write lock before it reads anything.
pub async fn mark_received(reference: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE paystack_transactions SET webhook_received = TRUE, updated_at = CURRENT_TIMESTAMP WHERE reference = $1",
    )
    .bind(reference)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
