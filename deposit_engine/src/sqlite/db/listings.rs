use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::Listing;

pub async fn fetch_listing(listing_id: &str, conn: &mut SqliteConnection) -> Result<Option<Listing>, sqlx::Error> {
    let listing =
        sqlx::query_as("SELECT * FROM listings WHERE id = $1").bind(listing_id).fetch_optional(conn).await?;
    Ok(listing)
}

/// Takes `quantity` units out of the listing's availability, but only if that many are left and the buyer is not the
/// seller. Returns `false` if nothing was reserved; the caller can inspect the listing to find out why.
///
/// Because this statement writes before anything else in the transaction reads, it takes the write lock first.
/// Competing reservations therefore queue behind each other instead of both reading the old quantity.
pub async fn try_reserve(
    listing_id: &str,
    buyer_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE listings SET
            available_quantity = available_quantity - $1,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND seller_id <> $3 AND available_quantity >= $1
        "#,
    )
    .bind(quantity)
    .bind(listing_id)
    .bind(buyer_id)
    .execute(conn)
    .await?;
    trace!("🗃️ Reserve {quantity} of listing {listing_id}: {} rows affected", result.rows_affected());
    Ok(result.rows_affected() == 1)
}

/// Puts `quantity` units back into the listing's availability.
pub async fn release(listing_id: &str, quantity: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE listings SET
            available_quantity = available_quantity + $1,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2
        "#,
    )
    .bind(quantity)
    .bind(listing_id)
    .execute(conn)
    .await?;
    trace!("🗃️ Released {quantity} units of listing {listing_id}");
    Ok(())
}

/// The buyer's email address, as stored on their profile.
pub async fn fetch_profile_email(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<String>, sqlx::Error> {
    let email: Option<(String,)> =
        sqlx::query_as("SELECT email FROM profiles WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(email.map(|(e,)| e))
}
