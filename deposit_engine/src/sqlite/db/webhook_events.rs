use sqlx::SqliteConnection;

use crate::db_types::{NewWebhookEvent, WebhookEvent};

pub async fn insert_event(event: NewWebhookEvent, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO webhook_events (event_type, reference, payload) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(event.event_type)
    .bind(event.reference)
    .bind(event.payload)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn finish_event(id: i64, error: Option<String>, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE webhook_events SET
            processed = TRUE,
            processing_error = $1,
            processed_at = CURRENT_TIMESTAMP
        WHERE id = $2
        "#,
    )
    .bind(error)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_events_for_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<WebhookEvent>, sqlx::Error> {
    let events = sqlx::query_as("SELECT * FROM webhook_events WHERE reference = $1 ORDER BY id")
        .bind(reference)
        .fetch_all(conn)
        .await?;
    Ok(events)
}
