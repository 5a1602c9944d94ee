use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{NewNotification, Notification, PushToken};

pub async fn insert_notification(
    notification: NewNotification,
    conn: &mut SqliteConnection,
) -> Result<Notification, sqlx::Error> {
    let data = notification.data.as_ref().map(|d| d.to_string());
    let result: Notification = sqlx::query_as(
        r#"
            INSERT INTO notifications (user_id, type, title, message, data)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(notification.user_id)
    .bind(notification.notification_type)
    .bind(notification.title)
    .bind(notification.message)
    .bind(data)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Notification #{} stored for {}", result.id, result.user_id);
    Ok(result)
}

pub async fn fetch_notifications_for_user(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Notification>, sqlx::Error> {
    let notifications = sqlx::query_as("SELECT * FROM notifications WHERE user_id = $1 ORDER BY id")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(notifications)
}

pub async fn fetch_active_push_tokens(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<PushToken>, sqlx::Error> {
    let tokens = sqlx::query_as("SELECT * FROM user_push_tokens WHERE user_id = $1 AND is_active = TRUE ORDER BY id")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(tokens)
}
