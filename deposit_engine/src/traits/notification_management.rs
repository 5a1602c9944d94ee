use crate::{
    db_types::{NewNotification, Notification, PushToken},
    traits::DepositGatewayError,
};

/// Storage for in-app notifications and the registry of device push tokens.
#[allow(async_fn_in_trait)]
pub trait NotificationManagement {
    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, DepositGatewayError>;

    async fn fetch_notifications_for_user(&self, user_id: &str) -> Result<Vec<Notification>, DepositGatewayError>;

    /// Active push tokens for the user. Deactivated tokens are never returned.
    async fn fetch_active_push_tokens(&self, user_id: &str) -> Result<Vec<PushToken>, DepositGatewayError>;
}
