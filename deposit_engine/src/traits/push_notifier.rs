use log::trace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PushError {
    #[error("Push service unavailable. {0}")]
    Unavailable(String),
    #[error("Push service rejected the message. {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    /// The device push token
    pub to: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
    pub channel_id: Option<String>,
}

/// Delivers push notifications to devices.
#[allow(async_fn_in_trait)]
pub trait PushNotifier {
    /// Sends the batch, returning the number of messages the service accepted.
    async fn send(&self, messages: Vec<PushMessage>) -> Result<usize, PushError>;
}

/// A [`PushNotifier`] that drops everything. Used when no push service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPushNotifier;

impl PushNotifier for NoopPushNotifier {
    async fn send(&self, messages: Vec<PushMessage>) -> Result<usize, PushError> {
        trace!("📣️ Push is disabled. Dropping {} messages", messages.len());
        Ok(0)
    }
}
