//! Push delivery through the Expo push service.
use std::{sync::Arc, time::Duration};

use deposit_engine::traits::{NoopPushNotifier, PushError, PushMessage, PushNotifier};
use dg_common::Secret;
use log::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";
/// Expo accepts at most this many messages per request
pub const EXPO_BATCH_SIZE: usize = 100;
const EXPO_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpoMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
    pub sound: &'static str,
    pub priority: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

impl From<PushMessage> for ExpoMessage {
    fn from(m: PushMessage) -> Self {
        Self {
            to: m.to,
            title: m.title,
            body: m.body,
            data: m.data,
            sound: "default",
            priority: "high",
            channel_id: m.channel_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ExpoTicket {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExpoResponse {
    #[serde(default)]
    data: Vec<ExpoTicket>,
}

#[derive(Clone)]
pub struct ExpoPushNotifier {
    url: String,
    access_token: Secret<String>,
    client: Arc<Client>,
}

impl ExpoPushNotifier {
    pub fn new(access_token: Secret<String>) -> Result<Self, PushError> {
        Self::new_with_url(EXPO_PUSH_URL, access_token)
    }

    pub fn new_with_url(url: &str, access_token: Secret<String>) -> Result<Self, PushError> {
        let client = Client::builder().timeout(EXPO_TIMEOUT).build().map_err(|e| PushError::Unavailable(e.to_string()))?;
        Ok(Self { url: url.to_string(), access_token, client: Arc::new(client) })
    }

    async fn send_batch(&self, batch: Vec<ExpoMessage>) -> Result<usize, PushError> {
        let mut req = self.client.post(&self.url).header("Accept", "application/json").json(&batch);
        if !self.access_token.is_empty() {
            req = req.bearer_auth(self.access_token.reveal());
        }
        let response = req.send().await.map_err(|e| PushError::Unavailable(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PushError::Rejected(format!("{status}: {text}")));
        }
        let result = response.json::<ExpoResponse>().await.map_err(|e| PushError::Rejected(e.to_string()))?;
        let mut accepted = 0;
        for ticket in result.data {
            if ticket.status == "ok" {
                accepted += 1;
            } else {
                debug!("📣️ Expo refused a message: {}", ticket.message.unwrap_or_default());
            }
        }
        Ok(accepted)
    }
}

impl PushNotifier for ExpoPushNotifier {
    async fn send(&self, messages: Vec<PushMessage>) -> Result<usize, PushError> {
        let mut messages = messages.into_iter().map(ExpoMessage::from).collect::<Vec<_>>();
        let mut accepted = 0;
        while !messages.is_empty() {
            let rest = messages.split_off(messages.len().min(EXPO_BATCH_SIZE));
            let batch = std::mem::replace(&mut messages, rest);
            trace!("📣️ Sending {} push messages", batch.len());
            accepted += self.send_batch(batch).await?;
        }
        Ok(accepted)
    }
}

/// The push notifier the server runs with. Delivery is disabled when no Expo access token is configured.
#[derive(Clone)]
pub enum ServerPushNotifier {
    Expo(ExpoPushNotifier),
    Disabled(NoopPushNotifier),
}

impl ServerPushNotifier {
    pub fn from_access_token(access_token: &Secret<String>) -> Self {
        if access_token.is_empty() {
            return Self::Disabled(NoopPushNotifier);
        }
        match ExpoPushNotifier::new(access_token.clone()) {
            Ok(expo) => Self::Expo(expo),
            Err(e) => {
                error!("📣️ Could not create the Expo client. Push notifications are disabled. {e}");
                Self::Disabled(NoopPushNotifier)
            },
        }
    }
}

impl PushNotifier for ServerPushNotifier {
    async fn send(&self, messages: Vec<PushMessage>) -> Result<usize, PushError> {
        match self {
            Self::Expo(expo) => expo.send(messages).await,
            Self::Disabled(noop) => noop.send(messages).await,
        }
    }
}
