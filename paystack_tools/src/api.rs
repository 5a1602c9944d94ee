use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::PaystackConfig,
    data_objects::{InitializeData, InitializeTransaction, PaystackResponse, VerifyData},
    PaystackApiError,
};

#[derive(Clone)]
pub struct PaystackApi {
    config: PaystackConfig,
    client: Arc<Client>,
}

impl PaystackApi {
    pub fn new(config: PaystackConfig) -> Result<Self, PaystackApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let val = HeaderValue::from_str(&bearer).map_err(|e| PaystackApiError::Initialization(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaystackApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &PaystackConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Sends a request and unwraps Paystack's `{status, message, data}` envelope.
    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, PaystackApiError> {
        let url = self.url(path);
        trace!("💳️ Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| PaystackApiError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| PaystackApiError::Transport(e.to_string()))?;
        if !status.is_success() {
            // Paystack explains most failures in the envelope's message
            let message = serde_json::from_str::<PaystackResponse<serde_json::Value>>(&text)
                .map(|r| r.message)
                .unwrap_or(text);
            debug!("💳️ Paystack answered {status}: {message}");
            return Err(PaystackApiError::QueryError { status: status.as_u16(), message });
        }
        trace!("💳️ REST query successful. {status}");
        let envelope = serde_json::from_str::<PaystackResponse<T>>(&text)
            .map_err(|e| PaystackApiError::JsonError(e.to_string()))?;
        if !envelope.status {
            return Err(PaystackApiError::Declined(envelope.message));
        }
        envelope.data.ok_or(PaystackApiError::EmptyResponse)
    }

    /// Opens a transaction and returns the hosted checkout page for it.
    pub async fn initialize_transaction(&self, tx: InitializeTransaction) -> Result<InitializeData, PaystackApiError> {
        debug!("💳️ Initializing transaction {} for {} minor units", tx.reference, tx.amount);
        let data = self.rest_query::<InitializeData, _>(Method::POST, "/transaction/initialize", Some(tx)).await?;
        info!("💳️ Transaction {} initialized", data.reference);
        Ok(data)
    }

    pub async fn verify_transaction(&self, reference: &str) -> Result<VerifyData, PaystackApiError> {
        let path = format!("/transaction/verify/{reference}");
        debug!("💳️ Verifying transaction {reference}");
        let data = self.rest_query::<VerifyData, ()>(Method::GET, &path, None).await?;
        info!("💳️ Transaction {reference} is {}", data.status);
        Ok(data)
    }
}
