use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const CHARGE_SUCCESS: &str = "charge.success";
pub const CHARGE_FAILED: &str = "charge.failed";

/// Every Paystack REST response is wrapped in this envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaystackResponse<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Body of `POST /transaction/initialize`. `amount` is in the currency's minor unit.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InitializeTransaction {
    pub email: String,
    pub amount: i64,
    pub reference: String,
    pub currency: String,
    pub channels: Vec<String>,
    pub metadata: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InitializeData {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct PaystackCustomer {
    #[serde(default)]
    pub email: Option<String>,
}

/// `data` of `GET /transaction/verify/{reference}`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VerifyData {
    pub id: Option<i64>,
    /// `success`, `failed`, `abandoned`, `ongoing`, `pending`, ...
    pub status: String,
    pub reference: String,
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub gateway_response: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

/// A webhook delivery. Only charge events are modelled; anything else still parses, with whatever `data` it carries.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PaystackWebhook {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl PaystackWebhook {
    pub fn is_charge_event(&self) -> bool {
        self.event == CHARGE_SUCCESS || self.event == CHARGE_FAILED
    }

    /// The charge details, for `charge.*` events. Fails if the charge has no usable reference or amount.
    pub fn charge(&self) -> Result<Option<ChargeData>, serde_json::Error> {
        if !self.is_charge_event() {
            return Ok(None);
        }
        serde_json::from_value(self.data.clone()).map(Some)
    }

    pub fn reference(&self) -> Option<String> {
        self.data.get("reference").and_then(Value::as_str).map(str::to_string)
    }
}

/// The `data` of a charge event. Only `reference` and `amount` are required; the informational fields are dropped if
/// Paystack sends them in a shape we don't expect.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChargeData {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<i64>,
    pub reference: String,
    pub amount: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub gateway_response: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub customer: Option<PaystackCustomer>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
