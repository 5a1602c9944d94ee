use deposit_engine::{
    db_types::Pesewas,
    traits::{
        ChargeOutcome,
        ChargeStatus,
        CheckoutRequest,
        CheckoutSession,
        PaymentProvider,
        PaymentProviderError,
        VerifiedCharge,
    },
    EventOutcome,
    GatewayEvent,
};
use log::*;
use paystack_tools::{
    InitializeTransaction,
    PaystackApi,
    PaystackApiError,
    PaystackWebhook,
    VerifyData,
    CHARGE_SUCCESS,
};

/// The payment channels buyers may use at checkout
pub const CHECKOUT_CHANNELS: [&str; 2] = ["card", "mobile_money"];

/// [`PaymentProvider`] backed by the Paystack REST API.
#[derive(Clone)]
pub struct PaystackProvider {
    api: PaystackApi,
    callback_base_url: String,
}

impl PaystackProvider {
    pub fn new(api: PaystackApi, callback_base_url: &str) -> Self {
        Self { api, callback_base_url: callback_base_url.trim_end_matches('/').to_string() }
    }

    pub fn callback_url(&self, request: &CheckoutRequest) -> String {
        format!("{}/payment-callback?type={}&reference={}", self.callback_base_url, request.purpose, request.reference)
    }
}

impl PaymentProvider for PaystackProvider {
    async fn start_checkout(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentProviderError> {
        let callback_url = Some(self.callback_url(&request));
        let tx = InitializeTransaction {
            email: request.email,
            amount: request.amount.value(),
            reference: request.reference,
            currency: request.currency,
            channels: CHECKOUT_CHANNELS.iter().map(|c| c.to_string()).collect(),
            metadata: request.metadata,
            callback_url,
        };
        let data = self.api.initialize_transaction(tx).await.map_err(provider_error)?;
        Ok(CheckoutSession {
            reference: data.reference,
            authorization_url: data.authorization_url,
            access_code: data.access_code,
        })
    }

    async fn verify_charge(&self, reference: &str) -> Result<VerifiedCharge, PaymentProviderError> {
        let data = self.api.verify_transaction(reference).await.map_err(provider_error)?;
        Ok(verified_charge(data))
    }
}

fn provider_error(e: PaystackApiError) -> PaymentProviderError {
    if e.is_transient() {
        warn!("💳️ Paystack is unavailable. {e}");
        return PaymentProviderError::Unavailable(e.to_string());
    }
    match e {
        PaystackApiError::JsonError(_) | PaystackApiError::EmptyResponse => {
            PaymentProviderError::InvalidResponse(e.to_string())
        },
        PaystackApiError::Initialization(_) => PaymentProviderError::Unavailable(e.to_string()),
        _ => PaymentProviderError::Rejected(e.to_string()),
    }
}

fn verified_charge(data: VerifyData) -> VerifiedCharge {
    // abandoned, ongoing, pending, etc. are not verdicts
    let status = match data.status.as_str() {
        "success" => Some(ChargeStatus::Success),
        "failed" | "reversed" => Some(ChargeStatus::Failed),
        _ => None,
    };
    let gateway_response = serde_json::to_value(&data).unwrap_or_default();
    VerifiedCharge {
        reference: data.reference,
        status,
        amount: Pesewas::from(data.amount),
        paid_at: data.paid_at,
        gateway_response,
    }
}

/// The event type recorded for deliveries that are not Paystack webhooks at all
pub const UNREADABLE_EVENT: &str = "unreadable";

/// Reduces an authenticated webhook delivery to a [`GatewayEvent`]. The raw body is kept for the audit log.
///
/// Bodies that do not parse, and charge events without a usable reference or amount, are marked
/// [`EventOutcome::Unreadable`], so that they are audited and refused rather than acknowledged.
pub fn gateway_event(body: &[u8]) -> GatewayEvent {
    let payload = String::from_utf8_lossy(body).to_string();
    let webhook = match serde_json::from_slice::<PaystackWebhook>(body) {
        Ok(w) => w,
        Err(e) => {
            warn!("🪝️ Webhook body is not a Paystack event. {e}");
            let outcome = EventOutcome::Unreadable(format!("Body is not a Paystack event. {e}"));
            return GatewayEvent { event_type: UNREADABLE_EVENT.to_string(), reference: None, outcome, payload };
        },
    };
    let reference = webhook.reference();
    let outcome = match webhook.charge() {
        Ok(Some(charge)) => {
            let status = if webhook.event == CHARGE_SUCCESS { ChargeStatus::Success } else { ChargeStatus::Failed };
            EventOutcome::Charge(ChargeOutcome {
                reference: charge.reference,
                status,
                amount: Pesewas::from(charge.amount),
                paid_at: charge.paid_at,
                gateway_response: webhook.data.clone(),
            })
        },
        Ok(None) => EventOutcome::NoCharge,
        Err(e) => {
            warn!("🪝️ {} event has an unreadable payload. {e}", webhook.event);
            EventOutcome::Unreadable(format!("Could not read the charge in a {} event. {e}", webhook.event))
        },
    };
    GatewayEvent { event_type: webhook.event, reference, outcome, payload }
}
