#![allow(dead_code)]
use chrono::Utc;
use deposit_engine::{
    db_types::{DepositRequest, Pesewas},
    events::EventProducers,
    test_utils::{
        fixtures::{seed_listing, seed_profile},
        prepare_env::{drop_database, prepare_test_env, random_db_path},
    },
    traits::{
        ChargeStatus,
        CheckoutRequest,
        CheckoutSession,
        PaymentProvider,
        PaymentProviderError,
        PushError,
        PushMessage,
        PushNotifier,
        VerifiedCharge,
    },
    DepositCheckout,
    DepositDatabase,
    DepositFlowApi,
    DepositTerms,
    ReconciliationApi,
    SqliteDatabase,
};
use std::sync::{Arc, Mutex};

pub const BUYER: &str = "alice";
pub const OTHER_BUYER: &str = "bob";
pub const SELLER: &str = "sam";
pub const LISTING: &str = "bike-001";
pub const LISTING_TITLE: &str = "Mountain Bike";

/// A fresh migrated database with two buyers, a seller and one listing of three bikes.
pub async fn setup() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    seed_profile(&db, BUYER, "Alice Owusu").await;
    seed_profile(&db, OTHER_BUYER, "Bob Asante").await;
    seed_profile(&db, SELLER, "Sam Mensah").await;
    seed_listing(&db, LISTING, SELLER, LISTING_TITLE, 3).await;
    db
}

pub async fn tear_down(db: SqliteDatabase) {
    let url = db.url().to_string();
    db.close().await;
    drop_database(&url).await;
}

/// A payment gateway that answers from a script rather than the network.
#[derive(Clone, Default)]
pub struct FakeGateway {
    pub refuse_checkout: Option<PaymentProviderError>,
    pub verdict: Option<ChargeStatus>,
    pub verified_amount: Option<Pesewas>,
    pub checkouts: Arc<Mutex<Vec<CheckoutRequest>>>,
}

impl FakeGateway {
    pub fn refusing(msg: &str) -> Self {
        Self { refuse_checkout: Some(PaymentProviderError::Rejected(msg.to_string())), ..Default::default() }
    }

    pub fn with_verdict(status: ChargeStatus, amount: Pesewas) -> Self {
        Self { verdict: Some(status), verified_amount: Some(amount), ..Default::default() }
    }

    pub fn checkout_count(&self) -> usize {
        self.checkouts.lock().map(|c| c.len()).unwrap_or_default()
    }
}

impl PaymentProvider for FakeGateway {
    async fn start_checkout(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentProviderError> {
        if let Some(e) = &self.refuse_checkout {
            return Err(e.clone());
        }
        let reference = request.reference.clone();
        self.checkouts.lock().unwrap().push(request);
        Ok(CheckoutSession {
            authorization_url: format!("https://checkout.example.com/{reference}"),
            access_code: format!("ac_{reference}"),
            reference,
        })
    }

    async fn verify_charge(&self, reference: &str) -> Result<VerifiedCharge, PaymentProviderError> {
        Ok(VerifiedCharge {
            reference: reference.to_string(),
            status: self.verdict,
            amount: self.verified_amount.unwrap_or_default(),
            paid_at: self.verdict.map(|_| Utc::now()),
            gateway_response: serde_json::json!({ "status": "verified" }),
        })
    }
}

/// Remembers every push it was asked to deliver.
#[derive(Clone, Default)]
pub struct RecordingPush {
    pub sent: Arc<Mutex<Vec<PushMessage>>>,
}

impl RecordingPush {
    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl PushNotifier for RecordingPush {
    async fn send(&self, messages: Vec<PushMessage>) -> Result<usize, PushError> {
        let n = messages.len();
        self.sent.lock().unwrap().extend(messages);
        Ok(n)
    }
}

pub fn deposit_api(db: &SqliteDatabase, gateway: FakeGateway) -> DepositFlowApi<SqliteDatabase, FakeGateway> {
    DepositFlowApi::new(db.clone(), gateway, DepositTerms::default())
}

pub fn reconciliation_api(db: &SqliteDatabase) -> ReconciliationApi<SqliteDatabase> {
    ReconciliationApi::new(db.clone(), DepositTerms::default(), EventProducers::default())
}

/// Places a one-unit deposit for [`BUYER`] on [`LISTING`].
pub async fn place_deposit(db: &SqliteDatabase) -> DepositCheckout {
    deposit_api(db, FakeGateway::default())
        .initialize_deposit(BUYER, DepositRequest::new(LISTING, BUYER, 1))
        .await
        .expect("Error placing deposit")
}
