use actix_web::{
    body::MessageBody,
    dev::ServiceResponse,
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use deposit_engine::{
    db_types::DepositRequest,
    engine_api::DepositTerms,
    test_utils::{
        fixtures::{seed_listing, seed_profile},
        prepare_env::{drop_database, prepare_test_env, random_db_path},
    },
    DepositCheckout,
    DepositDatabase,
    DepositFlowApi,
    SqliteDatabase,
};
use dg_common::Secret;
use log::debug;
use paystack_tools::{calculate_signature, PAYSTACK_SIGNATURE_HEADER};

use super::mocks::accepting_gateway;
use crate::config::GuardConfig;

pub const BUYER: &str = "alice";
pub const OTHER_BUYER: &str = "bob";
pub const SELLER: &str = "sam";
pub const LISTING: &str = "bike-001";
pub const PAYSTACK_SECRET: &str = "sk_test_0123456789abcdef";
pub const CRON_SECRET: &str = "let-the-sweeper-in";

/// A fresh migrated database with two buyers, a seller and one listing of three bikes.
pub async fn setup_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    seed_profile(&db, BUYER, "Alice Owusu").await;
    seed_profile(&db, OTHER_BUYER, "Bob Asante").await;
    seed_profile(&db, SELLER, "Sam Mensah").await;
    seed_listing(&db, LISTING, SELLER, "Mountain Bike", 3).await;
    db
}

pub async fn tear_down(db: SqliteDatabase) {
    let url = db.url().to_string();
    db.close().await;
    drop_database(&url).await;
}

pub fn guards() -> GuardConfig {
    GuardConfig {
        paystack_secret: Secret::new(PAYSTACK_SECRET.to_string()),
        cron_secret: Secret::new(CRON_SECRET.to_string()),
        ..Default::default()
    }
}

/// Places a one-unit deposit for [`BUYER`] on [`LISTING`], straight through the engine.
pub async fn place_deposit(db: &SqliteDatabase) -> DepositCheckout {
    place_deposit_for(db, BUYER).await
}

pub async fn place_deposit_for(db: &SqliteDatabase, buyer: &str) -> DepositCheckout {
    DepositFlowApi::new(db.clone(), accepting_gateway(), DepositTerms::default())
        .initialize_deposit(buyer, DepositRequest::new(LISTING, buyer, 1))
        .await
        .expect("Error placing deposit")
}

/// A webhook delivery, signed with [`PAYSTACK_SECRET`].
pub fn signed_webhook(body: &str) -> TestRequest {
    TestRequest::post()
        .uri("/paystack-webhook")
        .insert_header((PAYSTACK_SIGNATURE_HEADER, calculate_signature(PAYSTACK_SECRET, body.as_bytes())))
        .insert_header(("content-type", "application/json"))
        .set_payload(body.to_string())
}

pub fn charge_webhook(event: &str, reference: &str, amount: i64) -> String {
    serde_json::json!({
        "event": event,
        "data": {
            "id": 4_099_260_516_i64,
            "reference": reference,
            "amount": amount,
            "status": if event == "charge.success" { "success" } else { "failed" },
            "paid_at": "2026-10-19T09:12:00.000Z",
            "gateway_response": "Approved",
            "customer": { "email": "alice@example.com" }
        }
    })
    .to_string()
}

/// Sends the request through an app set up by `configure`, and returns the status and body. Errors raised by
/// middleware are rendered the way the server would render them.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = test::init_service(App::new().configure(configure)).await;
    match test::try_call_service(&app, req.to_request()).await {
        Ok(res) => read_response(res).await,
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().ok().unwrap_or_default();
            debug!("Request failed with {status}");
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

async fn read_response(res: ServiceResponse) -> (StatusCode, String) {
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}
