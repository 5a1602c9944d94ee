use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use deposit_engine::{
    db_types::{DepositStatus, Pesewas},
    events::EventProducers,
    test_utils::fixtures::fetch_deposit,
    traits::{ChargeStatus, VerifiedCharge},
    DepositTerms,
    ReconciliationApi,
    SqliteDatabase,
};
use serde_json::{json, Value};

use super::{
    helpers::{place_deposit, send_request, setup_db, tear_down},
    mocks::{sessions_by_token, untouchable_gateway, MockGateway, MockSessions},
};
use crate::routes::PaystackVerifyRoute;

fn configure(db: &SqliteDatabase, gateway: MockGateway) -> impl FnOnce(&mut ServiceConfig) {
    let api = ReconciliationApi::new(db.clone(), DepositTerms::default(), EventProducers::default());
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(api))
            .app_data(web::Data::new(gateway))
            .app_data(web::Data::new(sessions_by_token()))
            .service(PaystackVerifyRoute::<SqliteDatabase, MockGateway, MockSessions>::new());
    }
}

fn verify_request(token: &str, reference: &str) -> TestRequest {
    TestRequest::post()
        .uri("/paystack-verify")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(json!({ "reference": reference }))
}

#[actix_web::test]
async fn verify_someone_elses_payment() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let checkout = place_deposit(&db).await;
    let req = verify_request("token-bob", &checkout.reference);
    let (status, body) = send_request(req, configure(&db, untouchable_gateway())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains(&format!("Transaction {} not found", checkout.reference)), "{body}");
    tear_down(db).await;
}

#[actix_web::test]
async fn verify_settles_a_pending_payment() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let checkout = place_deposit(&db).await;
    let mut gateway = MockGateway::new();
    gateway.expect_verify_charge().times(1).returning(|reference| {
        Ok(VerifiedCharge {
            reference: reference.to_string(),
            status: Some(ChargeStatus::Success),
            amount: Pesewas::from(2000),
            paid_at: Some(Utc::now()),
            gateway_response: json!({ "status": "success" }),
        })
    });
    let req = verify_request("token-alice", &checkout.reference);
    let (status, body) = send_request(req, configure(&db, gateway)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["success"], true);
    assert_eq!(response["transaction"]["reference"], checkout.reference.as_str());
    assert_eq!(response["transaction"]["status"], "success");
    assert_eq!(fetch_deposit(&db, &checkout.reference).await.status, DepositStatus::Paid);

    // Settled transactions are answered from the store
    let req = verify_request("token-alice", &checkout.reference);
    let (status, body) = send_request(req, configure(&db, untouchable_gateway())).await;
    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["transaction"]["status"], "success");
    tear_down(db).await;
}

#[actix_web::test]
async fn verify_while_gateway_has_no_verdict() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let checkout = place_deposit(&db).await;
    let mut gateway = MockGateway::new();
    gateway.expect_verify_charge().times(1).returning(|reference| {
        Ok(VerifiedCharge {
            reference: reference.to_string(),
            status: None,
            amount: Pesewas::from(2000),
            paid_at: None,
            gateway_response: json!({ "status": "ongoing" }),
        })
    });
    let req = verify_request("token-alice", &checkout.reference);
    let (status, body) = send_request(req, configure(&db, gateway)).await;
    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["transaction"]["status"], "pending");
    assert_eq!(fetch_deposit(&db, &checkout.reference).await.status, DepositStatus::Pending);
    tear_down(db).await;
}
