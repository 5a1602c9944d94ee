use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use deposit_engine::{
    db_types::DepositStatus,
    test_utils::fixtures::{fetch_deposit, fetch_listing, seed_listing},
    traits::PaymentProviderError,
    DepositFlowApi,
    DepositTerms,
    SqliteDatabase,
};
use serde_json::{json, Value};

use super::{
    helpers::{send_request, setup_db, tear_down, BUYER, LISTING, OTHER_BUYER, SELLER},
    mocks::{
        accepting_gateway,
        sessions_by_token,
        unreachable_sessions,
        untouchable_gateway,
        MockGateway,
        MockSessions,
    },
};
use crate::routes::InitializeDepositPaymentRoute;

fn configure(db: &SqliteDatabase, gateway: MockGateway) -> impl FnOnce(&mut ServiceConfig) {
    configure_with_sessions(db, gateway, sessions_by_token())
}

fn configure_with_sessions(
    db: &SqliteDatabase,
    gateway: MockGateway,
    sessions: MockSessions,
) -> impl FnOnce(&mut ServiceConfig) {
    let api = DepositFlowApi::new(db.clone(), gateway, DepositTerms::default());
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(api))
            .app_data(web::Data::new(sessions))
            .service(InitializeDepositPaymentRoute::<SqliteDatabase, MockGateway, MockSessions>::new());
    }
}

fn deposit_request(token: Option<&str>, body: Value) -> TestRequest {
    let req = TestRequest::post().uri("/initialize-deposit-payment").set_json(body);
    match token {
        Some(t) => req.insert_header(("Authorization", format!("Bearer {t}"))),
        None => req,
    }
}

#[actix_web::test]
async fn deposit_without_session() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let body = json!({ "listing_id": LISTING, "buyer_id": BUYER, "reserved_quantity": 1 });
    let (status, body) = send_request(deposit_request(None, body), configure(&db, untouchable_gateway())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Missing authorization header"));
    assert_eq!(fetch_listing(&db, LISTING).await.available_quantity, 3);
    tear_down(db).await;
}

#[actix_web::test]
async fn deposit_with_invalid_session() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let body = json!({ "listing_id": LISTING, "buyer_id": BUYER });
    let req = deposit_request(Some("not-a-session"), body);
    let (status, body) = send_request(req, configure(&db, untouchable_gateway())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Invalid or expired session"));
    tear_down(db).await;
}

#[actix_web::test]
async fn deposit_while_auth_platform_is_down() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let body = json!({ "listing_id": LISTING, "buyer_id": BUYER, "reserved_quantity": 1 });
    let req = deposit_request(Some("token-alice"), body);
    let (status, body) =
        send_request(req, configure_with_sessions(&db, untouchable_gateway(), unreachable_sessions())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("Could not reach the auth service"), "{body}");
    assert_eq!(fetch_listing(&db, LISTING).await.available_quantity, 3);
    tear_down(db).await;
}

#[actix_web::test]
async fn deposit_on_behalf_of_someone_else() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let body = json!({ "listing_id": LISTING, "buyer_id": BUYER, "reserved_quantity": 1 });
    let req = deposit_request(Some(&format!("token-{OTHER_BUYER}")), body);
    let (status, body) = send_request(req, configure(&db, untouchable_gateway())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("You can only place deposits for yourself"));
    assert_eq!(fetch_listing(&db, LISTING).await.available_quantity, 3);
    tear_down(db).await;
}

#[actix_web::test]
async fn deposit_with_missing_fields() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let req = deposit_request(Some("token-alice"), json!({ "buyer_id": BUYER }));
    let (status, body) = send_request(req, configure(&db, untouchable_gateway())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Missing required fields: listing_id, buyer_id"), "{body}");
    tear_down(db).await;
}

#[actix_web::test]
async fn deposit_with_malformed_body() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let req = TestRequest::post()
        .uri("/initialize-deposit-payment")
        .insert_header(("Authorization", "Bearer token-alice"))
        .set_payload("{listing_id: ");
    let (status, _) = send_request(req, configure(&db, untouchable_gateway())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    tear_down(db).await;
}

#[actix_web::test]
async fn deposit_is_placed() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let body = json!({ "listing_id": LISTING, "buyer_id": BUYER, "reserved_quantity": 2, "conversation_id": "conv-7" });
    let req = deposit_request(Some("token-alice"), body);
    let (status, body) = send_request(req, configure(&db, accepting_gateway())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["success"], true);
    assert_eq!(response["amount"], 4000);
    let reference = response["reference"].as_str().unwrap();
    assert!(reference.starts_with("DEP_"));
    assert_eq!(response["authorization_url"], format!("https://checkout.paystack.com/{reference}"));
    assert_eq!(response["access_code"], format!("ac_{reference}"));

    assert_eq!(fetch_listing(&db, LISTING).await.available_quantity, 1);
    let deposit = fetch_deposit(&db, reference).await;
    assert_eq!(deposit.status, DepositStatus::Pending);
    assert_eq!(deposit.reserved_quantity, 2);
    assert_eq!(deposit.seller_id, SELLER);
    assert_eq!(deposit.conversation_id.as_deref(), Some("conv-7"));
    tear_down(db).await;
}

#[actix_web::test]
async fn deposit_on_own_listing() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    seed_listing(&db, "kettle-01", BUYER, "Electric Kettle", 1).await;
    let body = json!({ "listing_id": "kettle-01", "buyer_id": BUYER });
    let req = deposit_request(Some("token-alice"), body);
    let (status, body) = send_request(req, configure(&db, untouchable_gateway())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("You cannot place a deposit on your own listing"), "{body}");
    assert_eq!(fetch_listing(&db, "kettle-01").await.available_quantity, 1);
    tear_down(db).await;
}

#[actix_web::test]
async fn gateway_refusal_restores_inventory() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_start_checkout()
        .times(1)
        .returning(|_| Err(PaymentProviderError::Rejected("Invalid email address".into())));
    let body = json!({ "listing_id": LISTING, "buyer_id": BUYER, "reserved_quantity": 3 });
    let req = deposit_request(Some("token-alice"), body);
    let (status, body) = send_request(req, configure(&db, gateway)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid email address"), "{body}");
    assert_eq!(fetch_listing(&db, LISTING).await.available_quantity, 3);
    tear_down(db).await;
}

#[actix_web::test]
async fn gateway_outage() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_start_checkout()
        .times(1)
        .returning(|_| Err(PaymentProviderError::Unavailable("connection reset".into())));
    let body = json!({ "listing_id": LISTING, "buyer_id": BUYER });
    let req = deposit_request(Some("token-alice"), body);
    let (status, _) = send_request(req, configure(&db, gateway)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(fetch_listing(&db, LISTING).await.available_quantity, 3);
    tear_down(db).await;
}
