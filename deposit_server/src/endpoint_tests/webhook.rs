use std::net::{IpAddr, SocketAddr};

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use deposit_engine::{
    db_types::{DepositStatus, TransactionStatus},
    events::EventProducers,
    test_utils::fixtures::{fetch_deposit, fetch_listing, fetch_webhook_audit, lock_deposit_status},
    DepositDatabase,
    DepositTerms,
    ReconciliationApi,
    SqliteDatabase,
};
use paystack_tools::{calculate_signature, PAYSTACK_SIGNATURE_HEADER};

use super::helpers::{
    charge_webhook,
    guards,
    place_deposit,
    send_request,
    setup_db,
    signed_webhook,
    tear_down,
    LISTING,
    PAYSTACK_SECRET,
};
use crate::{config::GuardConfig, routes::PaystackWebhookRoute};

const PAYSTACK_IP: &str = "52.31.139.75";

fn configure(db: &SqliteDatabase, guards: GuardConfig) -> impl FnOnce(&mut ServiceConfig) {
    let api = ReconciliationApi::new(db.clone(), DepositTerms::default(), EventProducers::default());
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(guards))
            .app_data(web::Data::new(api))
            .service(PaystackWebhookRoute::<SqliteDatabase>::new());
    }
}

fn from_paystack(req: TestRequest) -> TestRequest {
    req.peer_addr(SocketAddr::new(PAYSTACK_IP.parse().unwrap(), 443))
}

#[actix_web::test]
async fn unsigned_webhook() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let checkout = place_deposit(&db).await;
    let req = TestRequest::post()
        .uri("/paystack-webhook")
        .insert_header(("content-type", "application/json"))
        .set_payload(charge_webhook("charge.success", &checkout.reference, 2000));
    let (status, body) = send_request(req, configure(&db, guards())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Invalid signature"), "{body}");
    assert_eq!(fetch_deposit(&db, &checkout.reference).await.status, DepositStatus::Pending);
    tear_down(db).await;
}

#[actix_web::test]
async fn forged_webhook() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let checkout = place_deposit(&db).await;
    let body = charge_webhook("charge.success", &checkout.reference, 2000);
    // Signed over a different body
    let other = charge_webhook("charge.success", &checkout.reference, 1);
    let forged = calculate_signature(PAYSTACK_SECRET, other.as_bytes());
    let req = TestRequest::post()
        .uri("/paystack-webhook")
        .insert_header((PAYSTACK_SIGNATURE_HEADER, forged))
        .insert_header(("content-type", "application/json"))
        .set_payload(body);
    let (status, _) = send_request(req, configure(&db, guards())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(fetch_deposit(&db, &checkout.reference).await.status, DepositStatus::Pending);
    tear_down(db).await;
}

#[actix_web::test]
async fn successful_charge_marks_deposit_paid() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let checkout = place_deposit(&db).await;
    let body = charge_webhook("charge.success", &checkout.reference, 2000);
    let (status, response) = send_request(signed_webhook(&body), configure(&db, guards())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, r#"{"received":true}"#);
    let deposit = fetch_deposit(&db, &checkout.reference).await;
    assert_eq!(deposit.status, DepositStatus::Paid);
    assert!(deposit.expires_at.is_some());
    assert_eq!(fetch_listing(&db, LISTING).await.available_quantity, 2);

    // Paystack retries deliveries. The second copy changes nothing.
    let (status, _) = send_request(signed_webhook(&body), configure(&db, guards())).await;
    assert_eq!(status, StatusCode::OK);
    let again = fetch_deposit(&db, &checkout.reference).await;
    assert_eq!(again.status, DepositStatus::Paid);
    assert_eq!(again.expires_at, deposit.expires_at);
    assert_eq!(fetch_listing(&db, LISTING).await.available_quantity, 2);
    tear_down(db).await;
}

#[actix_web::test]
async fn failed_charge_releases_inventory() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let checkout = place_deposit(&db).await;
    assert_eq!(fetch_listing(&db, LISTING).await.available_quantity, 2);
    let body = charge_webhook("charge.failed", &checkout.reference, 2000);
    let (status, _) = send_request(signed_webhook(&body), configure(&db, guards())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetch_deposit(&db, &checkout.reference).await.status, DepositStatus::Cancelled);
    assert_eq!(fetch_listing(&db, LISTING).await.available_quantity, 3);
    tear_down(db).await;
}

#[actix_web::test]
async fn unknown_reference_is_acknowledged() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let body = charge_webhook("charge.success", "DEP_0000000000_nothing", 2000);
    let (status, response) = send_request(signed_webhook(&body), configure(&db, guards())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, r#"{"received":true}"#);
    tear_down(db).await;
}

#[actix_web::test]
async fn other_events_are_acknowledged() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let checkout = place_deposit(&db).await;
    let body = serde_json::json!({
        "event": "transfer.success",
        "data": { "reference": checkout.reference, "amount": 2000 }
    })
    .to_string();
    let (status, _) = send_request(signed_webhook(&body), configure(&db, guards())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetch_deposit(&db, &checkout.reference).await.status, DepositStatus::Pending);
    tear_down(db).await;
}

#[actix_web::test]
async fn malformed_paid_at_still_settles() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let checkout = place_deposit(&db).await;
    let body = serde_json::json!({
        "event": "charge.success",
        "data": { "reference": checkout.reference, "amount": 2000, "status": "success", "paid_at": "" }
    })
    .to_string();
    let (status, _) = send_request(signed_webhook(&body), configure(&db, guards())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetch_deposit(&db, &checkout.reference).await.status, DepositStatus::Paid);
    let tx = db.fetch_transaction(&checkout.reference).await.unwrap().unwrap();
    assert_eq!(tx.status, TransactionStatus::Success);
    tear_down(db).await;
}

#[actix_web::test]
async fn unreadable_charge_is_refused() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let checkout = place_deposit(&db).await;
    let body = serde_json::json!({
        "event": "charge.success",
        "data": { "reference": checkout.reference, "amount": "20.00", "status": "success" }
    })
    .to_string();
    let (status, _) = send_request(signed_webhook(&body), configure(&db, guards())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(fetch_deposit(&db, &checkout.reference).await.status, DepositStatus::Pending);
    let tx = db.fetch_transaction(&checkout.reference).await.unwrap().unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);

    let audit = fetch_webhook_audit(&db, Some(&checkout.reference)).await;
    assert_eq!(audit.len(), 1);
    let (processed, error) = &audit[0];
    assert!(*processed);
    assert!(error.as_deref().is_some_and(|e| e.contains("Unreadable webhook payload")), "{error:?}");
    tear_down(db).await;
}

#[actix_web::test]
async fn store_failure_asks_for_redelivery() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let checkout = place_deposit(&db).await;
    lock_deposit_status(&db).await;
    let body = charge_webhook("charge.success", &checkout.reference, 2000);
    let (status, _) = send_request(signed_webhook(&body), configure(&db, guards())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let tx = db.fetch_transaction(&checkout.reference).await.unwrap().unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert!(tx.webhook_received);
    assert!(tx.webhook_processed);
    assert_eq!(fetch_deposit(&db, &checkout.reference).await.status, DepositStatus::Pending);
    let audit = fetch_webhook_audit(&db, Some(&checkout.reference)).await;
    assert!(audit[0].1.as_deref().is_some_and(|e| e.contains("deposits are locked")), "{audit:?}");
    tear_down(db).await;
}

#[actix_web::test]
async fn unparseable_body_is_audited_and_refused() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let (status, _) = send_request(signed_webhook("event=charge.success"), configure(&db, guards())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let audit = fetch_webhook_audit(&db, None).await;
    assert_eq!(audit.len(), 1);
    let (processed, error) = &audit[0];
    assert!(*processed);
    assert!(error.as_deref().is_some_and(|e| e.contains("not a Paystack event")), "{error:?}");
    tear_down(db).await;
}

#[actix_web::test]
async fn whitelisted_peer() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let checkout = place_deposit(&db).await;
    let whitelist: Vec<IpAddr> = vec![PAYSTACK_IP.parse().unwrap()];
    let guards = GuardConfig { paystack_whitelist: Some(whitelist), ..guards() };
    let body = charge_webhook("charge.success", &checkout.reference, 2000);
    let req = from_paystack(signed_webhook(&body));
    let (status, _) = send_request(req, configure(&db, guards)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetch_deposit(&db, &checkout.reference).await.status, DepositStatus::Paid);
    tear_down(db).await;
}

#[actix_web::test]
async fn peer_not_on_whitelist() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let checkout = place_deposit(&db).await;
    let whitelist: Vec<IpAddr> = vec![PAYSTACK_IP.parse().unwrap()];
    let guards = GuardConfig { paystack_whitelist: Some(whitelist), ..guards() };
    let body = charge_webhook("charge.success", &checkout.reference, 2000);
    let req = signed_webhook(&body).peer_addr("10.0.0.5:50000".parse().unwrap());
    let (status, _) = send_request(req, configure(&db, guards)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(fetch_deposit(&db, &checkout.reference).await.status, DepositStatus::Pending);
    tear_down(db).await;
}
