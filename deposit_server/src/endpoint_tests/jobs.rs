use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{Duration, Utc};
use deposit_engine::{
    db_types::{DepositStatus, Pesewas, SubscriptionStatus},
    events::EventProducers,
    test_utils::fixtures::{
        fetch_deposit,
        fetch_listing,
        fetch_subscription_status,
        seed_push_token,
        seed_subscription,
        set_deposit_expiry,
    },
    traits::ChargeOutcome,
    DepositTerms,
    ReconciliationApi,
    ReminderApi,
    SqliteDatabase,
    SweeperApi,
};
use serde_json::Value;

use super::{
    helpers::{
        guards,
        place_deposit,
        place_deposit_for,
        send_request,
        setup_db,
        tear_down,
        BUYER,
        CRON_SECRET,
        LISTING,
        OTHER_BUYER,
    },
    mocks::MockPush,
};
use crate::{
    middleware::CRON_SECRET_HEADER,
    routes::{AutoRecoverReservationsRoute, ExpireTrialsRoute, SendDepositRemindersRoute},
};

fn configure(db: &SqliteDatabase, push: MockPush) -> impl FnOnce(&mut ServiceConfig) {
    let sweeper = SweeperApi::new(db.clone(), EventProducers::default());
    let reminders = ReminderApi::new(db.clone(), push);
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(guards()))
            .app_data(web::Data::new(sweeper))
            .app_data(web::Data::new(reminders))
            .service(AutoRecoverReservationsRoute::<SqliteDatabase>::new())
            .service(SendDepositRemindersRoute::<SqliteDatabase, MockPush>::new())
            .service(ExpireTrialsRoute::<SqliteDatabase>::new());
    }
}

fn silent_push() -> MockPush {
    let mut push = MockPush::new();
    push.expect_send().never();
    push
}

fn job(path: &str) -> TestRequest {
    TestRequest::post().uri(path).insert_header((CRON_SECRET_HEADER, CRON_SECRET))
}

async fn pay_for(db: &SqliteDatabase, reference: &str) {
    ReconciliationApi::new(db.clone(), DepositTerms::default(), EventProducers::default())
        .process_charge(ChargeOutcome::success(reference, Pesewas::from(2000)))
        .await
        .expect("Error settling charge");
}

#[actix_web::test]
async fn jobs_need_the_cron_secret() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    for path in ["/auto-recover-reservations", "/send-deposit-reminders", "/expire-trials"] {
        let req = TestRequest::post().uri(path);
        let (status, body) = send_request(req, configure(&db, silent_push())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
        assert!(body.contains("Unauthorized"));

        let req = TestRequest::post().uri(path).insert_header((CRON_SECRET_HEADER, "guess"));
        let (status, _) = send_request(req, configure(&db, silent_push())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
    }
    tear_down(db).await;
}

#[actix_web::test]
async fn recover_expired_reservations() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let lapsed = place_deposit(&db).await;
    let live = place_deposit_for(&db, OTHER_BUYER).await;
    assert_eq!(fetch_listing(&db, LISTING).await.available_quantity, 1);
    set_deposit_expiry(&db, &lapsed.reference, Utc::now() - Duration::minutes(5)).await;

    let (status, body) = send_request(job("/auto-recover-reservations"), configure(&db, silent_push())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["success"], true);
    assert_eq!(response["recovered"], 1);
    assert_eq!(response["notified"], 1);
    assert_eq!(fetch_deposit(&db, &lapsed.reference).await.status, DepositStatus::Expired);
    assert_eq!(fetch_deposit(&db, &live.reference).await.status, DepositStatus::Pending);
    assert_eq!(fetch_listing(&db, LISTING).await.available_quantity, 2);

    // A second sweep finds nothing left to do
    let (_, body) = send_request(job("/auto-recover-reservations"), configure(&db, silent_push())).await;
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["recovered"], 0);
    assert_eq!(response["notified"], 0);
    assert_eq!(fetch_listing(&db, LISTING).await.available_quantity, 2);
    tear_down(db).await;
}

#[actix_web::test]
async fn deposit_reminders() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let checkout = place_deposit(&db).await;
    pay_for(&db, &checkout.reference).await;
    set_deposit_expiry(&db, &checkout.reference, Utc::now() + Duration::hours(24)).await;
    seed_push_token(&db, BUYER, "ExponentPushToken[alice-phone]", true).await;

    let mut push = MockPush::new();
    push.expect_send()
        .withf(|msgs| msgs.len() == 1 && msgs[0].to == "ExponentPushToken[alice-phone]")
        .times(1)
        .returning(|msgs| Ok(msgs.len()));
    let (status, body) = send_request(job("/send-deposit-reminders"), configure(&db, push)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["success"], true);
    assert_eq!(response["processed"], 1);
    assert_eq!(response["reminders_sent"]["day1"], 0);
    assert_eq!(response["reminders_sent"]["day2"], 1);
    assert_eq!(response["reminders_sent"]["day3"], 0);
    assert_eq!(response["reminders_sent"]["total"], 1);

    // The day-2 reminder goes out once
    let (_, body) = send_request(job("/send-deposit-reminders"), configure(&db, silent_push())).await;
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["reminders_sent"]["total"], 0);
    tear_down(db).await;
}

#[actix_web::test]
async fn expire_trials_with_bearer_secret() {
    let _ = env_logger::try_init();
    let db = setup_db().await;
    let ended = Some(Utc::now() - Duration::days(1));
    let lapsed = seed_subscription(&db, BUYER, "pro", SubscriptionStatus::Trial, ended).await;
    let ends = Some(Utc::now() + Duration::days(3));
    let running = seed_subscription(&db, OTHER_BUYER, "pro", SubscriptionStatus::Trial, ends).await;
    let req =
        TestRequest::post().uri("/expire-trials").insert_header(("Authorization", format!("Bearer {CRON_SECRET}")));
    let (status, body) = send_request(req, configure(&db, silent_push())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["success"], true);
    assert_eq!(response["expired"], 1);
    assert_eq!(fetch_subscription_status(&db, lapsed).await, SubscriptionStatus::Expired);
    assert_eq!(fetch_subscription_status(&db, running).await, SubscriptionStatus::Trial);
    tear_down(db).await;
}
