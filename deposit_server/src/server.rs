use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use deposit_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    DepositFlowApi,
    ReconciliationApi,
    ReminderApi,
    SqliteDatabase,
    SweeperApi,
};
use log::*;
use paystack_tools::PaystackApi;

use crate::{
    auth::AuthPlatformVerifier,
    config::{GuardConfig, ServerConfig},
    errors::ServerError,
    integrations::{expo::ServerPushNotifier, paystack::PaystackProvider},
    routes::{
        health,
        AutoRecoverReservationsRoute,
        ExpireTrialsRoute,
        InitializeDepositPaymentRoute,
        PaystackVerifyRoute,
        PaystackWebhookRoute,
        SendDepositRemindersRoute,
    },
    scheduler::{start_reminders, start_sweeper},
};

pub const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, default_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let push = ServerPushNotifier::from_access_token(&config.expo_access_token);
    if config.run_scheduler {
        let _sweeper = start_sweeper(db.clone(), producers.clone());
        let _reminders = start_reminders(db.clone(), push.clone());
    } else {
        info!("🕰️ In-process scheduler is off. Expecting an external cron to call the job endpoints.");
    }
    let srv = create_server_instance(config, db, producers, push)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Subscribers for engine events. For now, they only log.
fn default_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_payment_settled(|ev| {
            Box::pin(async move {
                info!("📬️ Payment {} settled ({:?})", ev.transaction.reference, ev.effect);
            })
        })
        .on_reservation_expired(|ev| {
            Box::pin(async move {
                let deposit = &ev.deposit;
                info!("📬️ Reservation {} for listing {} expired", deposit.payment_reference, deposit.listing_id);
            })
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    push: ServerPushNotifier,
) -> Result<Server, ServerError> {
    let paystack = PaystackApi::new(config.paystack.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the Paystack client. {e}")))?;
    let provider = PaystackProvider::new(paystack, &config.callback_base_url);
    let verifier = AuthPlatformVerifier::new(config.auth.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the auth client. {e}")))?;
    let guards = GuardConfig::from_config(&config);
    let terms = config.terms;
    let srv = HttpServer::new(move || {
        let deposit_api = DepositFlowApi::new(db.clone(), provider.clone(), terms);
        let reconciliation_api = ReconciliationApi::new(db.clone(), terms, producers.clone());
        let sweeper_api = SweeperApi::new(db.clone(), producers.clone());
        let reminder_api = ReminderApi::new(db.clone(), push.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("dg::access_log"))
            .app_data(web::Data::new(guards.clone()))
            .app_data(web::Data::new(deposit_api))
            .app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(sweeper_api))
            .app_data(web::Data::new(reminder_api))
            .app_data(web::Data::new(provider.clone()))
            .app_data(web::Data::new(verifier.clone()))
            .service(health)
            .service(InitializeDepositPaymentRoute::<SqliteDatabase, PaystackProvider, AuthPlatformVerifier>::new())
            .service(PaystackVerifyRoute::<SqliteDatabase, PaystackProvider, AuthPlatformVerifier>::new())
            .service(PaystackWebhookRoute::<SqliteDatabase>::new())
            .service(AutoRecoverReservationsRoute::<SqliteDatabase>::new())
            .service(SendDepositRemindersRoute::<SqliteDatabase, ServerPushNotifier>::new())
            .service(ExpireTrialsRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
