//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here awaits the database, the gateway or the auth
//! platform, so all of them are async.
//!
//! | route                               | caller              | guard                           |
//! |-------------------------------------|---------------------|---------------------------------|
//! | `POST /initialize-deposit-payment`  | app (buyer)         | bearer session                  |
//! | `POST /paystack-verify`             | app (payer)         | bearer session                  |
//! | `POST /paystack-webhook`            | Paystack            | IP whitelist, signature         |
//! | `POST /auto-recover-reservations`   | cron                | cron secret                     |
//! | `POST /send-deposit-reminders`      | cron                | cron secret                     |
//! | `POST /expire-trials`               | cron                | cron secret                     |
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use deposit_engine::{
    traits::{DepositDatabase, PaymentProvider, PushNotifier},
    DepositFlowApi,
    ReconciliationApi,
    ReminderApi,
    SweeperApi,
    WebhookDisposition,
};
use log::*;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::{
    auth::{authenticate, SessionVerifier},
    data_objects::{
        InitializeDepositParams,
        InitializeDepositResponse,
        RecoveryResponse,
        ReminderResponse,
        TrialExpiryResponse,
        VerifyParams,
        WebhookAck,
    },
    errors::ServerError,
    integrations::paystack::gateway_event,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    // Guards are applied right to left: the last one listed sees the request first.
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($guards:ident),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    $( .wrap($crate::middleware::$guards::default()) )+;
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ServerError> {
    serde_json::from_slice::<T>(body).map_err(|e| {
        debug!("💻️ Could not parse request body. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Deposits  ----------------------------------------------------
route!(initialize_deposit_payment => Post "/initialize-deposit-payment" impl DepositDatabase, PaymentProvider, SessionVerifier);
/// Route handler for the deposit initialization endpoint
///
/// The caller must be signed in (`Authorization: Bearer <session token>`) and can only place deposits for themselves.
/// The session is checked before the body is even parsed.
///
/// On success, the listing's inventory is held for the buyer and the response carries the hosted checkout page:
/// `{success, reference, amount, authorization_url, access_code}`.
pub async fn initialize_deposit_payment<B, P, S>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<DepositFlowApi<B, P>>,
    verifier: web::Data<S>,
) -> Result<HttpResponse, ServerError>
where
    B: DepositDatabase,
    P: PaymentProvider,
    S: SessionVerifier,
{
    trace!("💻️ Received deposit initialization request");
    let user = authenticate(&req, verifier.get_ref()).await?;
    let params = parse_body::<InitializeDepositParams>(&body)?;
    debug!("💻️ {} wants {} unit(s) of listing {}", user.id, params.reserved_quantity, params.listing_id);
    let checkout = api.initialize_deposit(&user.id, params.into()).await?;
    Ok(HttpResponse::Ok().json(InitializeDepositResponse::from(checkout)))
}

route!(paystack_verify => Post "/paystack-verify" impl DepositDatabase, PaymentProvider, SessionVerifier);
/// Route handler for explicit payment verification
///
/// The app calls this when the buyer returns from the checkout page, in case the webhook is late. The gateway's verdict
/// goes through the same idempotent path as a webhook would, so calling this any number of times is harmless.
pub async fn paystack_verify<B, P, S>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B>>,
    provider: web::Data<P>,
    verifier: web::Data<S>,
) -> Result<HttpResponse, ServerError>
where
    B: DepositDatabase,
    P: PaymentProvider,
    S: SessionVerifier,
{
    let user = authenticate(&req, verifier.get_ref()).await?;
    let params = parse_body::<VerifyParams>(&body)?;
    debug!("💻️ {} asked to verify {}", user.id, params.reference);
    let tx = api.verify_transaction(&user.id, &params.reference, provider.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "transaction": tx })))
}

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(paystack_webhook => Post "/paystack-webhook" impl DepositDatabase where requires [SignatureMiddlewareFactory, WhitelistMiddlewareFactory]);
/// Route handler for Paystack webhooks
///
/// By the time the handler runs, the signature has been checked. The handler answers 200 whenever there is nothing
/// left to do for the delivery (it was applied, was a duplicate, or can never apply) and 500 when the state change did
/// not commit or the body could not be read, so that Paystack tries again.
pub async fn paystack_webhook<B: DepositDatabase>(
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let event = gateway_event(&body);
    info!("🪝️ Received {} webhook", event.event_type);
    match api.process_event(event).await? {
        WebhookDisposition::Applied(tx) => info!("🪝️ {} is now {}", tx.reference, tx.status),
        WebhookDisposition::AlreadySettled(tx) => debug!("🪝️ Duplicate delivery for {}", tx.reference),
        WebhookDisposition::UnknownReference(r) => warn!("🪝️ Acknowledged webhook for unknown reference {r}"),
        WebhookDisposition::Ignored(e) => debug!("🪝️ Acknowledged {e} webhook"),
    }
    Ok(HttpResponse::Ok().json(WebhookAck { received: true }))
}

//----------------------------------------------   Scheduled jobs  ----------------------------------------------------
route!(auto_recover_reservations => Post "/auto-recover-reservations" impl DepositDatabase where requires [CronMiddlewareFactory]);
pub async fn auto_recover_reservations<B: DepositDatabase>(
    api: web::Data<SweeperApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ Running reservation recovery");
    let result = api.recover_expired_reservations(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(RecoveryResponse::from(result)))
}

route!(send_deposit_reminders => Post "/send-deposit-reminders" impl DepositDatabase, PushNotifier where requires [CronMiddlewareFactory]);
pub async fn send_deposit_reminders<B, N>(api: web::Data<ReminderApi<B, N>>) -> Result<HttpResponse, ServerError>
where
    B: DepositDatabase,
    N: PushNotifier,
{
    debug!("💻️ Running deposit reminders");
    let report = api.send_deposit_reminders(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ReminderResponse::from(report)))
}

route!(expire_trials => Post "/expire-trials" impl DepositDatabase where requires [CronMiddlewareFactory]);
pub async fn expire_trials<B: DepositDatabase>(api: web::Data<SweeperApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ Running trial expiry");
    let result = api.expire_trials(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(TrialExpiryResponse::from(result)))
}
