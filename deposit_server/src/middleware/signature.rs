//! Webhook signature middleware for Actix Web.
//!
//! Paystack signs every webhook delivery with the merchant's secret key. The signature is the hex-encoded
//! HMAC-SHA512 of the raw request body, and is provided in the `x-paystack-signature` header.
//!
//! Wrap the webhook route with this middleware so that unsigned or tampered deliveries are rejected before the body is
//! parsed or the database is touched. The secret is read from the [`GuardConfig`] app data.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use paystack_tools::{verify_signature, PAYSTACK_SIGNATURE_HEADER};

use crate::{
    config::GuardConfig,
    errors::{AuthError, ServerError},
};

#[derive(Default)]
pub struct SignatureMiddlewareFactory;

impl<S, B> Transform<S, ServiceRequest> for SignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureMiddlewareService { service: Rc::new(service) }))
    }
}

pub struct SignatureMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let key = req.app_data::<web::Data<GuardConfig>>().map(|g| g.paystack_secret.clone()).unwrap_or_default();
        Box::pin(async move {
            trace!("🔐️ Checking webhook signature");
            let signature = req
                .headers()
                .get(PAYSTACK_SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| {
                    warn!("🔐️ No signature found in webhook request. Denying access.");
                    ServerError::AuthenticationError(AuthError::InvalidSignature)
                })?;
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {:?}", e);
                ServerError::InvalidRequestBody("Failed to extract request data.".into())
            })?;
            if verify_signature(key.reveal(), data.as_ref(), &signature) {
                trace!("🔐️ Webhook signature ✅️");
                req.set_payload(bytes_to_payload(data));
                service.call(req).await
            } else {
                warn!("🔐️ Invalid webhook signature. Denying access.");
                Err(ServerError::AuthenticationError(AuthError::InvalidSignature).into())
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
