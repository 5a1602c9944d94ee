//! Guards the scheduled-job endpoints.
//!
//! Callers must present the shared cron secret from the [`GuardConfig`] app data, either in the `x-cron-secret` header
//! or as a bearer token. Anything else gets a 401.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::warn;

use crate::{
    config::GuardConfig,
    errors::{AuthError, ServerError},
};

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

#[derive(Default)]
pub struct CronMiddlewareFactory;

impl<S, B> Transform<S, ServiceRequest> for CronMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = CronMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CronMiddlewareService { service: Rc::new(service) }))
    }
}

pub struct CronMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for CronMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let authorized = match req.app_data::<web::Data<GuardConfig>>() {
            Some(guards) => presented_secrets(&req).iter().any(|s| guards.cron_secret.matches(s)),
            None => false,
        };
        Box::pin(async move {
            if authorized {
                service.call(req).await
            } else {
                warn!("🔐️ Rejected call to {} without a valid cron secret", req.path());
                Err(ServerError::AuthenticationError(AuthError::InvalidCronSecret).into())
            }
        })
    }
}

fn presented_secrets(req: &ServiceRequest) -> Vec<String> {
    let headers = req.headers();
    let header = headers.get(CRON_SECRET_HEADER).and_then(|v| v.to_str().ok()).map(str::to_string);
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string());
    header.into_iter().chain(bearer).collect()
}
