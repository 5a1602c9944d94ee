//! Restricts a route to the peer addresses in the [`GuardConfig`] whitelist. When no whitelist is configured, every
//! peer is allowed through.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{info, warn};

use crate::{
    config::GuardConfig,
    errors::{AuthError, ServerError},
    helpers::get_remote_ip,
};

#[derive(Default)]
pub struct WhitelistMiddlewareFactory;

impl<S, B> Transform<S, ServiceRequest> for WhitelistMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = WhitelistMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(WhitelistMiddlewareService { service: Rc::new(service) }))
    }
}

pub struct WhitelistMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for WhitelistMiddlewareService<S>
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
        let whitelisted = match req.app_data::<web::Data<GuardConfig>>() {
            Some(guards) => {
                let peer_ip = get_remote_ip(req.request(), guards.use_x_forwarded_for, guards.use_forwarded);
                match (peer_ip, &guards.paystack_whitelist) {
                    (_, None) => true,
                    (Some(ip), Some(whitelist)) => {
                        info!("🔐️ Webhook call from {ip}");
                        whitelist.contains(&ip)
                    },
                    (None, Some(_)) => {
                        warn!("🔐️ No IP address found for the remote peer. Denying access.");
                        false
                    },
                }
            },
            None => true,
        };
        Box::pin(async move {
            if whitelisted {
                service.call(req).await
            } else {
                warn!("🔐️ Peer is not whitelisted. Denying access to {}", req.path());
                Err(ServerError::AuthenticationError(AuthError::ForbiddenPeer).into())
            }
        })
    }
}
