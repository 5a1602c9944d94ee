//! User authentication.
//!
//! User sessions are issued by an external auth platform. The server never sees passwords; it forwards the caller's
//! bearer token to the platform and trusts the user it gets back.
use std::{sync::Arc, time::Duration};

use actix_web::{http::header::AUTHORIZATION, HttpRequest};
use log::*;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{config::AuthConfig, errors::AuthError};

const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Resolves a session token to the user it belongs to.
#[allow(async_fn_in_trait)]
pub trait SessionVerifier {
    async fn verify_session(&self, token: &str) -> Result<SessionUser, AuthError>;
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(req: &HttpRequest) -> Result<String, AuthError> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Authenticates the request's bearer token with the given verifier.
pub async fn authenticate<S: SessionVerifier>(req: &HttpRequest, verifier: &S) -> Result<SessionUser, AuthError> {
    let token = bearer_token(req)?;
    let user = verifier.verify_session(&token).await?;
    trace!("🔐️ Session belongs to {}", user.id);
    Ok(user)
}

/// Checks tokens against the auth platform's `GET /auth/v1/user` endpoint.
#[derive(Clone)]
pub struct AuthPlatformVerifier {
    config: AuthConfig,
    client: Arc<Client>,
}

impl AuthPlatformVerifier {
    pub fn new(config: AuthConfig) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(AUTH_TIMEOUT)
            .build()
            .map_err(|e| AuthError::ServiceUnavailable(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }
}

impl SessionVerifier for AuthPlatformVerifier {
    async fn verify_session(&self, token: &str) -> Result<SessionUser, AuthError> {
        if self.config.auth_url.is_empty() {
            warn!("🔐️ No auth platform is configured. Rejecting session");
            return Err(AuthError::InvalidSession);
        }
        let url = format!("{}/auth/v1/user", self.config.auth_url);
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header("apikey", self.config.api_key.reveal())
            .send()
            .await
            .map_err(|e| {
                warn!("🔐️ Auth platform request failed. {e}");
                AuthError::ServiceUnavailable(e.to_string())
            })?;
        match response.status() {
            s if s.is_success() => response.json::<SessionUser>().await.map_err(|e| {
                warn!("🔐️ Unexpected auth platform response. {e}");
                AuthError::ServiceUnavailable(e.to_string())
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                debug!("🔐️ Session token was rejected");
                Err(AuthError::InvalidSession)
            },
            s => {
                warn!("🔐️ Auth platform returned {s}");
                Err(AuthError::ServiceUnavailable(format!("Auth platform returned {s}")))
            },
        }
    }
}
