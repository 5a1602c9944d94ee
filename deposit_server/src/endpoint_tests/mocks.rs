use deposit_engine::traits::{
    CheckoutRequest,
    CheckoutSession,
    PaymentProvider,
    PaymentProviderError,
    PushError,
    PushMessage,
    PushNotifier,
    VerifiedCharge,
};
use mockall::mock;

use crate::{
    auth::{SessionUser, SessionVerifier},
    errors::AuthError,
};

mock! {
    pub Gateway {}
    impl PaymentProvider for Gateway {
        async fn start_checkout(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentProviderError>;
        async fn verify_charge(&self, reference: &str) -> Result<VerifiedCharge, PaymentProviderError>;
    }
}

mock! {
    pub Push {}
    impl PushNotifier for Push {
        async fn send(&self, messages: Vec<PushMessage>) -> Result<usize, PushError>;
    }
}

mock! {
    pub Sessions {}
    impl SessionVerifier for Sessions {
        async fn verify_session(&self, token: &str) -> Result<SessionUser, AuthError>;
    }
}

/// Every token is a valid session for the user named in it, e.g. `token-alice` belongs to `alice`.
pub fn sessions_by_token() -> MockSessions {
    let mut sessions = MockSessions::new();
    sessions.expect_verify_session().returning(|token| match token.strip_prefix("token-") {
        Some(id) => Ok(SessionUser { id: id.to_string(), email: Some(format!("{id}@example.com")) }),
        None => Err(AuthError::InvalidSession),
    });
    sessions
}

/// The auth platform cannot be reached.
pub fn unreachable_sessions() -> MockSessions {
    let mut sessions = MockSessions::new();
    sessions
        .expect_verify_session()
        .returning(|_| Err(AuthError::ServiceUnavailable("Auth platform returned 503 Service Unavailable".into())));
    sessions
}

/// A gateway that hands out a checkout page for every request.
pub fn accepting_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_start_checkout().returning(|req| {
        Ok(CheckoutSession {
            authorization_url: format!("https://checkout.paystack.com/{}", req.reference),
            access_code: format!("ac_{}", req.reference),
            reference: req.reference,
        })
    });
    gateway
}

/// A gateway that must not be called at all.
pub fn untouchable_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_start_checkout().never();
    gateway.expect_verify_charge().never();
    gateway
}
