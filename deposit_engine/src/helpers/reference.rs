use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};

pub const DEPOSIT_REFERENCE_PREFIX: &str = "DEP_";

/// A fresh gateway reference for a deposit, of the form `DEP_<unix millis>_<8 random alphanumerics>`.
///
/// The reference doubles as the gateway's idempotency key, so it must never be reused.
pub fn new_deposit_reference() -> String {
    let suffix: String =
        rand::thread_rng().sample_iter(&Alphanumeric).take(8).map(|c| char::from(c).to_ascii_uppercase()).collect();
    format!("{DEPOSIT_REFERENCE_PREFIX}{}_{suffix}", Utc::now().timestamp_millis())
}

pub fn is_deposit_reference(reference: &str) -> bool {
    reference.starts_with(DEPOSIT_REFERENCE_PREFIX)
}
