use hmac::{Hmac, Mac};
use sha2::Sha512;

/// The header carrying the webhook signature
pub const PAYSTACK_SIGNATURE_HEADER: &str = "x-paystack-signature";

type HmacSha512 = Hmac<Sha512>;

/// Hex-encoded HMAC-SHA512 of `body`, keyed with the Paystack secret key.
pub fn calculate_signature(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length, so this branch is unreachable in practice
    let Ok(mut mac) = HmacSha512::new_from_slice(secret.as_bytes()) else {
        return String::default();
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Checks a webhook signature in constant time. Empty secrets never verify anything.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha512::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
