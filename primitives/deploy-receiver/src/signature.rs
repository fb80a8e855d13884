use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Header GitHub puts the HMAC-SHA256 of the body in.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Checks a `sha256=<hex>` signature of `body` against `secret`.
pub fn validate_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Some(hex_digest) = signature.strip_prefix("sha256=") else {
        return false;
    };

    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };

    mac.update(body);

    let expected = match hex::decode(hex_digest) {
        Ok(h) => h,
        Err(_) => return false,
    };

    mac.verify_slice(&expected).is_ok()
}

/// Computes the `sha256=<hex>` header value GitHub would send for `body`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length.
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return String::new(),
    };
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
