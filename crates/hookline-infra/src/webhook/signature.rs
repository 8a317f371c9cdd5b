//! HMAC-SHA256 delivery signatures.
//!
//! Providers sign the raw request body with the external source's secret and
//! send the hex digest in a header, usually as `sha256=<hex>`. Verification
//! recomputes the digest over the exact bytes received and compares hex
//! strings in constant time. Every failure path answers `false`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compute the lowercase hex HMAC-SHA256 of `body` under `secret`.
pub fn compute_hmac_sha256_hex(secret: &[u8], body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a hex signature, with or without a `sha256=` prefix.
///
/// Hex case is ignored. A signature of the wrong length never matches.
pub fn verify_hmac_sha256_hex(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let provided = signature
        .trim()
        .strip_prefix("sha256=")
        .unwrap_or(signature.trim())
        .to_ascii_lowercase();

    let Some(expected) = compute_hmac_sha256_hex(secret, body) else {
        return false;
    };

    constant_time_eq(&expected, &provided)
}

/// Verify a signature that must equal the lowercase hex digest exactly.
///
/// No prefix is stripped and case is significant.
pub fn verify_hmac_sha256_hex_exact(secret: &[u8], body: &[u8], signature: &str) -> bool {
    match compute_hmac_sha256_hex(secret, body) {
        Some(expected) => constant_time_eq(&expected, signature),
        None => false,
    }
}

fn constant_time_eq(expected: &str, provided: &str) -> bool {
    if expected.len() != provided.len() {
        return false;
    }
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}
