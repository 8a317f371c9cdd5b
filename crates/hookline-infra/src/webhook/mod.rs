//! Webhook delivery helpers shared by the provider integrations.

pub mod signature;

pub use signature::{
    compute_hmac_sha256_hex, verify_hmac_sha256_hex, verify_hmac_sha256_hex_exact,
};
