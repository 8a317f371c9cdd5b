//! HTTP layer for Hookline.
//!
//! Axum routes for webhook delivery and workflow trigger registration, with
//! an envelope response format, CORS and request tracing.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
