//! Observability for Hookline: subscriber setup and span field names.

pub mod attrs;
pub mod tracing_setup;

pub use tracing_setup::{LogFormat, init_tracing, shutdown_tracing};
