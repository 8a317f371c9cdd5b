//! Outbound provider API access.

pub mod client;

pub use client::ProviderApiClient;
