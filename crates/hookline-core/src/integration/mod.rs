//! Provider webhook integrations.
//!
//! A provider integration knows how to derive a source key, register a
//! webhook at the provider, and turn an inbound delivery into canonical
//! events. Concrete integrations live in hookline-infra; this module holds
//! the capability trait, its object-safe wrapper and the name-keyed registry.

pub mod box_integration;
pub mod provider;
pub mod registry;

pub use box_integration::BoxWebhookIntegration;
pub use provider::{WebhookIntegration, WebhookRegistrationConfig};
pub use registry::IntegrationRegistry;
