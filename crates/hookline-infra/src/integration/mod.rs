//! Concrete webhook integrations.
//!
//! `github` and `whatsapp` are dedicated provider integrations that can also
//! register webhooks through the provider API. `manual` is the generic
//! fallback for services without a dedicated integration.

pub mod github;
pub mod manual;
pub mod whatsapp;

use std::collections::HashMap;
use std::sync::Arc;

use hookline_core::integration::{BoxWebhookIntegration, IntegrationRegistry};
use hookline_types::config::GlobalConfig;
use hookline_types::request::NormalizedRequest;
use serde_json::Value;

use crate::provider::ProviderApiClient;

pub use github::GitHubIntegration;
pub use manual::ManualIntegration;
pub use whatsapp::WhatsAppIntegration;

/// Registry with every dedicated integration and the manual fallback.
pub fn build_registry(
    client: Arc<ProviderApiClient>,
    config: &GlobalConfig,
) -> IntegrationRegistry {
    IntegrationRegistry::new(BoxWebhookIntegration::new(ManualIntegration))
        .with(BoxWebhookIntegration::new(GitHubIntegration::new(
            Arc::clone(&client),
            config.github_api_url.clone(),
        )))
        .with(BoxWebhookIntegration::new(WhatsAppIntegration::new(
            client,
            config.whatsapp_api_url.clone(),
        )))
}

/// Request headers minus `omit`, as event context.
fn header_context(request: &NormalizedRequest, omit: &[&str]) -> HashMap<String, Value> {
    request
        .headers()
        .iter()
        .filter(|(name, _)| !omit.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect()
}
