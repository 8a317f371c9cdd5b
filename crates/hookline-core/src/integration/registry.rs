//! Integration registry for runtime lookup by service identifier.

use std::collections::HashMap;

use hookline_types::error::IntegrationError;
use serde_json::Value;

use super::box_integration::BoxWebhookIntegration;

/// Registry of dedicated provider integrations, indexed by service id,
/// plus the one generic manual integration used for everything else.
pub struct IntegrationRegistry {
    integrations: HashMap<String, BoxWebhookIntegration>,
    manual: BoxWebhookIntegration,
}

impl IntegrationRegistry {
    /// Create a registry with no dedicated integrations.
    pub fn new(manual: BoxWebhookIntegration) -> Self {
        Self {
            integrations: HashMap::new(),
            manual,
        }
    }

    /// Register a dedicated integration under its own service id.
    ///
    /// If an integration for that service already exists, it is replaced.
    pub fn register(&mut self, integration: BoxWebhookIntegration) {
        self.integrations
            .insert(integration.service().to_string(), integration);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, integration: BoxWebhookIntegration) -> Self {
        self.register(integration);
        self
    }

    /// Look up the dedicated integration for a service.
    pub fn get(&self, service: &str) -> Option<&BoxWebhookIntegration> {
        self.integrations.get(service)
    }

    pub fn contains(&self, service: &str) -> bool {
        self.integrations.contains_key(service)
    }

    pub fn manual(&self) -> &BoxWebhookIntegration {
        &self.manual
    }

    /// The integration that handles a source: the dedicated one when
    /// registered, else the manual one when the source opted into manual
    /// registration, else none.
    pub fn resolve(
        &self,
        service: &str,
        manual_registration: bool,
    ) -> Option<&BoxWebhookIntegration> {
        match self.get(service) {
            Some(integration) => Some(integration),
            None if manual_registration => Some(&self.manual),
            None => None,
        }
    }

    /// Derive the source key for a service.
    ///
    /// Services without a dedicated integration are keyed by their raw
    /// service id. Their deliveries go through the manual integration, so the
    /// document must still satisfy its shape.
    pub fn key_for_source(
        &self,
        service: &str,
        source: &Value,
    ) -> Result<String, IntegrationError> {
        match self.get(service) {
            Some(integration) => integration.key_for_source(source),
            None => {
                self.manual.key_for_source(source)?;
                Ok(service.to_string())
            }
        }
    }

    /// Sorted service ids of the dedicated integrations.
    pub fn services(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.integrations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
