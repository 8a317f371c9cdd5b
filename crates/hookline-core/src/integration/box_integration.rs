//! BoxWebhookIntegration -- object-safe dynamic dispatch wrapper for
//! [`WebhookIntegration`].
//!
//! 1. `WebhookIntegrationDyn` is the object-safe twin with boxed futures
//! 2. A blanket impl covers every `T: WebhookIntegration`
//! 3. `BoxWebhookIntegration` wraps `Box<dyn WebhookIntegrationDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use hookline_types::error::IntegrationError;
use hookline_types::request::NormalizedRequest;
use hookline_types::source::ExternalSource;
use hookline_types::webhook::{WebhookOutcome, WebhookRegistration};
use serde_json::Value;

use super::provider::{WebhookIntegration, WebhookRegistrationConfig};

/// Object-safe version of [`WebhookIntegration`] with boxed futures.
pub trait WebhookIntegrationDyn: Send + Sync {
    fn service(&self) -> &str;

    fn key_for_source(&self, source: &Value) -> Result<String, IntegrationError>;

    fn register_webhook_boxed<'a>(
        &'a self,
        config: &'a WebhookRegistrationConfig,
        source: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<WebhookRegistration, IntegrationError>> + Send + 'a>>;

    fn handle_webhook_request(
        &self,
        request: &NormalizedRequest,
        external_source: &ExternalSource,
    ) -> WebhookOutcome;
}

impl<T: WebhookIntegration> WebhookIntegrationDyn for T {
    fn service(&self) -> &str {
        WebhookIntegration::service(self)
    }

    fn key_for_source(&self, source: &Value) -> Result<String, IntegrationError> {
        WebhookIntegration::key_for_source(self, source)
    }

    fn register_webhook_boxed<'a>(
        &'a self,
        config: &'a WebhookRegistrationConfig,
        source: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<WebhookRegistration, IntegrationError>> + Send + 'a>>
    {
        Box::pin(self.register_webhook(config, source))
    }

    fn handle_webhook_request(
        &self,
        request: &NormalizedRequest,
        external_source: &ExternalSource,
    ) -> WebhookOutcome {
        WebhookIntegration::handle_webhook_request(self, request, external_source)
    }
}

/// Type-erased webhook integration for runtime selection by service id.
pub struct BoxWebhookIntegration {
    inner: Box<dyn WebhookIntegrationDyn + Send + Sync>,
}

impl BoxWebhookIntegration {
    pub fn new<T: WebhookIntegration + 'static>(integration: T) -> Self {
        Self {
            inner: Box::new(integration),
        }
    }

    pub fn service(&self) -> &str {
        self.inner.service()
    }

    pub fn key_for_source(&self, source: &Value) -> Result<String, IntegrationError> {
        self.inner.key_for_source(source)
    }

    pub async fn register_webhook(
        &self,
        config: &WebhookRegistrationConfig,
        source: &Value,
    ) -> Result<WebhookRegistration, IntegrationError> {
        self.inner.register_webhook_boxed(config, source).await
    }

    pub fn handle_webhook_request(
        &self,
        request: &NormalizedRequest,
        external_source: &ExternalSource,
    ) -> WebhookOutcome {
        self.inner.handle_webhook_request(request, external_source)
    }
}

impl std::fmt::Debug for BoxWebhookIntegration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxWebhookIntegration")
            .field("service", &self.service())
            .finish()
    }
}
