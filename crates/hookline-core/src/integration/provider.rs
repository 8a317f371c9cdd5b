//! The webhook-integration capability.

use hookline_types::error::IntegrationError;
use hookline_types::request::NormalizedRequest;
use hookline_types::source::ExternalSource;
use hookline_types::webhook::{WebhookOutcome, WebhookRegistration};
use secrecy::SecretString;
use serde_json::Value;

/// Everything a provider needs to create a webhook pointing back at us.
#[derive(Debug, Clone)]
pub struct WebhookRegistrationConfig {
    /// Absolute URL the provider should deliver to.
    pub callback_url: String,
    /// Shared secret the provider signs deliveries with.
    pub secret: String,
    /// Bearer token of the organization's provider connection.
    pub access_token: SecretString,
    pub content_type: String,
    pub verify_ssl: bool,
}

impl WebhookRegistrationConfig {
    /// JSON deliveries with TLS verification on.
    pub fn json(callback_url: String, secret: String, access_token: SecretString) -> Self {
        Self {
            callback_url,
            secret,
            access_token,
            content_type: "json".to_string(),
            verify_ssl: true,
        }
    }
}

/// Capability implemented by every provider webhook integration.
///
/// Uses native async fn in traits (RPITIT). For dynamic dispatch, wrap in
/// [`BoxWebhookIntegration`](super::BoxWebhookIntegration).
pub trait WebhookIntegration: Send + Sync {
    /// Service identifier this integration handles (e.g. "github").
    fn service(&self) -> &str;

    /// Derive the identity key of a source document.
    ///
    /// Pure and deterministic: the same document always yields the same key
    /// and distinct documents never collide. Documents that do not match the
    /// provider's expected shape are `IntegrationError::InvalidSource`.
    fn key_for_source(&self, source: &Value) -> Result<String, IntegrationError>;

    /// Create the webhook at the provider. Not idempotent: calling twice may
    /// create two remote webhooks.
    fn register_webhook(
        &self,
        config: &WebhookRegistrationConfig,
        source: &Value,
    ) -> impl std::future::Future<Output = Result<WebhookRegistration, IntegrationError>> + Send;

    /// Verify and normalize one inbound delivery.
    fn handle_webhook_request(
        &self,
        request: &NormalizedRequest,
        external_source: &ExternalSource,
    ) -> WebhookOutcome;
}
