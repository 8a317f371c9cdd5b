//! Generic webhook integration for services without a dedicated one.
//!
//! The owner of the sending system registers the callback URL themselves.
//! Source document:
//!
//! ```json
//! { "event": "order.created", "verifyPayload": { "enabled": true, "header": "x-signature" } }
//! ```
//!
//! With verification enabled, the designated header must carry the lowercase
//! hex HMAC-SHA256 of the body exactly; no `sha256=` prefix is accepted.

use hookline_core::integration::{WebhookIntegration, WebhookRegistrationConfig};
use hookline_types::error::IntegrationError;
use hookline_types::event::CanonicalEvent;
use hookline_types::request::NormalizedRequest;
use hookline_types::source::ExternalSource;
use hookline_types::webhook::{WebhookOutcome, WebhookRegistration};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::header_context;
use crate::webhook::verify_hmac_sha256_hex_exact;

const SERVICE: &str = "manual";
const SIGNATURE_MISMATCH: &str = "Payload signature did not match";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManualSource {
    event: String,
    verify_payload: VerifyPayload,
}

#[derive(Debug, Deserialize)]
struct VerifyPayload {
    enabled: bool,
    #[serde(default)]
    header: Option<String>,
}

impl ManualSource {
    fn parse(source: &Value) -> Result<Self, IntegrationError> {
        serde_json::from_value(source.clone()).map_err(|e| IntegrationError::InvalidSource {
            service: SERVICE.to_string(),
            reason: e.to_string(),
        })
    }
}

pub struct ManualIntegration;

impl WebhookIntegration for ManualIntegration {
    fn service(&self) -> &str {
        SERVICE
    }

    fn key_for_source(&self, source: &Value) -> Result<String, IntegrationError> {
        Ok(ManualSource::parse(source)?.event)
    }

    async fn register_webhook(
        &self,
        _config: &WebhookRegistrationConfig,
        _source: &Value,
    ) -> Result<WebhookRegistration, IntegrationError> {
        Err(IntegrationError::Unsupported(
            "manual webhooks are registered by their owner".to_string(),
        ))
    }

    fn handle_webhook_request(
        &self,
        request: &NormalizedRequest,
        external_source: &ExternalSource,
    ) -> WebhookOutcome {
        let source = match ManualSource::parse(&external_source.source) {
            Ok(source) => source,
            Err(e) => return WebhookOutcome::error(e.to_string()),
        };

        let verify = &source.verify_payload;
        if let (true, Some(header)) = (verify.enabled, &verify.header) {
            let verified = match (external_source.secret.as_deref(), request.header(header)) {
                (Some(secret), Some(signature)) => {
                    verify_hmac_sha256_hex_exact(secret.as_bytes(), request.raw_body(), signature)
                }
                _ => false,
            };
            if !verified {
                return WebhookOutcome::error(SIGNATURE_MISMATCH);
            }
        }

        let headers: Map<String, Value> = header_context(request, &[]).into_iter().collect();
        let context = [
            ("headers".to_string(), Value::Object(headers)),
            (
                "externalSourceId".to_string(),
                Value::String(external_source.id.to_string()),
            ),
        ]
        .into_iter()
        .collect();

        WebhookOutcome::Ok(vec![
            CanonicalEvent::generated(source.event, request.body().clone()).with_context(context),
        ])
    }
}
