//! WhatsApp Business webhook integration.
//!
//! Source document: `{ "businessAccountId": "1029384756", "fields": ["messages"] }`.
//! One delivery may batch several changes across several entries; each
//! change becomes its own canonical event, in delivery order.

use std::sync::Arc;

use hookline_core::integration::{WebhookIntegration, WebhookRegistrationConfig};
use hookline_types::error::IntegrationError;
use hookline_types::event::CanonicalEvent;
use hookline_types::request::NormalizedRequest;
use hookline_types::source::ExternalSource;
use hookline_types::webhook::{WebhookOutcome, WebhookRegistration};
use serde::Deserialize;
use serde_json::{Value, json};

use super::header_context;
use crate::provider::ProviderApiClient;
use crate::webhook::verify_hmac_sha256_hex;

const SERVICE: &str = "whatsapp";

const OMITTED_HEADERS: [&str; 6] = [
    "x-hub-signature-256",
    "x-hub-signature",
    "content-type",
    "content-length",
    "accept-encoding",
    "x-forwarded-proto",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WhatsAppSource {
    business_account_id: String,
    #[serde(default)]
    fields: Vec<String>,
}

impl WhatsAppSource {
    fn parse(source: &Value) -> Result<Self, IntegrationError> {
        let parsed: Self =
            serde_json::from_value(source.clone()).map_err(|e| IntegrationError::InvalidSource {
                service: SERVICE.to_string(),
                reason: e.to_string(),
            })?;
        if parsed.business_account_id.trim().is_empty() {
            return Err(IntegrationError::InvalidSource {
                service: SERVICE.to_string(),
                reason: "businessAccountId must not be empty".to_string(),
            });
        }
        Ok(parsed)
    }
}

#[derive(Debug, Deserialize)]
struct Delivery {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
struct Change {
    field: String,
    #[serde(default)]
    value: Value,
}

pub struct WhatsAppIntegration {
    client: Arc<ProviderApiClient>,
    graph_api_url: String,
}

impl WhatsAppIntegration {
    pub fn new(client: Arc<ProviderApiClient>, graph_api_url: impl Into<String>) -> Self {
        Self {
            client,
            graph_api_url: graph_api_url.into(),
        }
    }
}

impl WebhookIntegration for WhatsAppIntegration {
    fn service(&self) -> &str {
        SERVICE
    }

    fn key_for_source(&self, source: &Value) -> Result<String, IntegrationError> {
        let parsed = WhatsAppSource::parse(source)?;
        Ok(format!("business_account.{}", parsed.business_account_id))
    }

    async fn register_webhook(
        &self,
        config: &WebhookRegistrationConfig,
        source: &Value,
    ) -> Result<WebhookRegistration, IntegrationError> {
        let parsed = WhatsAppSource::parse(source)?;
        let url = format!(
            "{}/{}/subscribed_apps",
            self.graph_api_url.trim_end_matches('/'),
            parsed.business_account_id
        );
        let mut body = json!({
            "override_callback_uri": config.callback_url,
            "verify_token": config.secret,
        });
        if !parsed.fields.is_empty() {
            body["subscribed_fields"] = json!(parsed.fields);
        }

        let response = self
            .client
            .post_json(&url, &config.access_token, &[], &body)
            .await?;

        if response.get("success") == Some(&Value::Bool(false)) {
            return Err(IntegrationError::ProviderApi {
                status: 200,
                status_text: "subscription was not confirmed".to_string(),
            });
        }
        Ok(WebhookRegistration {
            remote_id: None,
            response,
        })
    }

    fn handle_webhook_request(
        &self,
        request: &NormalizedRequest,
        external_source: &ExternalSource,
    ) -> WebhookOutcome {
        if let (Some(secret), Some(signature)) = (
            external_source.secret.as_deref(),
            request.header("x-hub-signature-256"),
        ) {
            if !verify_hmac_sha256_hex(secret.as_bytes(), request.raw_body(), signature) {
                return WebhookOutcome::error(
                    "Could not verify WhatsApp webhook payload, invalid signature or secret",
                );
            }
        }

        let delivery: Delivery = match serde_json::from_value(request.body().clone()) {
            Ok(delivery) => delivery,
            Err(e) => {
                return WebhookOutcome::error(format!("Malformed WhatsApp webhook payload: {e}"));
            }
        };

        let headers = header_context(request, &OMITTED_HEADERS);
        let events: Vec<CanonicalEvent> = delivery
            .entry
            .into_iter()
            .flat_map(|entry| {
                let entry_id = entry.id;
                let headers = &headers;
                entry.changes.into_iter().map(move |change| {
                    let mut context = headers.clone();
                    context.insert("entryId".to_string(), Value::String(entry_id.clone()));
                    CanonicalEvent::generated(change.field, change.value).with_context(context)
                })
            })
            .collect();

        if events.is_empty() {
            return WebhookOutcome::ignored("WhatsApp delivery contained no changes");
        }
        WebhookOutcome::Ok(events)
    }
}
