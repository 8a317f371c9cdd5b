//! GitHub webhook integration.
//!
//! Source documents select a repository or an organization:
//!
//! ```json
//! { "subresource": "repository", "repo": "acme/api", "events": ["issues"] }
//! { "subresource": "organization", "org": "acme", "events": ["push"] }
//! ```

use std::sync::Arc;

use hookline_core::integration::{WebhookIntegration, WebhookRegistrationConfig};
use hookline_types::error::IntegrationError;
use hookline_types::event::CanonicalEvent;
use hookline_types::request::NormalizedRequest;
use hookline_types::source::ExternalSource;
use hookline_types::webhook::{WebhookOutcome, WebhookRegistration};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::header_context;
use crate::provider::ProviderApiClient;
use crate::webhook::verify_hmac_sha256_hex;

const SERVICE: &str = "github";
const API_VERSION: &str = "2022-11-28";

/// Headers consumed by the integration itself and dropped from event context.
const OMITTED_HEADERS: [&str; 9] = [
    "x-github-event",
    "x-github-delivery",
    "x-hub-signature-256",
    "x-hub-signature",
    "content-type",
    "content-length",
    "accept",
    "accept-encoding",
    "x-forwarded-proto",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "subresource", rename_all = "lowercase")]
enum GitHubSource {
    Repository {
        repo: String,
        #[serde(default)]
        events: Vec<String>,
    },
    Organization {
        org: String,
        #[serde(default)]
        events: Vec<String>,
    },
}

impl GitHubSource {
    fn parse(source: &Value) -> Result<Self, IntegrationError> {
        serde_json::from_value(source.clone()).map_err(|e| IntegrationError::InvalidSource {
            service: SERVICE.to_string(),
            reason: e.to_string(),
        })
    }

    fn key(&self) -> String {
        match self {
            GitHubSource::Repository { repo, .. } => format!("repository.{repo}"),
            GitHubSource::Organization { org, .. } => format!("organization.{org}"),
        }
    }

    fn hooks_path(&self) -> String {
        match self {
            GitHubSource::Repository { repo, .. } => format!("repos/{repo}/hooks"),
            GitHubSource::Organization { org, .. } => format!("orgs/{org}/hooks"),
        }
    }

    fn events(&self) -> &[String] {
        match self {
            GitHubSource::Repository { events, .. } | GitHubSource::Organization { events, .. } => {
                events
            }
        }
    }
}

pub struct GitHubIntegration {
    client: Arc<ProviderApiClient>,
    api_url: String,
}

impl GitHubIntegration {
    pub fn new(client: Arc<ProviderApiClient>, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }
}

impl WebhookIntegration for GitHubIntegration {
    fn service(&self) -> &str {
        SERVICE
    }

    fn key_for_source(&self, source: &Value) -> Result<String, IntegrationError> {
        Ok(GitHubSource::parse(source)?.key())
    }

    async fn register_webhook(
        &self,
        config: &WebhookRegistrationConfig,
        source: &Value,
    ) -> Result<WebhookRegistration, IntegrationError> {
        let github_source = GitHubSource::parse(source)?;
        let url = format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            github_source.hooks_path()
        );
        let body = json!({
            "name": "web",
            "active": true,
            "events": github_source.events(),
            "config": {
                "url": config.callback_url,
                "content_type": config.content_type,
                "secret": config.secret,
                "insecure_ssl": if config.verify_ssl { "0" } else { "1" },
            }
        });

        let response = self
            .client
            .post_json(
                &url,
                &config.access_token,
                &[
                    ("Accept", "application/vnd.github+json"),
                    ("X-GitHub-Api-Version", API_VERSION),
                ],
                &body,
            )
            .await?;

        let remote_id = match response.get("id") {
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };
        Ok(WebhookRegistration { remote_id, response })
    }

    fn handle_webhook_request(
        &self,
        request: &NormalizedRequest,
        external_source: &ExternalSource,
    ) -> WebhookOutcome {
        let delivery_id = match request.header("x-github-delivery") {
            Some(id) => id.to_string(),
            None => {
                let generated = Uuid::now_v7().to_string();
                tracing::warn!(
                    source_id = %external_source.id,
                    delivery_id = %generated,
                    "GitHub delivery without x-github-delivery header"
                );
                generated
            }
        };

        if let (Some(secret), Some(signature)) = (
            external_source.secret.as_deref(),
            request.header("x-hub-signature-256"),
        ) {
            if !verify_hmac_sha256_hex(secret.as_bytes(), request.raw_body(), signature) {
                return WebhookOutcome::error(format!(
                    "Could not verify GitHub webhook payload, invalid signature or secret [deliveryId = {delivery_id}]"
                ));
            }
        }

        let Some(event) = request.header("x-github-event") else {
            return WebhookOutcome::ignored(format!(
                "GitHub delivery {delivery_id} has no x-github-event header"
            ));
        };

        let event = CanonicalEvent {
            id: delivery_id,
            payload: request.body().clone(),
            event: event.to_string(),
            timestamp: None,
            context: header_context(request, &OMITTED_HEADERS),
        };
        WebhookOutcome::Ok(vec![event])
    }
}
