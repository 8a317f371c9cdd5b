//! Bearer-token JSON client for provider registration APIs.
//!
//! One `reqwest::Client` is built at the composition root and shared by every
//! integration that calls out, so connection pooling and the request timeout
//! are configured in exactly one place.

use std::time::Duration;

use hookline_types::error::IntegrationError;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

pub struct ProviderApiClient {
    http: reqwest::Client,
}

impl ProviderApiClient {
    const USER_AGENT: &'static str = concat!("hookline/", env!("CARGO_PKG_VERSION"));

    /// Build a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(Self::USER_AGENT)
            .build()?;
        Ok(Self { http })
    }

    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// POST a JSON body with bearer auth and return the decoded response.
    ///
    /// A non-success status is `IntegrationError::ProviderApi`; an empty or
    /// non-JSON success body decodes to `Value::Null`.
    pub async fn post_json(
        &self,
        url: &str,
        access_token: &SecretString,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value, IntegrationError> {
        let mut request = self
            .http
            .post(url)
            .bearer_auth(access_token.expose_secret())
            .json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IntegrationError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), body = %text, "provider API call failed");
            return Err(IntegrationError::ProviderApi {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
    }
}

impl std::fmt::Debug for ProviderApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderApiClient").finish_non_exhaustive()
    }
}
