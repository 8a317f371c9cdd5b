//! Global configuration types for Hookline.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! public callback URL, provider API endpoints and registration timing.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the Hookline server.
///
/// Loaded from `~/.hookline/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Externally reachable base URL; webhook callbacks are registered
    /// under `{public_url}/api/v1/webhooks/...`.
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Delay before an `EXTERNAL_SOURCE_UPSERTED` notification is delivered,
    /// letting provider-side propagation settle.
    #[serde(default = "default_registration_delay_secs")]
    pub registration_delay_secs: u64,

    /// Base URL of the GitHub REST API.
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// Base URL of the WhatsApp (Graph) API, including the version segment.
    #[serde(default = "default_whatsapp_api_url")]
    pub whatsapp_api_url: String,

    /// Request timeout for outbound provider API calls.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_registration_delay_secs() -> u64 {
    15
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_whatsapp_api_url() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            public_url: default_public_url(),
            registration_delay_secs: default_registration_delay_secs(),
            github_api_url: default_github_api_url(),
            whatsapp_api_url: default_whatsapp_api_url(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}
