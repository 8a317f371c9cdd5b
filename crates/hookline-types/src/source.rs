//! External sources and provider connections.
//!
//! An `ExternalSource` is the persisted configuration of one webhook trigger
//! for an organization. Its `key` is derived deterministically from the
//! service and source document, so redeploying the same trigger resolves to
//! the same row.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ExternalSourceType
// ---------------------------------------------------------------------------

/// Kind of external source.
///
/// Only webhooks are handled today. Rows written with any other type are
/// preserved as `Unsupported` so they can be rejected explicitly at dispatch
/// time instead of failing to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ExternalSourceType {
    Webhook,
    Unsupported(String),
}

impl ExternalSourceType {
    pub fn as_str(&self) -> &str {
        match self {
            ExternalSourceType::Webhook => "WEBHOOK",
            ExternalSourceType::Unsupported(other) => other,
        }
    }
}

impl fmt::Display for ExternalSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ExternalSourceType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "WEBHOOK" => ExternalSourceType::Webhook,
            _ => ExternalSourceType::Unsupported(s),
        }
    }
}

impl From<ExternalSourceType> for String {
    fn from(t: ExternalSourceType) -> Self {
        t.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// ExternalSourceStatus
// ---------------------------------------------------------------------------

/// Provider-side registration state of an external source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalSourceStatus {
    /// Persisted, remote webhook not yet registered.
    Created,
    /// The provider confirmed the webhook registration.
    Connected,
    /// The last registration attempt was refused by the provider.
    Failed,
}

impl ExternalSourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalSourceStatus::Created => "CREATED",
            ExternalSourceStatus::Connected => "CONNECTED",
            ExternalSourceStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ExternalSourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExternalSourceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(ExternalSourceStatus::Created),
            "CONNECTED" => Ok(ExternalSourceStatus::Connected),
            "FAILED" => Ok(ExternalSourceStatus::Failed),
            other => Err(format!("invalid external source status: '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// ExternalSource
// ---------------------------------------------------------------------------

/// Persisted configuration of one webhook trigger for an organization.
///
/// Identity is `(organization_id, key)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalSource {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub key: String,
    #[serde(rename = "type")]
    pub source_type: ExternalSourceType,
    /// Service identifier of the provider (e.g. "github").
    pub service: String,
    /// Provider-specific source document, opaque outside its integration.
    pub source: Value,
    /// Shared secret used to verify delivery signatures.
    #[serde(skip_serializing)]
    pub secret: Option<String>,
    pub status: ExternalSourceStatus,
    pub connection_id: Option<Uuid>,
    /// Set when no dedicated integration exists for `service`; deliveries are
    /// then handled by the generic manual integration.
    pub manual_registration: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Status of an authorized provider connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "CONNECTED",
            ConnectionStatus::Disconnected => "DISCONNECTED",
        }
    }
}

impl FromStr for ConnectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECTED" => Ok(ConnectionStatus::Connected),
            "DISCONNECTED" => Ok(ConnectionStatus::Disconnected),
            other => Err(format!("invalid connection status: '{other}'")),
        }
    }
}

/// An authorized API connection between an organization and a provider.
///
/// The access token is deliberately not part of this struct; it is read
/// through `ConnectionRepository::access_token` only when a registration
/// call needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Service identifier of the provider (e.g. "github").
    pub provider: String,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
}
