//! Canonical events produced by webhook integrations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Provider-agnostic event handed to the ingestion sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// Globally unique, sortable identifier: the provider's delivery id when
    /// it has one, otherwise a fresh UUIDv7.
    pub id: String,
    pub payload: Value,
    /// Event name (e.g. "issues", "messages").
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, Value>,
}

impl CanonicalEvent {
    /// Create an event with a freshly generated UUIDv7 id.
    pub fn generated(event: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            payload,
            event: event.into(),
            timestamp: None,
            context: HashMap::new(),
        }
    }

    pub fn with_context(mut self, context: HashMap<String, Value>) -> Self {
        self.context = context;
        self
    }
}
