//! Trigger metadata declared by a workflow at deploy time.
//!
//! The wire shape is a JSON object discriminated by `type`:
//!
//! ```json
//! {
//!   "name": "Issue triage",
//!   "package": { "name": "triage", "version": "1.2.0" },
//!   "trigger": {
//!     "type": "WEBHOOK",
//!     "service": "github",
//!     "name": "issues",
//!     "filter": { "action": ["opened"] },
//!     "source": { "subresource": "repository", "repo": "acme/api", "events": ["issues"] }
//!   }
//! }
//! ```
//!
//! Raw payloads are checked by [`validate_workflow_metadata`], which reports
//! every problem with its field path before any entity is touched.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Service identifier of triggers fired by the platform itself
/// (custom events, HTTP endpoints, schedules).
pub const SELF_TRIGGER_SERVICE: &str = "trigger";

// ---------------------------------------------------------------------------
// TriggerType
// ---------------------------------------------------------------------------

/// Discriminant of [`TriggerMetadata`], persisted on workflows and event rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    CustomEvent,
    Webhook,
    HttpEndpoint,
    Schedule,
}

impl TriggerType {
    pub const ALL: [TriggerType; 4] = [
        TriggerType::CustomEvent,
        TriggerType::Webhook,
        TriggerType::HttpEndpoint,
        TriggerType::Schedule,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::CustomEvent => "CUSTOM_EVENT",
            TriggerType::Webhook => "WEBHOOK",
            TriggerType::HttpEndpoint => "HTTP_ENDPOINT",
            TriggerType::Schedule => "SCHEDULE",
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TriggerType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("invalid trigger type: '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// TriggerMetadata
// ---------------------------------------------------------------------------

/// A workflow's declared trigger.
///
/// `filter` is an opaque match predicate evaluated by the run engine.
/// `source` on webhooks is an opaque provider document, interpreted only by
/// the integration registered for `service`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerMetadata {
    CustomEvent {
        service: String,
        name: String,
        filter: Value,
    },
    Webhook {
        service: String,
        name: String,
        filter: Value,
        source: Value,
    },
    HttpEndpoint {
        service: String,
        name: String,
        filter: Value,
    },
    Schedule {
        service: String,
        name: String,
        filter: Value,
    },
}

impl TriggerMetadata {
    pub fn trigger_type(&self) -> TriggerType {
        match self {
            TriggerMetadata::CustomEvent { .. } => TriggerType::CustomEvent,
            TriggerMetadata::Webhook { .. } => TriggerType::Webhook,
            TriggerMetadata::HttpEndpoint { .. } => TriggerType::HttpEndpoint,
            TriggerMetadata::Schedule { .. } => TriggerType::Schedule,
        }
    }

    pub fn service(&self) -> &str {
        match self {
            TriggerMetadata::CustomEvent { service, .. }
            | TriggerMetadata::Webhook { service, .. }
            | TriggerMetadata::HttpEndpoint { service, .. }
            | TriggerMetadata::Schedule { service, .. } => service,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TriggerMetadata::CustomEvent { name, .. }
            | TriggerMetadata::Webhook { name, .. }
            | TriggerMetadata::HttpEndpoint { name, .. }
            | TriggerMetadata::Schedule { name, .. } => name,
        }
    }

    pub fn filter(&self) -> &Value {
        match self {
            TriggerMetadata::CustomEvent { filter, .. }
            | TriggerMetadata::Webhook { filter, .. }
            | TriggerMetadata::HttpEndpoint { filter, .. }
            | TriggerMetadata::Schedule { filter, .. } => filter,
        }
    }

    /// Whether the platform itself fires this trigger (no external provider).
    pub fn is_self_triggered(&self) -> bool {
        self.service() == SELF_TRIGGER_SERVICE
    }
}

/// Everything a workflow declares about itself when it is deployed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    /// Human-readable workflow title.
    pub name: String,
    /// Package manifest of the deployed workflow code.
    #[serde(default = "empty_object")]
    pub package: Value,
    pub trigger: TriggerMetadata,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Dotted path to the offending field (empty for the root).
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a raw deploy payload and decode it into [`WorkflowMetadata`].
///
/// Collects every issue rather than stopping at the first one.
pub fn validate_workflow_metadata(raw: &Value) -> Result<WorkflowMetadata, Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    let Some(root) = raw.as_object() else {
        return Err(vec![ValidationIssue::new("", "expected object")]);
    };

    if !root.get("name").is_some_and(Value::is_string) {
        issues.push(ValidationIssue::new("name", "expected string"));
    }

    if let Some(package) = root.get("package") {
        if !package.is_object() {
            issues.push(ValidationIssue::new("package", "expected object"));
        }
    }

    match root.get("trigger").and_then(Value::as_object) {
        None => issues.push(ValidationIssue::new("trigger", "expected object")),
        Some(trigger) => validate_trigger(trigger, &mut issues),
    }

    if !issues.is_empty() {
        return Err(issues);
    }

    serde_json::from_value(raw.clone()).map_err(|e| vec![ValidationIssue::new("", e.to_string())])
}

fn validate_trigger(trigger: &serde_json::Map<String, Value>, issues: &mut Vec<ValidationIssue>) {
    let trigger_type = match trigger.get("type").and_then(Value::as_str) {
        Some(s) => match s.parse::<TriggerType>() {
            Ok(t) => Some(t),
            Err(_) => {
                issues.push(ValidationIssue::new(
                    "trigger.type",
                    format!(
                        "invalid discriminator value '{s}'; expected CUSTOM_EVENT | WEBHOOK | HTTP_ENDPOINT | SCHEDULE"
                    ),
                ));
                None
            }
        },
        None => {
            issues.push(ValidationIssue::new("trigger.type", "expected string"));
            None
        }
    };

    match trigger.get("service").and_then(Value::as_str) {
        None => issues.push(ValidationIssue::new("trigger.service", "expected string")),
        Some(service) => {
            let platform_only = matches!(
                trigger_type,
                Some(TriggerType::CustomEvent | TriggerType::HttpEndpoint | TriggerType::Schedule)
            );
            if platform_only && service != SELF_TRIGGER_SERVICE {
                issues.push(ValidationIssue::new(
                    "trigger.service",
                    format!("expected '{SELF_TRIGGER_SERVICE}'"),
                ));
            }
        }
    }

    if !trigger.get("name").is_some_and(Value::is_string) {
        issues.push(ValidationIssue::new("trigger.name", "expected string"));
    }

    if !trigger.get("filter").is_some_and(Value::is_object) {
        issues.push(ValidationIssue::new("trigger.filter", "expected object"));
    }

    if trigger_type == Some(TriggerType::Webhook)
        && trigger.get("source").is_none_or(Value::is_null)
    {
        issues.push(ValidationIssue::new("trigger.source", "required"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn webhook_payload() -> Value {
        json!({
            "name": "Issue triage",
            "package": {"name": "triage", "version": "1.0.0"},
            "trigger": {
                "type": "WEBHOOK",
                "service": "github",
                "name": "issues",
                "filter": {"action": ["opened"]},
                "source": {"subresource": "repository", "repo": "acme/api", "events": ["issues"]}
            }
        })
    }

    #[test]
    fn test_validate_webhook_payload() {
        let meta = validate_workflow_metadata(&webhook_payload()).unwrap();
        assert_eq!(meta.name, "Issue triage");
        assert_eq!(meta.trigger.trigger_type(), TriggerType::Webhook);
        assert_eq!(meta.trigger.service(), "github");
        assert!(!meta.trigger.is_self_triggered());
        match meta.trigger {
            TriggerMetadata::Webhook { source, .. } => assert_eq!(source["repo"], "acme/api"),
            other => panic!("expected webhook, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_schedule_payload_defaults_package() {
        let raw = json!({
            "name": "Nightly",
            "trigger": {"type": "SCHEDULE", "service": "trigger", "name": "nightly", "filter": {}}
        });
        let meta = validate_workflow_metadata(&raw).unwrap();
        assert_eq!(meta.package, json!({}));
        assert!(meta.trigger.is_self_triggered());
    }

    #[test]
    fn test_validate_rejects_non_object() {
        let issues = validate_workflow_metadata(&json!("nope")).unwrap_err();
        assert_eq!(issues, vec![ValidationIssue::new("", "expected object")]);
    }

    #[test]
    fn test_validate_reports_every_field() {
        let raw = json!({
            "name": 7,
            "trigger": {"type": "WEBHOOK", "service": "github", "filter": []}
        });
        let issues = validate_workflow_metadata(&raw).unwrap_err();
        let paths: Vec<&str> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "trigger.name", "trigger.filter", "trigger.source"]);
    }

    #[test]
    fn test_validate_unknown_discriminator() {
        let raw = json!({
            "name": "x",
            "trigger": {"type": "CRON", "service": "trigger", "name": "x", "filter": {}}
        });
        let issues = validate_workflow_metadata(&raw).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "trigger.type");
    }

    #[test]
    fn test_validate_platform_trigger_requires_self_service() {
        let raw = json!({
            "name": "x",
            "trigger": {"type": "CUSTOM_EVENT", "service": "github", "name": "x", "filter": {}}
        });
        let issues = validate_workflow_metadata(&raw).unwrap_err();
        assert_eq!(issues[0].path, "trigger.service");
    }

    #[test]
    fn test_trigger_metadata_wire_tag() {
        let meta = validate_workflow_metadata(&webhook_payload()).unwrap();
        let wire = serde_json::to_value(&meta.trigger).unwrap();
        assert_eq!(wire["type"], "WEBHOOK");
        assert_eq!(wire["service"], "github");
    }

    #[test]
    fn test_trigger_type_from_str() {
        assert_eq!("HTTP_ENDPOINT".parse::<TriggerType>().unwrap(), TriggerType::HttpEndpoint);
        assert!("webhook".parse::<TriggerType>().is_err());
    }
}
