//! Workflow and event rule types.
//!
//! A `Workflow` is identified by `(organization_id, slug)` and is created on
//! first registration, then updated in place. An `EventRule` maps a workflow
//! in one runtime environment to its trigger-matching filter.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::trigger::{TriggerMetadata, TriggerType};

/// Lifecycle status of a workflow.
///
/// `Created` -> `Ready`. Self-triggered workflows start `Ready`; webhook
/// workflows stay `Created` until the provider confirms registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Created,
    Ready,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Created => "CREATED",
            WorkflowStatus::Ready => "READY",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(WorkflowStatus::Created),
            "READY" => Ok(WorkflowStatus::Ready),
            other => Err(format!("invalid workflow status: '{other}'")),
        }
    }
}

/// A deployed workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub slug: String,
    pub title: String,
    /// Package manifest of the deployed code.
    pub package: Value,
    pub trigger_type: TriggerType,
    pub status: WorkflowStatus,
    pub external_source_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Trigger-matching rule of a workflow in one environment.
///
/// Identity is `(workflow_id, environment_id)`; only `filter` changes on
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRule {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub environment_id: Uuid,
    pub organization_id: Uuid,
    pub filter: Value,
    pub trigger_type: TriggerType,
    /// The full trigger metadata as declared when the rule was created.
    pub trigger: TriggerMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
