//! Organization and runtime environment types.
//!
//! Every persisted entity belongs to an organization. Event rules are further
//! scoped to a runtime environment (e.g. "dev", "live").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant owning workflows, external sources and connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    /// Unique, URL-safe identifier.
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    /// Create a new organization with a fresh UUIDv7.
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            slug: slug.into(),
            created_at: Utc::now(),
        }
    }
}

/// A deployment environment inside an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeEnvironment {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Unique within the organization.
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl RuntimeEnvironment {
    pub fn new(organization_id: Uuid, slug: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            organization_id,
            slug: slug.into(),
            created_at: Utc::now(),
        }
    }
}
