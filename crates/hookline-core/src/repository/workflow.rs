//! Workflow repository trait definition.

use hookline_types::error::RepositoryError;
use hookline_types::trigger::TriggerType;
use hookline_types::workflow::{Workflow, WorkflowStatus};
use serde_json::Value;
use uuid::Uuid;

/// Input of a workflow upsert keyed by `(organization_id, slug)`.
#[derive(Debug, Clone)]
pub struct WorkflowUpsert {
    pub organization_id: Uuid,
    pub slug: String,
    pub title: String,
    pub package: Value,
    pub trigger_type: TriggerType,
    /// Status written only when the row is first inserted.
    pub initial_status: WorkflowStatus,
}

/// Repository trait for workflow persistence.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait WorkflowRepository: Send + Sync {
    /// Insert the workflow, or update `title`, `package` and `trigger_type`
    /// of the existing row. Status and external source link are untouched
    /// on update.
    fn upsert(
        &self,
        upsert: &WorkflowUpsert,
    ) -> impl std::future::Future<Output = Result<Workflow, RepositoryError>> + Send;

    fn get_by_id(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Workflow>, RepositoryError>> + Send;

    fn get_by_slug(
        &self,
        organization_id: &Uuid,
        slug: &str,
    ) -> impl std::future::Future<Output = Result<Option<Workflow>, RepositoryError>> + Send;

    /// Point the workflow at its external source.
    fn link_external_source(
        &self,
        workflow_id: &Uuid,
        external_source_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Move every workflow linked to the source to `READY`.
    /// Returns the number of workflows updated.
    fn mark_ready_for_source(
        &self,
        external_source_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
