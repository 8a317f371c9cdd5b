//! External source repository trait definition.

use hookline_types::error::RepositoryError;
use hookline_types::source::{ExternalSource, ExternalSourceStatus};
use serde_json::Value;
use uuid::Uuid;

/// Input of an external source upsert keyed by `(organization_id, key)`.
#[derive(Debug, Clone)]
pub struct ExternalSourceUpsert {
    pub organization_id: Uuid,
    pub key: String,
    pub service: String,
    pub source: Value,
    pub connection_id: Option<Uuid>,
    pub manual_registration: bool,
}

/// Repository trait for external source persistence.
pub trait ExternalSourceRepository: Send + Sync {
    /// Insert a `WEBHOOK` source in status `CREATED` with a freshly minted
    /// secret, or, when `(organization_id, key)` exists, replace its
    /// `source` document and backfill `connection_id` only if it is
    /// currently null. The secret never changes after insert.
    fn upsert(
        &self,
        upsert: &ExternalSourceUpsert,
    ) -> impl std::future::Future<Output = Result<ExternalSource, RepositoryError>> + Send;

    fn get_by_id(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ExternalSource>, RepositoryError>> + Send;

    /// All sources of an organization, oldest first.
    fn list(
        &self,
        organization_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ExternalSource>, RepositoryError>> + Send;

    fn update_status(
        &self,
        id: &Uuid,
        status: ExternalSourceStatus,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
