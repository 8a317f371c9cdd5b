//! Ingestion sink port.

use hookline_types::error::IngestError;
use hookline_types::event::CanonicalEvent;
use hookline_types::tenancy::Organization;

/// Receives canonical events on behalf of an organization.
///
/// Deduplication of repeated deliveries, if any, is the sink's concern.
pub trait EventSink: Send + Sync {
    fn ingest(
        &self,
        event: &CanonicalEvent,
        service: &str,
        organization: &Organization,
    ) -> impl std::future::Future<Output = Result<(), IngestError>> + Send;
}
