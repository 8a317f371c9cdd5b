use thiserror::Error;

/// Errors from repository operations (used by trait definitions in hookline-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors raised by a provider webhook integration.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// The source document does not match the provider's expected shape.
    #[error("invalid source for '{service}': {reason}")]
    InvalidSource { service: String, reason: String },

    /// The provider API answered with a non-success status.
    #[error("provider API error {status}: {status_text}")]
    ProviderApi { status: u16, status_text: String },

    /// The request never produced a provider response.
    #[error("provider transport error: {0}")]
    Transport(String),

    /// The integration does not support this operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

/// Errors from publishing to the message broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("failed to publish to '{topic}': {reason}")]
    Publish { topic: String, reason: String },
}

/// Errors from the ingestion sink.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to ingest event '{event_id}': {reason}")]
    Storage { event_id: String, reason: String },
}

/// Hard failures of an inbound webhook dispatch.
///
/// An unsupported service without manual registration is *not* an error;
/// it is reported as an ignored outcome instead.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("could not handle external source with unsupported type: {0}")]
    UnsupportedSourceType(String),

    #[error("webhook rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Ingestion(#[from] IngestError),
}

/// Hard failures of trigger registration. Validation problems are an
/// outcome of reconciliation, not an error.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),

    #[error("integration error: {0}")]
    Integration(#[from] IntegrationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_unsupported_source_type_display() {
        let err = DispatchError::UnsupportedSourceType("POLLING".to_string());
        assert!(err.to_string().contains("unsupported type: POLLING"));
    }

    #[test]
    fn test_provider_api_error_carries_status_text() {
        let err = IntegrationError::ProviderApi {
            status: 422,
            status_text: "Unprocessable Entity".to_string(),
        };
        assert_eq!(err.to_string(), "provider API error 422: Unprocessable Entity");
    }

    #[test]
    fn test_reconcile_error_from_repository_error() {
        let err: ReconcileError = RepositoryError::NotFound.into();
        assert!(matches!(err, ReconcileError::Storage(RepositoryError::NotFound)));
    }
}
