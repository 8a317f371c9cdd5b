//! Application error type mapping to HTTP status codes and envelope format.
//!
//! Dispatch failures of any kind (unsupported source type, rejected
//! signature, ingestion failure) share one 500 response; callers cannot
//! tell them apart.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hookline_types::error::{DispatchError, ReconcileError, RepositoryError};
use hookline_types::trigger::ValidationIssue;

use crate::http::response::ApiResponse;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    /// Trigger metadata failed validation.
    Validation(Vec<ValidationIssue>),
    Dispatch(DispatchError),
    Reconcile(ReconcileError),
    Repository(RepositoryError),
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        AppError::Dispatch(e)
    }
}

impl From<ReconcileError> for AppError {
    fn from(e: ReconcileError) -> Self {
        AppError::Reconcile(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Repository(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, "NOT_FOUND", what, None),
            AppError::Validation(issues) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("workflow metadata has {} issue(s)", issues.len()),
                serde_json::to_value(&issues).ok(),
            ),
            AppError::Dispatch(e) => {
                tracing::warn!(error = %e, "webhook delivery failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "WEBHOOK_ERROR", e.to_string(), None)
            }
            AppError::Reconcile(e) => {
                tracing::error!(error = %e, "trigger reconciliation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "RECONCILE_ERROR", e.to_string(), None)
            }
            AppError::Repository(e) => {
                tracing::error!(error = %e, "storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", e.to_string(), None)
            }
        };

        (status, Json(ApiResponse::error(code, message, details))).into_response()
    }
}
