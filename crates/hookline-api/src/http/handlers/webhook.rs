//! Inbound provider webhook deliveries.

use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, Uri};
use hookline_core::repository::external_source::ExternalSourceRepository;
use hookline_core::repository::tenancy::OrganizationRepository;
use hookline_core::service::dispatcher::DispatchOutcome;
use hookline_observe::attrs;
use hookline_types::request::RawRequest;
use tracing::Instrument;
use uuid::Uuid;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/webhooks/{service}/{external_source_id}
///
/// Hands the delivery to the dispatcher. Handled and ignored deliveries are
/// both 200; the `status` field of the data tells them apart.
pub async fn receive_webhook(
    State(state): State<AppState>,
    Path((service, external_source_id)): Path<(String, String)>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<DispatchOutcome>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let raw = RawRequest {
        method: method.to_string(),
        url: uri.to_string(),
        headers: headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect(),
        body: body.to_vec(),
    };

    let span = tracing::info_span!(
        attrs::SPAN_DISPATCH,
        source_id = tracing::field::Empty,
        service = %service,
        request_id = %request_id,
    );
    let outcome = dispatch(&state, &service, &external_source_id, raw)
        .instrument(span)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(outcome, request_id, elapsed)))
}

async fn dispatch(
    state: &AppState,
    service: &str,
    external_source_id: &str,
    raw: RawRequest,
) -> Result<DispatchOutcome, AppError> {
    let not_found =
        || AppError::NotFound(format!("External source not found: {external_source_id}"));
    // A malformed id cannot name a stored source.
    let source_id = Uuid::parse_str(external_source_id).map_err(|_| not_found())?;
    tracing::Span::current().record(attrs::SOURCE_ID, tracing::field::display(source_id));

    let external_source = state.sources.get_by_id(&source_id).await?.ok_or_else(not_found)?;
    let organization = state
        .organizations
        .get_by_id(&external_source.organization_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Organization not found: {}",
                external_source.organization_id
            ))
        })?;

    let outcome = state
        .dispatcher
        .call(&external_source, &organization, service, raw)
        .await?;

    match &outcome {
        DispatchOutcome::Ingested { event_ids } => {
            tracing::info!(events = event_ids.len(), "webhook delivery ingested");
        }
        DispatchOutcome::Ignored { reason } => {
            tracing::info!(reason = %reason, "webhook delivery ignored");
        }
    }
    Ok(outcome)
}
