//! Workflow trigger registration.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use hookline_core::repository::tenancy::{EnvironmentRepository, OrganizationRepository};
use hookline_core::service::reconciler::ReconcileOutcome;
use hookline_observe::attrs;
use serde_json::{Value, json};
use tracing::Instrument;
use uuid::Uuid;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// PUT /api/v1/orgs/{org}/envs/{env}/workflows/{slug}
///
/// Body: the workflow metadata (`name`, `package`, `trigger`).
pub async fn register_workflow(
    State(state): State<AppState>,
    Path((org, env, slug)): Path<(String, String, String)>,
    Json(payload): Json<Value>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let span = tracing::info_span!(
        attrs::SPAN_RECONCILE,
        organization = %org,
        environment = %env,
        slug = %slug,
        request_id = %request_id,
    );
    let workflow_id = reconcile(&state, &org, &env, &slug, &payload)
        .instrument(span)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        json!({ "workflow_id": workflow_id }),
        request_id,
        elapsed,
    )))
}

async fn reconcile(
    state: &AppState,
    org: &str,
    env: &str,
    slug: &str,
    payload: &Value,
) -> Result<Uuid, AppError> {
    let organization = state
        .organizations
        .get_by_slug(org)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Organization not found: {org}")))?;
    let environment = state
        .environments
        .get_by_slug(&organization.id, env)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Environment not found: {env}")))?;

    match state
        .reconciler
        .call(slug, payload, &organization, &environment)
        .await?
    {
        ReconcileOutcome::Success { workflow_id } => Ok(workflow_id),
        ReconcileOutcome::ValidationError { issues } => Err(AppError::Validation(issues)),
    }
}
