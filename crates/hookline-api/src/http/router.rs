//! Axum router configuration with middleware.
//!
//! Webhook and workflow routes live under `/api/v1/`; `/health` sits at the
//! root. Middleware: CORS, request tracing.

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/webhooks/{service}/{external_source_id}",
            post(handlers::webhook::receive_webhook),
        )
        .route(
            "/orgs/{org}/envs/{env}/workflows/{slug}",
            put(handlers::workflow::register_workflow),
        );

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
