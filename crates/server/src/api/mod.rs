pub mod events;
pub mod health;
pub mod releases;
pub mod stages;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use gantry_release::ReleaseOrchestrator;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ReleaseOrchestrator,
}

/// Build the Axum router with all API routes and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/v1/gateways/{gateway_id}/resource-versions",
            post(releases::create_resource_version),
        )
        .route("/v1/gateways/{gateway_id}/releases", post(releases::publish))
        .route(
            "/v1/gateways/{gateway_id}/rolling-updates",
            post(releases::rolling_update),
        )
        .route(
            "/v1/gateways/{gateway_id}/stages/{stage_id}/marker",
            get(stages::marker),
        )
        .route("/v1/stages/status", get(stages::status))
        .route(
            "/v1/release-histories/{id}/events",
            get(events::list_events).post(events::report_event),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
