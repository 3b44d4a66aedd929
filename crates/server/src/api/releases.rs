//! Resource version, publish, and rolling-update endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use gantry_core::{
    GatewayId, PublishSource, ReleaseHistoryId, ResourceVersionId, ResourceVersionSpec, StageId,
};
use gantry_release::PublishRequest;

use crate::error::ServerError;

use super::AppState;

fn default_actor() -> String {
    "api".to_owned()
}

/// Body of `POST /v1/gateways/{gateway_id}/resource-versions`.
#[derive(Debug, Deserialize)]
pub struct CreateResourceVersionBody {
    #[serde(flatten)]
    pub spec: ResourceVersionSpec,
    #[serde(default = "default_actor")]
    pub actor: String,
}

/// `POST /v1/gateways/{gateway_id}/resource-versions` -- freeze a new version.
pub async fn create_resource_version(
    State(state): State<AppState>,
    Path(gateway_id): Path<i64>,
    Json(body): Json<CreateResourceVersionBody>,
) -> Result<impl IntoResponse, ServerError> {
    let version = state
        .orchestrator
        .create_resource_version(GatewayId(gateway_id), body.spec, &body.actor)
        .await?;
    Ok((StatusCode::CREATED, Json(version)))
}

/// Body of `POST /v1/gateways/{gateway_id}/releases`.
#[derive(Debug, Deserialize)]
pub struct PublishBody {
    pub stage_id: StageId,
    pub resource_version_id: ResourceVersionId,
    #[serde(default)]
    pub comment: String,
    #[serde(default = "default_actor")]
    pub actor: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublishResponse {
    pub release_history_id: ReleaseHistoryId,
}

/// `POST /v1/gateways/{gateway_id}/releases` -- schedule a publish.
///
/// Answers `202` once the attempt is validated and queued; the outcome is
/// read from the history's event stream.
pub async fn publish(
    State(state): State<AppState>,
    Path(gateway_id): Path<i64>,
    Json(body): Json<PublishBody>,
) -> Result<impl IntoResponse, ServerError> {
    let request = PublishRequest::new(
        GatewayId(gateway_id),
        body.stage_id,
        body.resource_version_id,
        body.actor,
    )
    .with_comment(body.comment);
    let release_history_id = state.orchestrator.publish(request).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(PublishResponse { release_history_id }),
    ))
}

/// Body of `POST /v1/gateways/{gateway_id}/rolling-updates`.
#[derive(Debug, Deserialize)]
pub struct RollingUpdateBody {
    /// The catalog change that requires propagation.
    pub source: PublishSource,
    /// Limit the update to one stage; all stages of the gateway otherwise.
    pub stage_id: Option<StageId>,
    #[serde(default = "default_actor")]
    pub actor: String,
}

/// `POST /v1/gateways/{gateway_id}/rolling-updates` -- re-publish, revoke,
/// or delete every release in scope.
pub async fn rolling_update(
    State(state): State<AppState>,
    Path(gateway_id): Path<i64>,
    Json(body): Json<RollingUpdateBody>,
) -> Result<impl IntoResponse, ServerError> {
    let outcome = state
        .orchestrator
        .trigger_rolling_update(body.source, GatewayId(gateway_id), body.stage_id, &body.actor)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(outcome)))
}
