use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use gantry_core::{GatewayId, StageId};
use gantry_release::StageStatus;

use crate::error::ServerError;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Comma-separated stage ids, e.g. `1,2,3`.
    pub stage_ids: String,
}

fn parse_stage_ids(raw: &str) -> Result<Vec<StageId>, ServerError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map(StageId)
                .map_err(|_| ServerError::BadRequest(format!("invalid stage id {s:?}")))
        })
        .collect()
}

/// `GET /v1/stages/status?stage_ids=1,2` -- latest attempt of each stage.
pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<BTreeMap<StageId, StageStatus>>, ServerError> {
    let stage_ids = parse_stage_ids(&query.stage_ids)?;
    if stage_ids.is_empty() {
        return Err(ServerError::BadRequest("stage_ids is empty".into()));
    }
    Ok(Json(state.orchestrator.query_status(&stage_ids).await?))
}

/// `GET /v1/gateways/{gateway_id}/stages/{stage_id}/marker` -- the release
/// marker currently in the registry, for drift checks against the latest
/// history. `null` when nothing is published.
pub async fn marker(
    State(state): State<AppState>,
    Path((gateway_id, stage_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ServerError> {
    let marker = state
        .orchestrator
        .published_marker(GatewayId(gateway_id), StageId(stage_id))
        .await?;
    Ok(Json(marker))
}
