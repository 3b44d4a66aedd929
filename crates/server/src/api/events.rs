//! Publish event endpoints.
//!
//! Operators read the backfilled event stream of an attempt; data-plane
//! instances report the parse, apply, and load steps.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use gantry_core::{PublishStatus, PublishStep, ReleaseHistoryId};

use crate::error::ServerError;

use super::AppState;

/// `GET /v1/release-histories/{id}/events` -- step template, events, and
/// overall status of one attempt.
pub async fn list_events(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServerError> {
    let view = state
        .orchestrator
        .query_events(ReleaseHistoryId(id))
        .await?;
    Ok(Json(view))
}

/// Body of a data-plane report.
#[derive(Debug, Deserialize)]
pub struct ReportEventBody {
    pub step: PublishStep,
    pub status: PublishStatus,
    #[serde(default)]
    pub detail: serde_json::Value,
}

/// `POST /v1/release-histories/{id}/events` -- record a data-plane report.
pub async fn report_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ReportEventBody>,
) -> Result<impl IntoResponse, ServerError> {
    let event = state
        .orchestrator
        .report_event(ReleaseHistoryId(id), body.step, body.status, body.detail)
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}
