use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use gantry_release::ReleaseError;
use gantry_store::StoreError;

/// Errors that can occur when running the Gantry server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A malformed request the handlers rejected before reaching the
    /// orchestrator.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// An orchestrator error surfaced through the API.
    #[error(transparent)]
    Release(#[from] ReleaseError),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Release(err) => match err {
                ReleaseError::NotFound { .. } => StatusCode::NOT_FOUND,
                ReleaseError::Validation { .. } => StatusCode::BAD_REQUEST,
                ReleaseError::PublishFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                ReleaseError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
                ReleaseError::Store(_)
                | ReleaseError::Distribute(_)
                | ReleaseError::Task(_)
                | ReleaseError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        // Failures recorded against a history carry its id so callers can
        // poll the event stream.
        let history_id = match &self {
            Self::Release(err) => err.release_history_id(),
            _ => None,
        };
        let body = match history_id {
            Some(id) => serde_json::json!({ "error": self.to_string(), "release_history_id": id }),
            None => serde_json::json!({ "error": self.to_string() }),
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use gantry_core::{ReleaseHistoryId, ValidationError};

    use super::*;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_with_history_carries_its_id() {
        let err = ServerError::from(ReleaseError::Validation {
            release_history_id: Some(ReleaseHistoryId(7)),
            error: ValidationError::Other("no hosts".into()),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_of(response).await;
        assert_eq!(body["release_history_id"], 7);
        assert!(body["error"].as_str().unwrap().contains("no hosts"));
    }

    #[tokio::test]
    async fn not_found_has_no_history() {
        let err = ServerError::from(ReleaseError::not_found("stage", 3));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_of(response).await;
        assert!(body.get("release_history_id").is_none());
    }

    #[test]
    fn status_mapping() {
        let conflict = ServerError::from(ReleaseError::Store(StoreError::Conflict(
            "version 1.0.0 exists".into(),
        )));
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let storage = ServerError::from(ReleaseError::Store(StoreError::Storage("down".into())));
        assert_eq!(storage.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let failed = ServerError::from(ReleaseError::PublishFailed {
            release_history_id: ReleaseHistoryId(2),
            message: "registry unavailable".into(),
        });
        assert_eq!(failed.status(), StatusCode::UNPROCESSABLE_ENTITY);

        assert_eq!(
            ServerError::BadRequest("stage_ids".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
