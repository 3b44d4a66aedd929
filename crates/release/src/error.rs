use thiserror::Error;

use gantry_core::{ReleaseHistoryId, ValidationError};
use gantry_distributor::DistributeError;
use gantry_executor::TaskError;
use gantry_store::StoreError;

#[derive(Debug, Clone, Error)]
pub enum ReleaseError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The configuration cannot be published. When a history row was
    /// already created, its id is attached so callers can inspect events.
    #[error("validation failed: {error}")]
    Validation {
        release_history_id: Option<ReleaseHistoryId>,
        #[source]
        error: ValidationError,
    },

    /// Distribution ran and failed; the failure is recorded on the history.
    #[error("publish {release_history_id} failed: {message}")]
    PublishFailed {
        release_history_id: ReleaseHistoryId,
        message: String,
    },

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Distribute(#[from] DistributeError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ReleaseError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Release history the failure was recorded against, if any.
    pub fn release_history_id(&self) -> Option<ReleaseHistoryId> {
        match self {
            Self::Validation {
                release_history_id, ..
            } => *release_history_id,
            Self::PublishFailed {
                release_history_id, ..
            } => Some(*release_history_id),
            _ => None,
        }
    }
}

impl From<StoreError> for ReleaseError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Store(other),
        }
    }
}

impl From<ValidationError> for ReleaseError {
    fn from(error: ValidationError) -> Self {
        Self::Validation {
            release_history_id: None,
            error,
        }
    }
}
