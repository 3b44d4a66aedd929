use thiserror::Error;

use gantry_core::{BackendId, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// The snapshot's configuration is wrong; the operator must fix it.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Two backends mapped to one service id. Indicates a transformer bug.
    #[error("service id {id:?} is shared by backends {first} and {second}")]
    DuplicateServiceId {
        id: String,
        first: BackendId,
        second: BackendId,
    },

    #[error("malformed {kind} resource {id:?}: {reason}")]
    Malformed {
        kind: &'static str,
        id: String,
        reason: String,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TransformError {
    /// Fatal errors abort the publish task instead of being reported as a
    /// configuration problem.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Validation(_))
    }
}
