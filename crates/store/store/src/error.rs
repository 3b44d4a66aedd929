use thiserror::Error;

/// Errors from the persistence contracts.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns `true` if the operation may succeed when tried again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
