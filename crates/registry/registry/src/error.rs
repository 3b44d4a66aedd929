use thiserror::Error;

/// Errors from registry operations.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("invalid registry key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },
}

impl RegistryError {
    /// Returns `true` if the operation may succeed when tried again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout(_) | Self::Backend(_)
        )
    }
}
