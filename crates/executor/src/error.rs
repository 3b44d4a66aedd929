use std::time::Duration;

use thiserror::Error;

/// Failure of one background task attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Environment flakiness; the executor runs the task again.
    #[error("retryable: {0}")]
    Retryable(String),

    /// A bug or broken invariant; the task is aborted without retry.
    #[error("fatal: {0}")]
    Fatal(String),

    #[error("task timed out after {0:?}")]
    TimedOut(Duration),

    #[error("executor is shut down")]
    Closed,
}

impl TaskError {
    /// Returns `true` if running the task again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_) | Self::TimedOut(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(TaskError::Retryable("x".into()).is_retryable());
        assert!(TaskError::TimedOut(Duration::from_secs(1)).is_retryable());
        assert!(!TaskError::Fatal("x".into()).is_retryable());
        assert!(!TaskError::Closed.is_retryable());
    }
}
