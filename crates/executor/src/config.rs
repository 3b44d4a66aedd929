use std::time::Duration;

use crate::retry::RetryPolicy;

/// Configuration for the [`TaskExecutor`](crate::TaskExecutor).
///
/// ```
/// use gantry_executor::ExecutorConfig;
///
/// let config = ExecutorConfig::default();
/// assert_eq!(config.retry.max_retries, 3);
/// assert_eq!(config.max_concurrent, 16);
/// ```
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Retry budget for tasks failing with a retryable error.
    pub retry: RetryPolicy,
    /// Maximum wall-clock time of a single task attempt.
    pub task_timeout: Duration,
    /// Maximum number of tasks running concurrently.
    pub max_concurrent: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            task_timeout: Duration::from_secs(300),
            max_concurrent: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ExecutorConfig::default();
        assert_eq!(cfg.retry.max_retries, 3);
        assert_eq!(cfg.task_timeout, Duration::from_secs(300));
        assert_eq!(cfg.max_concurrent, 16);
    }
}
