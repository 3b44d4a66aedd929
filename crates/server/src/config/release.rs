use std::time::Duration;

use serde::Deserialize;

use gantry_executor::RetryPolicy;
use gantry_ledger::ReducerConfig;
use gantry_release::ReleaseConfig;

/// Publish timing of the release orchestrator.
#[derive(Debug, Deserialize)]
pub struct ReleaseServerConfig {
    /// Expected minimum spacing between publishes of one stage.
    #[serde(default = "default_min_release_interval")]
    pub min_release_interval_ms: u64,
    /// Poll interval of a publish queued behind a running one.
    #[serde(default = "default_wait_poll_interval")]
    pub wait_poll_interval_ms: u64,
    /// A queued publish proceeds after `min_release_interval_ms * wait_cap_factor`.
    #[serde(default = "default_wait_cap_factor")]
    pub wait_cap_factor: u32,
    /// How long an unfinished step may go without a report before the
    /// attempt counts as failed.
    #[serde(default = "default_event_grace_period")]
    pub event_grace_period_seconds: u64,
    /// Shared instance of stages that name no instance.
    #[serde(default = "default_instance")]
    pub default_instance: String,
}

impl Default for ReleaseServerConfig {
    fn default() -> Self {
        Self {
            min_release_interval_ms: default_min_release_interval(),
            wait_poll_interval_ms: default_wait_poll_interval(),
            wait_cap_factor: default_wait_cap_factor(),
            event_grace_period_seconds: default_event_grace_period(),
            default_instance: default_instance(),
        }
    }
}

impl ReleaseServerConfig {
    pub fn to_release_config(&self) -> ReleaseConfig {
        ReleaseConfig {
            min_release_interval: Duration::from_millis(self.min_release_interval_ms),
            wait_poll_interval: Duration::from_millis(self.wait_poll_interval_ms),
            wait_cap_factor: self.wait_cap_factor,
            default_instance: self.default_instance.clone(),
            reducer: ReducerConfig {
                grace_period: Duration::from_secs(self.event_grace_period_seconds),
            },
        }
    }
}

fn default_min_release_interval() -> u64 {
    3_000
}

fn default_wait_poll_interval() -> u64 {
    100
}

fn default_wait_cap_factor() -> u32 {
    10
}

fn default_event_grace_period() -> u64 {
    600
}

fn default_instance() -> String {
    "default".to_owned()
}

/// Worker pool running distribute and revoke tasks.
#[derive(Debug, Default, Deserialize)]
pub struct ExecutorServerConfig {
    /// Maximum number of tasks running concurrently.
    pub max_concurrent: Option<usize>,
    /// Retries of a task that failed with a retryable error.
    pub max_retries: Option<u32>,
    /// Wall-clock limit of one task attempt in seconds.
    pub task_timeout_seconds: Option<u64>,
}

impl ExecutorServerConfig {
    pub fn to_executor_config(&self) -> gantry_executor::ExecutorConfig {
        let defaults = gantry_executor::ExecutorConfig::default();
        gantry_executor::ExecutorConfig {
            retry: RetryPolicy {
                max_retries: self.max_retries.unwrap_or(defaults.retry.max_retries),
                ..defaults.retry
            },
            task_timeout: self
                .task_timeout_seconds
                .map_or(defaults.task_timeout, Duration::from_secs),
            max_concurrent: self.max_concurrent.unwrap_or(defaults.max_concurrent),
        }
    }
}
