use std::time::Duration;

use gantry_ledger::ReducerConfig;

/// Timing and placement settings of the orchestrator.
///
/// ```
/// use std::time::Duration;
/// use gantry_release::ReleaseConfig;
///
/// let config = ReleaseConfig::default();
/// assert_eq!(config.wait_cap(), Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseConfig {
    /// Expected minimum spacing between publishes of one stage.
    pub min_release_interval: Duration,
    /// How often a queued publish re-checks the previous attempt.
    pub wait_poll_interval: Duration,
    /// A queued publish waits at most `min_release_interval * wait_cap_factor`.
    pub wait_cap_factor: u32,
    /// Instance used by stages without a dedicated one.
    pub default_instance: String,
    pub reducer: ReducerConfig,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            min_release_interval: Duration::from_secs(3),
            wait_poll_interval: Duration::from_millis(100),
            wait_cap_factor: 10,
            default_instance: "default".to_owned(),
            reducer: ReducerConfig::default(),
        }
    }
}

impl ReleaseConfig {
    pub fn wait_cap(&self) -> Duration {
        self.min_release_interval * self.wait_cap_factor
    }
}
