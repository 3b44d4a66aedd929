use std::time::Duration;

use serde::Deserialize;

/// Chart repository and deployment service of dedicated instances.
///
/// Dedicated `[[instances]]` require `base_url` to be set.
#[derive(Debug, Deserialize)]
pub struct ChartServiceConfig {
    pub base_url: Option<String>,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl Default for ChartServiceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl ChartServiceConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_connect_timeout() -> u64 {
    5_000
}

fn default_request_timeout() -> u64 {
    30_000
}

/// Where the catalog of the in-memory store comes from.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogConfig {
    /// YAML file with gateways, stages, backends, and resource versions
    /// loaded at startup.
    pub seed: Option<String>,
}
