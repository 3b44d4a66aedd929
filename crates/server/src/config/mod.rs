mod instances;
mod registry;
mod release;
mod server;

#[cfg(test)]
mod tests;

pub use instances::*;
pub use registry::*;
pub use release::*;
pub use server::*;

use std::path::Path;

use serde::Deserialize;

use gantry_core::PluginMetadataSpec;
use gantry_distributor::InstanceTarget;

use crate::error::ServerError;

/// Top-level configuration for the Gantry server, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct GantryConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Shared-instance registry backend.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Orchestrator timing.
    #[serde(default)]
    pub release: ReleaseServerConfig,
    /// Worker pool of background publish tasks.
    #[serde(default)]
    pub executor: ExecutorServerConfig,
    /// Data-plane instances stages may be bound to. Stages without an
    /// instance use `release.default_instance`, which is shared unless
    /// listed here.
    #[serde(default)]
    pub instances: Vec<InstanceTarget>,
    /// Chart service of dedicated instances.
    #[serde(default)]
    pub chart: ChartServiceConfig,
    /// Plugin metadata synced to the default instance on every publish.
    #[serde(default)]
    pub global_plugin_metadata: Vec<PluginMetadataSpec>,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl GantryConfig {
    /// Read the configuration at `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let path = path.as_ref();
        if !path.exists() {
            return Self::parse("");
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ServerError> {
        toml::from_str(contents).map_err(|e| ServerError::Config(e.to_string()))
    }
}
