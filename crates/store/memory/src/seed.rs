use serde::{Deserialize, Serialize};

use gantry_core::{
    Backend, BackendConfig, Certificate, Gateway, PluginBinding, ResourceVersion, Stage,
};

/// Initial catalog contents, typically loaded from a YAML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSeed {
    pub gateways: Vec<Gateway>,
    pub stages: Vec<Stage>,
    pub backends: Vec<Backend>,
    pub backend_configs: Vec<BackendConfig>,
    pub plugin_bindings: Vec<PluginBinding>,
    pub certificates: Vec<Certificate>,
    pub resource_versions: Vec<ResourceVersion>,
}
