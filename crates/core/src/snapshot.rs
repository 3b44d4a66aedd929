use serde::{Deserialize, Serialize};

use crate::backend::{Backend, BackendConfig};
use crate::gateway::Gateway;
use crate::ids::BackendId;
use crate::plugin::{Certificate, PluginBinding};
use crate::resource::ResourceVersion;
use crate::stage::Stage;

/// A backend together with its configuration for the snapshot's stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageBackend {
    pub backend: Backend,
    pub config: BackendConfig,
}

/// Everything a transformer needs to render one release, loaded once at
/// distribution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseSnapshot {
    pub gateway: Gateway,
    pub stage: Stage,
    pub version: ResourceVersion,
    pub backends: Vec<StageBackend>,
    #[serde(default)]
    pub plugins: Vec<PluginBinding>,
    #[serde(default)]
    pub certificates: Vec<Certificate>,
}

impl ReleaseSnapshot {
    #[must_use]
    pub fn backend(&self, id: BackendId) -> Option<&StageBackend> {
        self.backends.iter().find(|b| b.backend.id == id)
    }
}
