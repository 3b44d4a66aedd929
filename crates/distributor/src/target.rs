use serde::{Deserialize, Serialize};

/// Where a dedicated instance's chart is pushed and deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartTarget {
    /// Chart repository project.
    pub project: String,
    pub cluster: String,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstanceKind {
    /// Reads a prefix of the shared registry.
    Shared,
    /// Runs from its own chart deployment.
    Dedicated(ChartTarget),
}

/// A data-plane instance a stage is published to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceTarget {
    pub name: String,
    #[serde(flatten)]
    pub kind: InstanceKind,
}

impl InstanceTarget {
    pub fn shared(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: InstanceKind::Shared,
        }
    }

    pub fn dedicated(name: impl Into<String>, chart: ChartTarget) -> Self {
        Self {
            name: name.into(),
            kind: InstanceKind::Dedicated(chart),
        }
    }
}

/// What a revoke leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeMode {
    /// Remove everything. Used when the stage or gateway is deleted.
    Delete,
    /// Remove everything, then publish a marker-only set recording the
    /// revoke under `publish_id`.
    Republish { publish_id: i64 },
}
