use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::PublishStatus;
use crate::ids::{GatewayId, ReleaseHistoryId, ResourceVersionId, StageId};

/// Why a publish attempt was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishSource {
    VersionPublish,
    CliSync,
    GatewayEnable,
    GatewayDisable,
    GatewayDelete,
    StageDisable,
    StageDelete,
    StageUpdate,
    BackendUpdate,
    PluginBind,
    PluginUpdate,
    PluginUnbind,
}

/// What the orchestrator does for a [`PublishSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Publish an explicitly chosen resource version.
    Publish,
    /// Re-publish the current version of every affected release.
    RollingUpdate,
    /// Revoke and republish a marker; the stage becomes inactive.
    RevokeDisable,
    /// Delete everything under the stage prefix.
    RevokeDelete,
}

impl PublishSource {
    #[must_use]
    pub fn trigger_kind(self) -> TriggerKind {
        match self {
            Self::VersionPublish | Self::CliSync => TriggerKind::Publish,
            Self::GatewayEnable
            | Self::StageUpdate
            | Self::BackendUpdate
            | Self::PluginBind
            | Self::PluginUpdate
            | Self::PluginUnbind => TriggerKind::RollingUpdate,
            Self::GatewayDisable | Self::StageDisable => TriggerKind::RevokeDisable,
            Self::GatewayDelete | Self::StageDelete => TriggerKind::RevokeDelete,
        }
    }

    /// Whether the source applies to a whole gateway rather than one stage.
    #[must_use]
    pub fn is_gateway_scoped(self) -> bool {
        matches!(
            self,
            Self::GatewayEnable | Self::GatewayDisable | Self::GatewayDelete
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VersionPublish => "version_publish",
            Self::CliSync => "cli_sync",
            Self::GatewayEnable => "gateway_enable",
            Self::GatewayDisable => "gateway_disable",
            Self::GatewayDelete => "gateway_delete",
            Self::StageDisable => "stage_disable",
            Self::StageDelete => "stage_delete",
            Self::StageUpdate => "stage_update",
            Self::BackendUpdate => "backend_update",
            Self::PluginBind => "plugin_bind",
            Self::PluginUpdate => "plugin_update",
            Self::PluginUnbind => "plugin_unbind",
        }
    }
}

impl std::fmt::Display for PublishSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The current `(gateway, stage) -> resource version` pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub gateway_id: GatewayId,
    pub stage_id: StageId,
    pub resource_version_id: ResourceVersionId,
    pub comment: String,
    pub updated_by: String,
    pub updated_time: DateTime<Utc>,
}

/// One publish attempt. Only `status` changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseHistory {
    pub id: ReleaseHistoryId,
    pub gateway_id: GatewayId,
    pub stage_id: StageId,
    pub resource_version_id: ResourceVersionId,
    pub source: PublishSource,
    pub comment: String,
    pub created_by: String,
    pub created_time: DateTime<Utc>,
    /// Cached status; authoritative only once terminal.
    pub status: PublishStatus,
}

impl ReleaseHistory {
    /// Publish id carried on the wire. Equal to the history id.
    #[must_use]
    pub fn publish_id(&self) -> i64 {
        self.id.get()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReleaseHistory {
    pub gateway_id: GatewayId,
    pub stage_id: StageId,
    pub resource_version_id: ResourceVersionId,
    pub source: PublishSource,
    pub comment: String,
    pub created_by: String,
    pub created_time: DateTime<Utc>,
}
