use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gantry_core::{
    ActivationStatus, Backend, BackendConfig, Certificate, Gateway, GatewayId, PluginBinding,
    ResourceVersion, ResourceVersionId, ResourceVersionSpec, Stage, StageId,
};

use crate::error::StoreError;

/// Read access to gateway configuration, plus the two writes the pipeline
/// owns: stage activation and resource-version creation.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_gateway(&self, id: GatewayId) -> Result<Option<Gateway>, StoreError>;

    async fn find_gateway(&self, name: &str) -> Result<Option<Gateway>, StoreError>;

    async fn get_stage(&self, id: StageId) -> Result<Option<Stage>, StoreError>;

    async fn find_stage(&self, gateway: GatewayId, name: &str)
    -> Result<Option<Stage>, StoreError>;

    async fn list_stages(&self, gateway: GatewayId) -> Result<Vec<Stage>, StoreError>;

    async fn set_stage_status(
        &self,
        stage: StageId,
        status: ActivationStatus,
    ) -> Result<(), StoreError>;

    async fn get_resource_version(
        &self,
        id: ResourceVersionId,
    ) -> Result<Option<ResourceVersion>, StoreError>;

    /// Look up a version by its label within a gateway.
    async fn find_resource_version(
        &self,
        gateway: GatewayId,
        version: &str,
    ) -> Result<Option<ResourceVersion>, StoreError>;

    /// Persist a new immutable version. Fails with [`StoreError::Conflict`]
    /// if the label is already used within the gateway.
    async fn create_resource_version(
        &self,
        gateway: GatewayId,
        spec: ResourceVersionSpec,
        created_by: &str,
        created_time: DateTime<Utc>,
    ) -> Result<ResourceVersion, StoreError>;

    async fn backends(&self, gateway: GatewayId) -> Result<Vec<Backend>, StoreError>;

    /// Configurations of every backend for one stage.
    async fn backend_configs(&self, stage: StageId) -> Result<Vec<BackendConfig>, StoreError>;

    /// Bindings scoped to `stage` plus every resource-scoped binding of
    /// `gateway`.
    async fn plugin_bindings(
        &self,
        gateway: GatewayId,
        stage: StageId,
    ) -> Result<Vec<PluginBinding>, StoreError>;

    async fn certificates(&self, stage: StageId) -> Result<Vec<Certificate>, StoreError>;
}
