use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument};

use gantry_core::{Gateway, PluginMetadataSpec, ReleaseSnapshot, Stage};
use gantry_executor::RetryPolicy;
use gantry_registry::{Registry, RegistryEntry, RegistryError, RegistryLayout, RegistryPrefix};
use gantry_transform::{
    GatewayTransformer, GlobalTransformer, ReleaseMarker, ResourceKind, TransformContext,
    Transformer, WireResource, make_id, release_marker,
};

use crate::distributor::Distributor;
use crate::error::DistributeError;
use crate::target::{InstanceTarget, RevokeMode};

/// Cross-gateway plugin metadata, re-synced when publishing to the default
/// instance.
struct GlobalPlugins {
    instance: String,
    plugins: Arc<[PluginMetadataSpec]>,
}

/// Publishes a stage by syncing its registry prefix.
pub struct SharedInstanceDistributor {
    registry: Arc<dyn Registry>,
    layout: RegistryLayout,
    retry: RetryPolicy,
    global: Option<GlobalPlugins>,
}

impl SharedInstanceDistributor {
    pub fn new(registry: Arc<dyn Registry>, layout: RegistryLayout) -> Self {
        Self {
            registry,
            layout,
            retry: RetryPolicy::default(),
            global: None,
        }
    }

    /// Retry budget for whole-prefix syncs and deletes.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Also sync `plugins` to the global prefix of `default_instance`
    /// whenever a stage is published there.
    #[must_use]
    pub fn with_global_plugins(
        mut self,
        default_instance: impl Into<String>,
        plugins: Vec<PluginMetadataSpec>,
    ) -> Self {
        self.global = Some(GlobalPlugins {
            instance: default_instance.into(),
            plugins: plugins.into(),
        });
        self
    }

    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    pub fn layout(&self) -> &RegistryLayout {
        &self.layout
    }

    pub fn stage_prefix(
        &self,
        instance: &str,
        gateway: &str,
        stage: &str,
    ) -> Result<RegistryPrefix, DistributeError> {
        Ok(self.layout.stage_prefix(instance, gateway, stage)?)
    }

    /// Decode the release marker currently published for a stage, if any.
    pub async fn published_marker(
        &self,
        instance: &str,
        gateway: &str,
        stage: &str,
    ) -> Result<Option<ReleaseMarker>, DistributeError> {
        let prefix = self.stage_prefix(instance, gateway, stage)?;
        let key = prefix.key(
            ResourceKind::ReleaseMarker.as_str(),
            &make_id(&[gateway, stage, "release"]),
        );
        let mut entries = self.registry.scan(&prefix).await?;
        entries
            .remove(&key)
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|e| {
                    DistributeError::Fatal(format!("undecodable release marker at {key}: {e}"))
                })
            })
            .transpose()
    }

    /// Replace everything under `prefix`, retrying while writes fail.
    async fn sync(
        &self,
        prefix: &RegistryPrefix,
        entries: Vec<RegistryEntry>,
    ) -> Result<(), DistributeError> {
        let total = entries.len();
        self.retry
            .run("registry sync", DistributeError::is_retryable, |_| {
                let entries = entries.clone();
                async move {
                    let failed = self.registry.sync(prefix, entries).await?;
                    if failed.is_empty() {
                        return Ok(());
                    }
                    let keys: Vec<&str> = failed.iter().map(|f| f.key.as_str()).collect();
                    Err(DistributeError::Transient(format!(
                        "{} of {total} resources under {prefix} not written: {}",
                        failed.len(),
                        keys.join(", ")
                    )))
                }
            })
            .await?;
        debug!(%prefix, resources = total, "prefix synced");
        Ok(())
    }

    async fn sync_global(
        &self,
        target: &InstanceTarget,
        ctx: TransformContext,
    ) -> Result<(), DistributeError> {
        let Some(global) = self.global.as_ref().filter(|g| g.instance == target.name) else {
            return Ok(());
        };
        let prefix = self.layout.global_prefix(&target.name)?;
        let entries = entries(&GlobalTransformer::new(&global.plugins, ctx))?;
        self.sync(&prefix, entries).await
    }
}

/// Serialize every resource of `transformer` into registry entries.
fn entries(transformer: &dyn Transformer) -> Result<Vec<RegistryEntry>, DistributeError> {
    transformer
        .resources()
        .map(|resource| entry(&resource?))
        .collect()
}

fn entry(resource: &WireResource) -> Result<RegistryEntry, DistributeError> {
    Ok(RegistryEntry::new(
        resource.kind().as_str(),
        resource.id(),
        resource.to_json()?,
    ))
}

#[async_trait]
impl Distributor for SharedInstanceDistributor {
    #[instrument(
        skip_all,
        fields(
            gateway = %snapshot.gateway.name,
            stage = %snapshot.stage.name,
            instance = %target.name,
            publish_id = ctx.publish_id,
        )
    )]
    async fn distribute(
        &self,
        snapshot: &ReleaseSnapshot,
        target: &InstanceTarget,
        ctx: TransformContext,
    ) -> Result<(), DistributeError> {
        let prefix =
            self.stage_prefix(&target.name, &snapshot.gateway.name, &snapshot.stage.name)?;
        let entries = entries(&GatewayTransformer::new(snapshot, ctx)?)?;
        let count = entries.len();
        self.sync(&prefix, entries).await?;
        self.sync_global(target, ctx).await?;
        info!(%prefix, resources = count, "stage published");
        Ok(())
    }

    #[instrument(
        skip_all,
        fields(gateway = %gateway.name, stage = %stage.name, instance = %target.name)
    )]
    async fn revoke(
        &self,
        gateway: &Gateway,
        stage: &Stage,
        target: &InstanceTarget,
        mode: RevokeMode,
    ) -> Result<(), DistributeError> {
        let prefix = self.stage_prefix(&target.name, &gateway.name, &stage.name)?;
        let removed = self
            .retry
            .run("registry delete", RegistryError::is_retryable, |_| {
                self.registry.delete(&prefix)
            })
            .await?;
        if let RevokeMode::Republish { publish_id } = mode {
            let marker = release_marker(
                gateway,
                stage,
                None,
                TransformContext::new(publish_id, Utc::now()),
            );
            self.sync(&prefix, vec![entry(&marker)?]).await?;
        }
        info!(%prefix, removed, ?mode, "stage revoked");
        Ok(())
    }
}
