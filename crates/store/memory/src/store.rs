use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use gantry_core::{
    ActivationStatus, Backend, BackendConfig, BackendId, Certificate, Gateway, GatewayId,
    NewPublishEvent, NewReleaseHistory, PluginBinding, PluginScope, PublishEvent, PublishEventId,
    PublishStatus, Release, ReleaseHistory, ReleaseHistoryId, ResourceVersion, ResourceVersionId,
    ResourceVersionSpec, Stage, StageId,
};
use gantry_store::{CatalogStore, EventLedger, ReleaseStore, StoreError};

use crate::seed::CatalogSeed;

/// In-memory implementation of every persistence contract, backed by
/// `DashMap`. Suitable for development, the CLI, and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    gateways: DashMap<GatewayId, Gateway>,
    stages: DashMap<StageId, Stage>,
    backends: DashMap<BackendId, Backend>,
    backend_configs: DashMap<(StageId, BackendId), BackendConfig>,
    plugin_bindings: DashMap<GatewayId, Vec<PluginBinding>>,
    certificates: DashMap<StageId, Vec<Certificate>>,
    versions: DashMap<ResourceVersionId, ResourceVersion>,
    releases: DashMap<(GatewayId, StageId), Release>,
    histories: DashMap<ReleaseHistoryId, ReleaseHistory>,
    events: DashMap<ReleaseHistoryId, Vec<PublishEvent>>,
    next_version_id: AtomicI64,
    next_history_id: AtomicI64,
    next_event_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: CatalogSeed) -> Self {
        let store = Self::new();
        store.load(seed);
        store
    }

    /// Insert every object of `seed`, replacing objects with the same id.
    pub fn load(&self, seed: CatalogSeed) {
        for gateway in seed.gateways {
            self.insert_gateway(gateway);
        }
        for stage in seed.stages {
            self.insert_stage(stage);
        }
        for backend in seed.backends {
            self.insert_backend(backend);
        }
        for config in seed.backend_configs {
            self.insert_backend_config(config);
        }
        for binding in seed.plugin_bindings {
            self.insert_plugin_binding(binding);
        }
        for certificate in seed.certificates {
            self.insert_certificate(certificate);
        }
        for version in seed.resource_versions {
            self.next_version_id
                .fetch_max(version.id.get(), Ordering::SeqCst);
            self.versions.insert(version.id, version);
        }
    }

    pub fn insert_gateway(&self, gateway: Gateway) {
        self.gateways.insert(gateway.id, gateway);
    }

    pub fn set_gateway_status(&self, id: GatewayId, status: ActivationStatus) {
        if let Some(mut gateway) = self.gateways.get_mut(&id) {
            gateway.status = status;
        }
    }

    pub fn insert_stage(&self, stage: Stage) {
        self.stages.insert(stage.id, stage);
    }

    /// Replace a stage's variables, as the admin layer would on edit.
    pub fn set_stage_var(&self, id: StageId, key: impl Into<String>, value: impl Into<String>) {
        if let Some(mut stage) = self.stages.get_mut(&id) {
            stage.vars.insert(key.into(), value.into());
        }
    }

    pub fn insert_backend(&self, backend: Backend) {
        self.backends.insert(backend.id, backend);
    }

    pub fn insert_backend_config(&self, config: BackendConfig) {
        self.backend_configs
            .insert((config.stage_id, config.backend_id), config);
    }

    pub fn insert_plugin_binding(&self, binding: PluginBinding) {
        let mut bindings = self.plugin_bindings.entry(binding.gateway_id).or_default();
        bindings.retain(|b| !(b.scope == binding.scope && b.plugin_type == binding.plugin_type));
        bindings.push(binding);
    }

    pub fn remove_plugin_binding(&self, gateway: GatewayId, scope: PluginScope, plugin_type: &str) {
        if let Some(mut bindings) = self.plugin_bindings.get_mut(&gateway) {
            bindings.retain(|b| !(b.scope == scope && b.plugin_type == plugin_type));
        }
    }

    pub fn insert_certificate(&self, certificate: Certificate) {
        let mut certs = self.certificates.entry(certificate.stage_id).or_default();
        certs.retain(|c| c.id != certificate.id);
        certs.push(certificate);
    }

    fn next_id(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn latest_matching(
        &self,
        stage: StageId,
        filter: impl Fn(&ReleaseHistory) -> bool,
    ) -> Option<ReleaseHistory> {
        self.histories
            .iter()
            .filter(|h| h.stage_id == stage && filter(h.value()))
            .max_by_key(|h| h.id)
            .map(|h| h.value().clone())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_gateway(&self, id: GatewayId) -> Result<Option<Gateway>, StoreError> {
        Ok(self.gateways.get(&id).map(|g| g.value().clone()))
    }

    async fn find_gateway(&self, name: &str) -> Result<Option<Gateway>, StoreError> {
        Ok(self
            .gateways
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.value().clone()))
    }

    async fn get_stage(&self, id: StageId) -> Result<Option<Stage>, StoreError> {
        Ok(self.stages.get(&id).map(|s| s.value().clone()))
    }

    async fn find_stage(
        &self,
        gateway: GatewayId,
        name: &str,
    ) -> Result<Option<Stage>, StoreError> {
        Ok(self
            .stages
            .iter()
            .find(|s| s.gateway_id == gateway && s.name == name)
            .map(|s| s.value().clone()))
    }

    async fn list_stages(&self, gateway: GatewayId) -> Result<Vec<Stage>, StoreError> {
        let mut stages: Vec<Stage> = self
            .stages
            .iter()
            .filter(|s| s.gateway_id == gateway)
            .map(|s| s.value().clone())
            .collect();
        stages.sort_by_key(|s| s.id);
        Ok(stages)
    }

    async fn set_stage_status(
        &self,
        stage: StageId,
        status: ActivationStatus,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .stages
            .get_mut(&stage)
            .ok_or_else(|| StoreError::not_found("stage", stage))?;
        entry.status = status;
        Ok(())
    }

    async fn get_resource_version(
        &self,
        id: ResourceVersionId,
    ) -> Result<Option<ResourceVersion>, StoreError> {
        Ok(self.versions.get(&id).map(|v| v.value().clone()))
    }

    async fn find_resource_version(
        &self,
        gateway: GatewayId,
        version: &str,
    ) -> Result<Option<ResourceVersion>, StoreError> {
        Ok(self
            .versions
            .iter()
            .find(|v| v.gateway_id == gateway && v.version == version)
            .map(|v| v.value().clone()))
    }

    async fn create_resource_version(
        &self,
        gateway: GatewayId,
        spec: ResourceVersionSpec,
        created_by: &str,
        created_time: DateTime<Utc>,
    ) -> Result<ResourceVersion, StoreError> {
        if self.find_resource_version(gateway, &spec.version).await?.is_some() {
            return Err(StoreError::Conflict(format!(
                "resource version {:?} already exists for gateway {gateway}",
                spec.version
            )));
        }
        let version = ResourceVersion {
            id: ResourceVersionId(Self::next_id(&self.next_version_id)),
            gateway_id: gateway,
            version: spec.version,
            comment: spec.comment,
            resources: spec.resources,
            created_by: created_by.to_owned(),
            created_time,
        };
        self.versions.insert(version.id, version.clone());
        Ok(version)
    }

    async fn backends(&self, gateway: GatewayId) -> Result<Vec<Backend>, StoreError> {
        let mut backends: Vec<Backend> = self
            .backends
            .iter()
            .filter(|b| b.gateway_id == gateway)
            .map(|b| b.value().clone())
            .collect();
        backends.sort_by_key(|b| b.id);
        Ok(backends)
    }

    async fn backend_configs(&self, stage: StageId) -> Result<Vec<BackendConfig>, StoreError> {
        let mut configs: Vec<BackendConfig> = self
            .backend_configs
            .iter()
            .filter(|c| c.stage_id == stage)
            .map(|c| c.value().clone())
            .collect();
        configs.sort_by_key(|c| c.backend_id);
        Ok(configs)
    }

    async fn plugin_bindings(
        &self,
        gateway: GatewayId,
        stage: StageId,
    ) -> Result<Vec<PluginBinding>, StoreError> {
        Ok(self
            .plugin_bindings
            .get(&gateway)
            .map(|bindings| {
                bindings
                    .iter()
                    .filter(|b| match b.scope {
                        PluginScope::Stage(id) => id == stage,
                        PluginScope::Resource(_) => true,
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn certificates(&self, stage: StageId) -> Result<Vec<Certificate>, StoreError> {
        Ok(self
            .certificates
            .get(&stage)
            .map(|c| c.value().clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ReleaseStore for MemoryStore {
    async fn get_release(
        &self,
        gateway: GatewayId,
        stage: StageId,
    ) -> Result<Option<Release>, StoreError> {
        Ok(self.releases.get(&(gateway, stage)).map(|r| r.value().clone()))
    }

    async fn list_releases(&self, gateway: GatewayId) -> Result<Vec<Release>, StoreError> {
        let mut releases: Vec<Release> = self
            .releases
            .iter()
            .filter(|r| r.gateway_id == gateway)
            .map(|r| r.value().clone())
            .collect();
        releases.sort_by_key(|r| r.stage_id);
        Ok(releases)
    }

    async fn upsert_release(&self, release: Release) -> Result<(), StoreError> {
        self.releases
            .insert((release.gateway_id, release.stage_id), release);
        Ok(())
    }

    async fn create_history(&self, new: NewReleaseHistory) -> Result<ReleaseHistory, StoreError> {
        let history = ReleaseHistory {
            id: ReleaseHistoryId(Self::next_id(&self.next_history_id)),
            gateway_id: new.gateway_id,
            stage_id: new.stage_id,
            resource_version_id: new.resource_version_id,
            source: new.source,
            comment: new.comment,
            created_by: new.created_by,
            created_time: new.created_time,
            status: PublishStatus::Pending,
        };
        self.histories.insert(history.id, history.clone());
        Ok(history)
    }

    async fn get_history(
        &self,
        id: ReleaseHistoryId,
    ) -> Result<Option<ReleaseHistory>, StoreError> {
        Ok(self.histories.get(&id).map(|h| h.value().clone()))
    }

    async fn previous_history(
        &self,
        stage: StageId,
        before: ReleaseHistoryId,
    ) -> Result<Option<ReleaseHistory>, StoreError> {
        Ok(self.latest_matching(stage, |h| h.id < before))
    }

    async fn latest_history(&self, stage: StageId) -> Result<Option<ReleaseHistory>, StoreError> {
        Ok(self.latest_matching(stage, |_| true))
    }

    async fn update_history_status(
        &self,
        id: ReleaseHistoryId,
        status: PublishStatus,
    ) -> Result<(), StoreError> {
        let mut history = self
            .histories
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("release history", id))?;
        history.status = status;
        Ok(())
    }
}

#[async_trait]
impl EventLedger for MemoryStore {
    async fn append(&self, event: NewPublishEvent) -> Result<PublishEvent, StoreError> {
        let event = PublishEvent {
            id: PublishEventId(Self::next_id(&self.next_event_id)),
            release_history_id: event.release_history_id,
            step: event.step,
            status: event.status,
            detail: event.detail,
            created_time: event.created_time,
        };
        self.events
            .entry(event.release_history_id)
            .or_default()
            .push(event.clone());
        Ok(event)
    }

    async fn list_events(
        &self,
        release_history_id: ReleaseHistoryId,
    ) -> Result<Vec<PublishEvent>, StoreError> {
        let mut events = self
            .events
            .get(&release_history_id)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        events.sort_by_key(PublishEvent::sort_key);
        Ok(events)
    }
}
