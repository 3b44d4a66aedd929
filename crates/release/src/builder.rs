use std::collections::HashMap;
use std::sync::Arc;

use gantry_core::PluginMetadataSpec;
use gantry_distributor::{
    ChartClient, DedicatedInstanceDistributor, Distributor, InstanceDistributor, InstanceKind,
    InstanceTarget, SharedInstanceDistributor,
};
use gantry_executor::{ExecutorConfig, RetryPolicy, TaskExecutor};
use gantry_ledger::StatusReducer;
use gantry_registry::{Registry, RegistryLayout};
use gantry_store::{CatalogStore, EventLedger, ReleaseStore};

use crate::config::ReleaseConfig;
use crate::error::ReleaseError;
use crate::orchestrator::{Inner, ReleaseOrchestrator};

/// Fluent builder for a [`ReleaseOrchestrator`].
///
/// The three persistence contracts are required. Distribution goes either
/// through an explicit [`Distributor`] or, by default, through an
/// [`InstanceDistributor`] over the configured registry, with dedicated
/// instances enabled when a chart client is supplied.
pub struct OrchestratorBuilder {
    catalog: Option<Arc<dyn CatalogStore>>,
    releases: Option<Arc<dyn ReleaseStore>>,
    ledger: Option<Arc<dyn EventLedger>>,
    distributor: Option<Arc<dyn Distributor>>,
    registry: Option<Arc<dyn Registry>>,
    layout: RegistryLayout,
    chart_client: Option<Arc<dyn ChartClient>>,
    instances: HashMap<String, InstanceTarget>,
    global_plugins: Vec<PluginMetadataSpec>,
    retry: RetryPolicy,
    executor_config: ExecutorConfig,
    config: ReleaseConfig,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            catalog: None,
            releases: None,
            ledger: None,
            distributor: None,
            registry: None,
            layout: RegistryLayout::default(),
            chart_client: None,
            instances: HashMap::new(),
            global_plugins: Vec::new(),
            retry: RetryPolicy::default(),
            executor_config: ExecutorConfig::default(),
            config: ReleaseConfig::default(),
        }
    }

    /// Use one backend for all three persistence contracts.
    #[must_use]
    pub fn store<S>(self, store: Arc<S>) -> Self
    where
        S: CatalogStore + ReleaseStore + EventLedger + 'static,
    {
        self.catalog(store.clone())
            .releases(store.clone())
            .ledger(store)
    }

    #[must_use]
    pub fn catalog(mut self, catalog: Arc<dyn CatalogStore>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    #[must_use]
    pub fn releases(mut self, releases: Arc<dyn ReleaseStore>) -> Self {
        self.releases = Some(releases);
        self
    }

    #[must_use]
    pub fn ledger(mut self, ledger: Arc<dyn EventLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Replace the default registry-backed distribution.
    #[must_use]
    pub fn distributor(mut self, distributor: Arc<dyn Distributor>) -> Self {
        self.distributor = Some(distributor);
        self
    }

    /// Registry of the shared instances. Also used for marker inspection.
    #[must_use]
    pub fn registry(mut self, registry: Arc<dyn Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn layout(mut self, layout: RegistryLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Chart service used to publish to dedicated instances.
    #[must_use]
    pub fn chart_client(mut self, client: Arc<dyn ChartClient>) -> Self {
        self.chart_client = Some(client);
        self
    }

    /// Register a data-plane instance stages can be bound to.
    #[must_use]
    pub fn instance(mut self, target: InstanceTarget) -> Self {
        self.instances.insert(target.name.clone(), target);
        self
    }

    /// Plugin metadata synced to the default instance on every publish.
    #[must_use]
    pub fn global_plugins(mut self, plugins: Vec<PluginMetadataSpec>) -> Self {
        self.global_plugins = plugins;
        self
    }

    /// Retry budget of registry and chart calls within one attempt.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn executor_config(mut self, config: ExecutorConfig) -> Self {
        self.executor_config = config;
        self
    }

    #[must_use]
    pub fn config(mut self, config: ReleaseConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ReleaseOrchestrator, ReleaseError> {
        let catalog = self
            .catalog
            .ok_or_else(|| ReleaseError::Configuration("catalog store is required".into()))?;
        let releases = self
            .releases
            .ok_or_else(|| ReleaseError::Configuration("release store is required".into()))?;
        let ledger = self
            .ledger
            .ok_or_else(|| ReleaseError::Configuration("event ledger is required".into()))?;
        if self.config.wait_poll_interval.is_zero() {
            return Err(ReleaseError::Configuration(
                "wait poll interval must be positive".into(),
            ));
        }

        let distributor = match self.distributor {
            Some(distributor) => distributor,
            None => {
                let registry = self.registry.clone().ok_or_else(|| {
                    ReleaseError::Configuration("a registry or a distributor is required".into())
                })?;
                if self.chart_client.is_none() {
                    if let Some(dedicated) = self
                        .instances
                        .values()
                        .find(|t| matches!(t.kind, InstanceKind::Dedicated(_)))
                    {
                        return Err(ReleaseError::Configuration(format!(
                            "instance {} is dedicated but no chart client is configured",
                            dedicated.name
                        )));
                    }
                }
                let mut shared = SharedInstanceDistributor::new(registry, self.layout.clone())
                    .with_retry(self.retry.clone());
                if !self.global_plugins.is_empty() {
                    shared = shared.with_global_plugins(
                        self.config.default_instance.clone(),
                        self.global_plugins.clone(),
                    );
                }
                let mut distributor = InstanceDistributor::new(shared);
                if let Some(client) = self.chart_client {
                    distributor = distributor.with_dedicated(
                        DedicatedInstanceDistributor::new(client).with_retry(self.retry),
                    );
                }
                Arc::new(distributor)
            }
        };

        Ok(ReleaseOrchestrator {
            inner: Arc::new(Inner {
                catalog,
                releases,
                ledger,
                distributor,
                registry: self.registry,
                layout: self.layout,
                instances: self.instances,
                global_plugins: self.global_plugins,
                executor: TaskExecutor::new(self.executor_config),
                reducer: StatusReducer::new(self.config.reducer),
                config: self.config,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gantry_distributor::ChartTarget;
    use gantry_distributor::chart::HttpChartClient;
    use gantry_registry_memory::MemoryRegistry;
    use gantry_store_memory::MemoryStore;

    use super::*;

    #[test]
    fn stores_are_required() {
        let err = OrchestratorBuilder::new().build().unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(msg) if msg.contains("catalog")));
    }

    #[test]
    fn registry_is_required_without_distributor() {
        let err = OrchestratorBuilder::new()
            .store(Arc::new(MemoryStore::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(msg) if msg.contains("registry")));
    }

    #[test]
    fn dedicated_instance_needs_chart_client() {
        let err = OrchestratorBuilder::new()
            .store(Arc::new(MemoryStore::new()))
            .registry(Arc::new(MemoryRegistry::new()))
            .instance(InstanceTarget::dedicated(
                "edge-eu",
                ChartTarget {
                    project: "gateways".into(),
                    cluster: "eu-1".into(),
                    namespace: "edge".into(),
                },
            ))
            .build()
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(msg) if msg.contains("edge-eu")));
    }

    #[test]
    fn dedicated_instance_builds_with_chart_client() {
        let client: Arc<dyn ChartClient> = Arc::new(
            HttpChartClient::new(
                "http://charts.internal",
                None,
                Duration::from_secs(1),
                Duration::from_secs(1),
            )
            .unwrap(),
        );
        let orchestrator = OrchestratorBuilder::new()
            .store(Arc::new(MemoryStore::new()))
            .registry(Arc::new(MemoryRegistry::new()))
            .instance(InstanceTarget::dedicated(
                "edge-eu",
                ChartTarget {
                    project: "gateways".into(),
                    cluster: "eu-1".into(),
                    namespace: "edge".into(),
                },
            ))
            .chart_client(client)
            .build()
            .unwrap();
        assert!(format!("{orchestrator:?}").contains("edge-eu"));
    }

    #[test]
    fn builds_with_defaults() {
        let orchestrator = OrchestratorBuilder::new()
            .store(Arc::new(MemoryStore::new()))
            .registry(Arc::new(MemoryRegistry::new()))
            .build()
            .unwrap();
        assert_eq!(orchestrator.config(), &ReleaseConfig::default());
    }
}
