use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use gantry_core::{
    AuthRequirement, Backend, BackendConfig, BackendHost, BackendId, Gateway, GatewayId,
    LoadBalance, ResourceId, ResourceSpec, ResourceVersionId, ResourceVersionSpec, Scheme, Stage,
    StageId,
};
use gantry_executor::RetryPolicy;
use gantry_registry_memory::MemoryRegistry;
use gantry_store::CatalogStore;
use gantry_store_memory::MemoryStore;

use crate::builder::OrchestratorBuilder;
use crate::config::ReleaseConfig;
use crate::orchestrator::ReleaseOrchestrator;

pub(crate) const GATEWAY: GatewayId = GatewayId(1);
pub(crate) const PROD: StageId = StageId(1);
pub(crate) const TEST: StageId = StageId(2);

pub(crate) struct Harness {
    pub store: Arc<MemoryStore>,
    pub registry: Arc<MemoryRegistry>,
    pub orchestrator: ReleaseOrchestrator,
    /// Version "1.0.0" of the gateway.
    pub version: ResourceVersionId,
}

pub(crate) fn version_spec(label: &str) -> ResourceVersionSpec {
    ResourceVersionSpec {
        version: label.into(),
        comment: String::new(),
        resources: vec![ResourceSpec {
            id: ResourceId(10),
            name: "list_users".into(),
            method: "GET".into(),
            path: "/users".into(),
            match_subpath: false,
            backend_id: BackendId(1),
            backend_path: "/{env.prefix}/users".into(),
            backend_method: None,
            timeout_secs: None,
            auth: AuthRequirement::default(),
        }],
    }
}

fn seed(store: &MemoryStore) {
    store.insert_gateway(Gateway::new(GATEWAY, "shop").unwrap());
    for (id, name) in [(PROD, "prod"), (TEST, "test")] {
        store.insert_stage(
            Stage::new(id, GATEWAY, name)
                .unwrap()
                .with_var("prefix", "v1"),
        );
        store.insert_backend_config(BackendConfig {
            backend_id: BackendId(1),
            stage_id: id,
            hosts: vec![BackendHost {
                scheme: Scheme::Http,
                host: format!("users-{name}.internal:8080"),
                weight: 100,
            }],
            loadbalance: LoadBalance::RoundRobin,
            timeout_secs: 30,
        });
    }
    store.insert_backend(Backend {
        id: BackendId(1),
        gateway_id: GATEWAY,
        name: "users".into(),
    });
}

/// A seeded store and registry behind an orchestrator with a 10s wait cap.
pub(crate) async fn harness() -> Harness {
    harness_with(|builder| builder).await
}

pub(crate) async fn harness_with(
    customize: impl FnOnce(OrchestratorBuilder) -> OrchestratorBuilder,
) -> Harness {
    let store = Arc::new(MemoryStore::new());
    seed(&store);
    let version = store
        .create_resource_version(GATEWAY, version_spec("1.0.0"), "admin", Utc::now())
        .await
        .unwrap()
        .id;
    let registry = Arc::new(MemoryRegistry::new());
    let builder = ReleaseOrchestrator::builder()
        .store(store.clone())
        .registry(registry.clone())
        .retry(RetryPolicy::none())
        .config(ReleaseConfig {
            min_release_interval: Duration::from_secs(1),
            ..ReleaseConfig::default()
        });
    let orchestrator = customize(builder).build().unwrap();
    Harness {
        store,
        registry,
        orchestrator,
        version,
    }
}
