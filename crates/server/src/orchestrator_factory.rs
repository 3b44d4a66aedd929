use std::sync::Arc;

use gantry_distributor::chart::HttpChartClient;
use gantry_release::ReleaseOrchestrator;
use gantry_store_memory::{CatalogSeed, MemoryStore};

use crate::config::{CatalogConfig, ChartServiceConfig, GantryConfig};
use crate::error::ServerError;
use crate::registry_factory::create_registry;

/// Parse a YAML catalog seed.
pub fn parse_catalog(contents: &str) -> Result<CatalogSeed, ServerError> {
    serde_yaml_ng::from_str(contents).map_err(|e| ServerError::Config(format!("catalog seed: {e}")))
}

/// Create the catalog store, loading the configured seed file if any.
pub fn create_store(config: &CatalogConfig) -> Result<Arc<MemoryStore>, ServerError> {
    let Some(path) = config.seed.as_deref() else {
        return Ok(Arc::new(MemoryStore::new()));
    };
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ServerError::Config(format!("catalog seed {path}: {e}")))?;
    let seed = parse_catalog(&contents)?;
    tracing::info!(
        path,
        gateways = seed.gateways.len(),
        stages = seed.stages.len(),
        resource_versions = seed.resource_versions.len(),
        "catalog seed loaded"
    );
    Ok(Arc::new(MemoryStore::from_seed(seed)))
}

fn create_chart_client(
    config: &ChartServiceConfig,
) -> Result<Option<Arc<HttpChartClient>>, ServerError> {
    let Some(base_url) = config.base_url.as_deref() else {
        return Ok(None);
    };
    let client = HttpChartClient::new(
        base_url,
        config.token.clone(),
        config.connect_timeout(),
        config.request_timeout(),
    )
    .map_err(|e| ServerError::Config(format!("chart service: {e}")))?;
    Ok(Some(Arc::new(client)))
}

/// Wire the orchestrator described by `config` on top of `store`.
pub async fn create_orchestrator(
    config: &GantryConfig,
    store: Arc<MemoryStore>,
) -> Result<ReleaseOrchestrator, ServerError> {
    let registry = create_registry(&config.registry).await?;
    let mut builder = ReleaseOrchestrator::builder()
        .store(store)
        .registry(registry)
        .layout(config.registry.layout())
        .retry(config.registry.retry())
        .executor_config(config.executor.to_executor_config())
        .config(config.release.to_release_config())
        .global_plugins(config.global_plugin_metadata.clone());
    for instance in &config.instances {
        builder = builder.instance(instance.clone());
    }
    if let Some(client) = create_chart_client(&config.chart)? {
        builder = builder.chart_client(client);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use gantry_core::{ActivationStatus, GatewayId, StageId};
    use gantry_store::CatalogStore;

    use super::*;

    const SEED: &str = r#"
gateways:
  - id: 1
    name: shop
stages:
  - id: 1
    gateway_id: 1
    name: prod
    vars:
      prefix: v1
    status: active
backends:
  - id: 1
    gateway_id: 1
    name: users
backend_configs:
  - backend_id: 1
    stage_id: 1
    hosts:
      - host: users.internal:8080
"#;

    #[tokio::test]
    async fn seed_populates_the_catalog() {
        let store = MemoryStore::from_seed(parse_catalog(SEED).unwrap());
        let stage = store.get_stage(StageId(1)).await.unwrap().unwrap();
        assert_eq!(stage.vars["prefix"], "v1");
        assert_eq!(stage.status, ActivationStatus::Active);
        let configs = store.backend_configs(StageId(1)).await.unwrap();
        assert_eq!(configs[0].hosts[0].weight, 100);
        assert!(store.get_gateway(GatewayId(1)).await.unwrap().is_some());
    }

    #[test]
    fn malformed_seed_is_a_config_error() {
        let err = parse_catalog("gateways: 12").unwrap_err();
        assert!(err.to_string().contains("catalog seed"));
    }

    #[test]
    fn missing_seed_file_is_a_config_error() {
        let config = CatalogConfig {
            seed: Some("/nonexistent/catalog.yaml".into()),
        };
        assert!(matches!(create_store(&config), Err(ServerError::Config(_))));
    }

    #[tokio::test]
    async fn dedicated_instance_without_chart_service_fails() {
        let config = GantryConfig::parse(
            r#"
            [[instances]]
            name = "payments"
            kind = "dedicated"
            project = "gateways"
            cluster = "eu-1"
            namespace = "gw-payments"
            "#,
        )
        .unwrap();
        let Err(err) = create_orchestrator(&config, Arc::new(MemoryStore::new())).await else {
            panic!("expected an error");
        };
        assert!(err.to_string().contains("payments"));
    }

    #[tokio::test]
    async fn defaults_build() {
        let config = GantryConfig::default();
        let orchestrator = create_orchestrator(&config, Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        assert_eq!(orchestrator.config().default_instance, "default");
    }
}
