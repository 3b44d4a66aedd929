use std::sync::Arc;

use gantry_registry::Registry;
use gantry_registry_etcd::{EtcdRegistry, EtcdRegistryConfig};
use gantry_registry_memory::MemoryRegistry;

use crate::config::RegistryConfig;
use crate::error::ServerError;

/// Create the shared-instance registry from the given configuration.
pub async fn create_registry(config: &RegistryConfig) -> Result<Arc<dyn Registry>, ServerError> {
    let registry: Arc<dyn Registry> = match config.backend.as_str() {
        "memory" => Arc::new(MemoryRegistry::new()),
        "etcd" => {
            if config.endpoints.is_empty() {
                return Err(ServerError::Config(
                    "etcd registry backend requires [registry] endpoints".into(),
                ));
            }
            let etcd_config = EtcdRegistryConfig {
                endpoints: config.endpoints.clone(),
                connect_timeout: config.connect_timeout(),
                request_timeout: config.request_timeout(),
                write_retry: config.retry(),
            };
            let registry = EtcdRegistry::new(etcd_config)
                .await
                .map_err(|e| ServerError::Config(format!("registry etcd: {e}")))?;
            Arc::new(registry)
        }
        other => {
            return Err(ServerError::Config(format!(
                "unknown registry backend: {other}"
            )));
        }
    };

    tracing::info!(backend = %config.backend, namespace = %config.namespace, "registry ready");
    Ok(registry)
}
