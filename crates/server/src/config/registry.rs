use std::time::Duration;

use serde::Deserialize;

use gantry_executor::RetryPolicy;
use gantry_registry::RegistryLayout;

/// Configuration of the shared-instance registry.
#[derive(Debug, Deserialize)]
pub struct RegistryConfig {
    /// Which backend to use: `"memory"` or `"etcd"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// etcd endpoint URLs.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,
    /// First segment of every registry key.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Layout version segment of every registry key.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Retries of a failed registry write within one publish attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            endpoints: default_endpoints(),
            namespace: default_namespace(),
            schema_version: default_schema_version(),
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl RegistryConfig {
    pub fn layout(&self) -> RegistryLayout {
        RegistryLayout {
            namespace: self.namespace.clone(),
            schema_version: self.schema_version.clone(),
        }
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_backend() -> String {
    "memory".to_owned()
}

fn default_endpoints() -> Vec<String> {
    vec!["http://localhost:2379".to_owned()]
}

fn default_namespace() -> String {
    RegistryLayout::default().namespace
}

fn default_schema_version() -> String {
    RegistryLayout::default().schema_version
}

fn default_connect_timeout() -> u64 {
    5_000
}

fn default_request_timeout() -> u64 {
    3_000
}

fn default_max_retries() -> u32 {
    3
}
