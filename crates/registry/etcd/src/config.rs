use std::time::Duration;

use gantry_executor::{RetryPolicy, RetryStrategy};

/// Configuration for the etcd registry backend.
#[derive(Debug, Clone)]
pub struct EtcdRegistryConfig {
    /// etcd endpoint URLs (e.g. `["http://localhost:2379"]`).
    pub endpoints: Vec<String>,

    /// Timeout for establishing a connection to etcd.
    pub connect_timeout: Duration,

    /// Timeout applied to every individual etcd request.
    pub request_timeout: Duration,

    /// Per-key retry budget during `sync`.
    pub write_retry: RetryPolicy,
}

impl Default for EtcdRegistryConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![String::from("http://localhost:2379")],
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(3),
            write_retry: RetryPolicy {
                max_retries: 3,
                strategy: RetryStrategy::Exponential {
                    base: Duration::from_millis(50),
                    max: Duration::from_secs(1),
                    multiplier: 2.0,
                    jitter: true,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = EtcdRegistryConfig::default();
        assert_eq!(cfg.endpoints, vec!["http://localhost:2379"]);
        assert_eq!(cfg.connect_timeout, Duration::from_secs(5));
        assert_eq!(cfg.request_timeout, Duration::from_secs(3));
        assert_eq!(cfg.write_retry.max_retries, 3);
    }
}
