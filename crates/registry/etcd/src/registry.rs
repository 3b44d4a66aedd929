use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use etcd_client::{Client, DeleteOptions, GetOptions};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use gantry_registry::{FailedEntry, Registry, RegistryEntry, RegistryError, RegistryPrefix};

use crate::config::EtcdRegistryConfig;

/// etcd-backed [`Registry`].
///
/// `sync` reads the current keys under the prefix, puts every new or changed
/// entry (each with its own retry budget), then deletes the keys that are no
/// longer wanted. Unchanged entries are not rewritten, so repeating a sync
/// does not bump revisions watched by the data plane.
pub struct EtcdRegistry {
    client: Arc<Mutex<Client>>,
    config: Arc<EtcdRegistryConfig>,
}

impl EtcdRegistry {
    /// Connect to etcd.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Connection`] if the connection cannot be
    /// established.
    pub async fn new(config: EtcdRegistryConfig) -> Result<Self, RegistryError> {
        let client = Client::connect(
            config.endpoints.clone(),
            Some(
                etcd_client::ConnectOptions::new()
                    .with_connect_timeout(config.connect_timeout)
                    .with_timeout(config.request_timeout),
            ),
        )
        .await
        .map_err(|e| RegistryError::Connection(e.to_string()))?;

        Ok(Self::from_client(Arc::new(Mutex::new(client)), Arc::new(config)))
    }

    pub fn from_client(client: Arc<Mutex<Client>>, config: Arc<EtcdRegistryConfig>) -> Self {
        Self { client, config }
    }

    async fn timed<T, F>(&self, fut: F) -> Result<T, RegistryError>
    where
        F: Future<Output = Result<T, etcd_client::Error>>,
    {
        match tokio::time::timeout(self.config.request_timeout, fut).await {
            Ok(result) => result.map_err(|e| RegistryError::Backend(e.to_string())),
            Err(_) => Err(RegistryError::Timeout(self.config.request_timeout)),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        let mut client = self.client.lock().await;
        self.timed(client.put(key, value, None)).await?;
        Ok(())
    }

    async fn delete_key(&self, key: &str) -> Result<(), RegistryError> {
        let mut client = self.client.lock().await;
        self.timed(client.delete(key, None)).await?;
        Ok(())
    }
}

#[async_trait]
impl Registry for EtcdRegistry {
    async fn sync(
        &self,
        prefix: &RegistryPrefix,
        entries: Vec<RegistryEntry>,
    ) -> Result<Vec<FailedEntry>, RegistryError> {
        let existing = self.scan(prefix).await?;
        let policy = &self.config.write_retry;

        let mut failed = Vec::new();
        let mut wanted = BTreeSet::new();
        let mut written = 0usize;
        for entry in entries {
            let key = prefix.key(&entry.kind, &entry.id);
            wanted.insert(key.clone());
            if existing.get(&key) == Some(&entry.value) {
                continue;
            }
            let result = policy
                .run("etcd put", RegistryError::is_retryable, |_| {
                    self.put(&key, &entry.value)
                })
                .await;
            match result {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!(key = %key, error = %e, "giving up on registry write");
                    failed.push(FailedEntry {
                        key,
                        error: e.to_string(),
                    });
                }
            }
        }

        let mut removed = 0usize;
        for stale in existing.keys().filter(|k| !wanted.contains(*k)) {
            let result = policy
                .run("etcd delete", RegistryError::is_retryable, |_| {
                    self.delete_key(stale)
                })
                .await;
            match result {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(key = %stale, error = %e, "failed to remove stale registry key");
                    failed.push(FailedEntry {
                        key: stale.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        debug!(
            prefix = %prefix,
            written,
            removed,
            failed = failed.len(),
            "registry sync finished"
        );
        Ok(failed)
    }

    async fn delete(&self, prefix: &RegistryPrefix) -> Result<u64, RegistryError> {
        let rendered = prefix.to_string();
        let mut client = self.client.lock().await;
        let resp = self
            .timed(client.delete(rendered, Some(DeleteOptions::new().with_prefix())))
            .await?;
        Ok(u64::try_from(resp.deleted()).unwrap_or(0))
    }

    async fn scan(&self, prefix: &RegistryPrefix) -> Result<BTreeMap<String, String>, RegistryError> {
        let rendered = prefix.to_string();
        let mut client = self.client.lock().await;
        let resp = self
            .timed(client.get(rendered, Some(GetOptions::new().with_prefix())))
            .await?;

        resp.kvs()
            .iter()
            .map(|kv| {
                let key = kv
                    .key_str()
                    .map_err(|e| RegistryError::Backend(e.to_string()))?;
                let value = kv
                    .value_str()
                    .map_err(|e| RegistryError::Backend(e.to_string()))?;
                Ok((key.to_owned(), value.to_owned()))
            })
            .collect()
    }
}
