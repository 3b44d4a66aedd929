use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::Bound;

use async_trait::async_trait;
use parking_lot::RwLock;

use gantry_registry::{FailedEntry, Registry, RegistryEntry, RegistryError, RegistryPrefix};

/// In-memory [`Registry`] over an ordered map.
///
/// A whole `sync` runs under one write lock, so readers observe either the
/// old or the new set. Writes to selected resource ids can be made to fail
/// for exercising partial-failure handling.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    data: RwLock<BTreeMap<String, String>>,
    failing_ids: RwLock<HashSet<String>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future write of a resource with this id fail.
    pub fn fail_writes_for(&self, id: impl Into<String>) {
        self.failing_ids.write().insert(id.into());
    }

    pub fn clear_failures(&self) {
        self.failing_ids.write().clear();
    }

    /// Every stored key, across all prefixes.
    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.data.read().get(key).cloned()
    }

    fn keys_under(data: &BTreeMap<String, String>, prefix: &str) -> Vec<String> {
        data.range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn sync(
        &self,
        prefix: &RegistryPrefix,
        entries: Vec<RegistryEntry>,
    ) -> Result<Vec<FailedEntry>, RegistryError> {
        let failing = self.failing_ids.read().clone();
        let rendered = prefix.to_string();
        let mut data = self.data.write();

        let mut failed = Vec::new();
        let mut wanted = BTreeSet::new();
        for entry in entries {
            let key = prefix.key(&entry.kind, &entry.id);
            wanted.insert(key.clone());
            if failing.contains(&entry.id) {
                failed.push(FailedEntry {
                    key,
                    error: "injected write failure".to_owned(),
                });
                continue;
            }
            data.insert(key, entry.value);
        }

        for stale in Self::keys_under(&data, &rendered) {
            if !wanted.contains(&stale) {
                data.remove(&stale);
            }
        }
        Ok(failed)
    }

    async fn delete(&self, prefix: &RegistryPrefix) -> Result<u64, RegistryError> {
        let mut data = self.data.write();
        let keys = Self::keys_under(&data, &prefix.to_string());
        for key in &keys {
            data.remove(key);
        }
        Ok(keys.len() as u64)
    }

    async fn scan(&self, prefix: &RegistryPrefix) -> Result<BTreeMap<String, String>, RegistryError> {
        let rendered = prefix.to_string();
        let data = self.data.read();
        Ok(data
            .range::<str, _>((Bound::Included(rendered.as_str()), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(&rendered))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
