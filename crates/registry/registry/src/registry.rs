use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::entry::{FailedEntry, RegistryEntry};
use crate::error::RegistryError;
use crate::prefix::RegistryPrefix;

/// Prefix-scoped key/value store read by data-plane instances.
///
/// Implementations must be safe to call concurrently for different
/// prefixes. Concurrent calls for the same prefix resolve to last writer
/// wins.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Replace everything under `prefix` with exactly `entries`.
    ///
    /// New and changed keys are written before keys absent from `entries`
    /// are removed, so a reader scanning the prefix never sees it empty
    /// mid-sync. Entries that still fail after the write retry budget are
    /// returned instead of raising; callers decide whether that is fatal.
    async fn sync(
        &self,
        prefix: &RegistryPrefix,
        entries: Vec<RegistryEntry>,
    ) -> Result<Vec<FailedEntry>, RegistryError>;

    /// Remove everything under `prefix`. Returns the number of keys removed.
    async fn delete(&self, prefix: &RegistryPrefix) -> Result<u64, RegistryError>;

    /// Every key under `prefix` with its value, ordered by key.
    async fn scan(&self, prefix: &RegistryPrefix) -> Result<BTreeMap<String, String>, RegistryError>;
}
