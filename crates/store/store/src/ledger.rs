use async_trait::async_trait;

use gantry_core::{NewPublishEvent, PublishEvent, ReleaseHistoryId};

use crate::error::StoreError;

/// Append-only store of publish events.
#[async_trait]
pub trait EventLedger: Send + Sync {
    async fn append(&self, event: NewPublishEvent) -> Result<PublishEvent, StoreError>;

    /// Every event of one attempt, ordered by (step, status, created time, id).
    async fn list_events(
        &self,
        release_history_id: ReleaseHistoryId,
    ) -> Result<Vec<PublishEvent>, StoreError>;
}
