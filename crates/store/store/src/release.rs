use async_trait::async_trait;

use gantry_core::{
    GatewayId, NewReleaseHistory, PublishStatus, Release, ReleaseHistory, ReleaseHistoryId,
    StageId,
};

use crate::error::StoreError;

/// Release pointers and the append-only history of publish attempts.
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    async fn get_release(
        &self,
        gateway: GatewayId,
        stage: StageId,
    ) -> Result<Option<Release>, StoreError>;

    async fn list_releases(&self, gateway: GatewayId) -> Result<Vec<Release>, StoreError>;

    /// Insert or overwrite the pointer for `(release.gateway_id, release.stage_id)`.
    async fn upsert_release(&self, release: Release) -> Result<(), StoreError>;

    /// Record a new attempt with status `pending`.
    async fn create_history(&self, new: NewReleaseHistory) -> Result<ReleaseHistory, StoreError>;

    async fn get_history(&self, id: ReleaseHistoryId)
    -> Result<Option<ReleaseHistory>, StoreError>;

    /// Most recent attempt for `stage` created before `before`.
    async fn previous_history(
        &self,
        stage: StageId,
        before: ReleaseHistoryId,
    ) -> Result<Option<ReleaseHistory>, StoreError>;

    /// Most recent attempt for `stage`.
    async fn latest_history(&self, stage: StageId) -> Result<Option<ReleaseHistory>, StoreError>;

    /// Update the cached status. The only mutation a history row permits.
    async fn update_history_status(
        &self,
        id: ReleaseHistoryId,
        status: PublishStatus,
    ) -> Result<(), StoreError>;
}
