use async_trait::async_trait;

use gantry_core::{Gateway, ReleaseSnapshot, Stage};
use gantry_transform::TransformContext;

use crate::error::DistributeError;
use crate::target::{InstanceTarget, RevokeMode};

/// Performs one publish or revoke attempt against one instance.
///
/// Both operations converge: invoking them twice with the same arguments
/// leaves the same end state as invoking them once.
#[async_trait]
pub trait Distributor: Send + Sync {
    async fn distribute(
        &self,
        snapshot: &ReleaseSnapshot,
        target: &InstanceTarget,
        ctx: TransformContext,
    ) -> Result<(), DistributeError>;

    async fn revoke(
        &self,
        gateway: &Gateway,
        stage: &Stage,
        target: &InstanceTarget,
        mode: RevokeMode,
    ) -> Result<(), DistributeError>;
}
