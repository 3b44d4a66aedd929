use async_trait::async_trait;

use gantry_core::{Gateway, ReleaseSnapshot, Stage, ValidationError};
use gantry_transform::TransformContext;

use crate::dedicated::DedicatedInstanceDistributor;
use crate::distributor::Distributor;
use crate::error::DistributeError;
use crate::shared::SharedInstanceDistributor;
use crate::target::{InstanceKind, InstanceTarget, RevokeMode};

/// Routes each target to the strategy matching its kind.
pub struct InstanceDistributor {
    shared: SharedInstanceDistributor,
    dedicated: Option<DedicatedInstanceDistributor>,
}

impl InstanceDistributor {
    pub fn new(shared: SharedInstanceDistributor) -> Self {
        Self {
            shared,
            dedicated: None,
        }
    }

    #[must_use]
    pub fn with_dedicated(mut self, dedicated: DedicatedInstanceDistributor) -> Self {
        self.dedicated = Some(dedicated);
        self
    }

    pub fn shared(&self) -> &SharedInstanceDistributor {
        &self.shared
    }

    fn strategy(&self, target: &InstanceTarget) -> Result<&dyn Distributor, DistributeError> {
        match (&target.kind, &self.dedicated) {
            (InstanceKind::Shared, _) => Ok(&self.shared),
            (InstanceKind::Dedicated(_), Some(dedicated)) => Ok(dedicated),
            (InstanceKind::Dedicated(_), None) => Err(ValidationError::Other(format!(
                "instance {} is dedicated but no chart service is configured",
                target.name
            ))
            .into()),
        }
    }
}

#[async_trait]
impl Distributor for InstanceDistributor {
    async fn distribute(
        &self,
        snapshot: &ReleaseSnapshot,
        target: &InstanceTarget,
        ctx: TransformContext,
    ) -> Result<(), DistributeError> {
        self.strategy(target)?.distribute(snapshot, target, ctx).await
    }

    async fn revoke(
        &self,
        gateway: &Gateway,
        stage: &Stage,
        target: &InstanceTarget,
        mode: RevokeMode,
    ) -> Result<(), DistributeError> {
        self.strategy(target)?.revoke(gateway, stage, target, mode).await
    }
}
