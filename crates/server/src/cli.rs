//! Offline commands of the server binary.

use std::collections::BTreeMap;

use gantry_core::{GatewayId, PublishSource, ReleaseHistoryId, ResourceVersionId, StageId};
use gantry_release::{PublishRequest, ReleaseError, ReleaseOrchestrator};
use gantry_store::CatalogStore;

use crate::error::ServerError;

/// Gateway, stage, and resource version picked by name on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishTarget {
    pub gateway_id: GatewayId,
    pub stage_id: StageId,
    pub resource_version_id: ResourceVersionId,
}

/// Resolve `gateway`/`stage`/`version` names to catalog ids.
pub async fn resolve(
    catalog: &dyn CatalogStore,
    gateway: &str,
    stage: &str,
    version: &str,
) -> Result<PublishTarget, ServerError> {
    let gateway = catalog
        .find_gateway(gateway)
        .await
        .map_err(ReleaseError::from)?
        .ok_or_else(|| ReleaseError::not_found("gateway", gateway))?;
    let stage_id = catalog
        .find_stage(gateway.id, stage)
        .await
        .map_err(ReleaseError::from)?
        .ok_or_else(|| ReleaseError::not_found("stage", format!("{}/{stage}", gateway.name)))?
        .id;
    let resource_version_id = catalog
        .find_resource_version(gateway.id, version)
        .await
        .map_err(ReleaseError::from)?
        .ok_or_else(|| {
            ReleaseError::not_found("resource version", format!("{}@{version}", gateway.name))
        })?
        .id;
    Ok(PublishTarget {
        gateway_id: gateway.id,
        stage_id,
        resource_version_id,
    })
}

/// Publish and wait for distribution. Fails when the attempt fails.
pub async fn sync(
    orchestrator: &ReleaseOrchestrator,
    target: PublishTarget,
    comment: &str,
) -> Result<ReleaseHistoryId, ServerError> {
    let request = PublishRequest::new(
        target.gateway_id,
        target.stage_id,
        target.resource_version_id,
        "cli",
    )
    .with_comment(comment)
    .with_source(PublishSource::CliSync);
    Ok(orchestrator.publish_sync(request).await?)
}

/// Registry content a publish of `target` would produce.
pub async fn render(
    orchestrator: &ReleaseOrchestrator,
    target: PublishTarget,
) -> Result<BTreeMap<String, String>, ServerError> {
    Ok(orchestrator
        .render(target.gateway_id, target.stage_id, target.resource_version_id)
        .await?)
}
