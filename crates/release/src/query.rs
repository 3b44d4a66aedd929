use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, instrument};

use gantry_core::{
    GatewayId, NewPublishEvent, PublishEvent, PublishStatus, PublishStep, ReleaseHistory,
    ReleaseHistoryId, ResourceVersionId, StageId, StepReporter, ValidationError,
};
use gantry_distributor::{Distributor, InstanceKind, InstanceTarget, SharedInstanceDistributor};
use gantry_executor::RetryPolicy;
use gantry_ledger::PublishEventsView;
use gantry_registry_memory::MemoryRegistry;
use gantry_transform::{ReleaseMarker, TransformContext};

use crate::error::ReleaseError;
use crate::orchestrator::ReleaseOrchestrator;
use crate::snapshot::load_snapshot;
use crate::validate::validate_snapshot;

/// Latest publish attempt of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageStatus {
    pub status: PublishStatus,
    /// `None` when the stage was never published.
    pub publish_id: Option<i64>,
}

impl ReleaseOrchestrator {
    /// Status of the latest attempt of each stage.
    pub async fn query_status(
        &self,
        stage_ids: &[StageId],
    ) -> Result<BTreeMap<StageId, StageStatus>, ReleaseError> {
        let mut statuses = BTreeMap::new();
        for &stage_id in stage_ids {
            let status = match self.inner.releases.latest_history(stage_id).await? {
                Some(history) => StageStatus {
                    status: self.current_status(&history).await?,
                    publish_id: Some(history.publish_id()),
                },
                None => StageStatus {
                    status: PublishStatus::Pending,
                    publish_id: None,
                },
            };
            statuses.insert(stage_id, status);
        }
        Ok(statuses)
    }

    /// Step template, backfilled events, and status of one attempt.
    pub async fn query_events(
        &self,
        id: ReleaseHistoryId,
    ) -> Result<PublishEventsView, ReleaseError> {
        let history = self.history(id).await?;
        let events = self.inner.ledger.list_events(id).await?;
        let reduced = self.inner.reducer.reduce(&events, Utc::now());
        let mut view = PublishEventsView::new(id, reduced);
        if history.status.is_terminal() {
            view.status = history.status;
        } else if view.status.is_terminal() {
            self.inner.releases.update_history_status(id, view.status).await?;
        }
        Ok(view)
    }

    /// Record a data-plane report for one attempt.
    #[instrument(skip_all, fields(release_history_id = %id, %step, %status))]
    pub async fn report_event(
        &self,
        id: ReleaseHistoryId,
        step: PublishStep,
        status: PublishStatus,
        detail: serde_json::Value,
    ) -> Result<PublishEvent, ReleaseError> {
        if step.reporter() != StepReporter::DataPlane {
            return Err(ValidationError::Other(format!(
                "{step} is reported by the control plane"
            ))
            .into());
        }
        let history = self.history(id).await?;
        let event = self
            .inner
            .ledger
            .append(NewPublishEvent::new(id, step, status, Utc::now()).with_detail(detail))
            .await?;
        let settles =
            status == PublishStatus::Failure || (status == PublishStatus::Success && step.is_last());
        // A settled attempt keeps its status; late reports only land in the ledger.
        if settles && history.status.is_terminal() {
            debug!(cached = %history.status, "report after terminal status ignored");
        } else if settles {
            self.inner.releases.update_history_status(id, status).await?;
        }
        debug!("data-plane event recorded");
        Ok(event)
    }

    /// Cached terminal status, or the reduced status of the event stream.
    /// A terminal reduction is written back.
    pub(crate) async fn current_status(
        &self,
        history: &ReleaseHistory,
    ) -> Result<PublishStatus, ReleaseError> {
        if history.status.is_terminal() {
            return Ok(history.status);
        }
        let events = self.inner.ledger.list_events(history.id).await?;
        let status = self.inner.reducer.reduce(&events, Utc::now()).status;
        if status.is_terminal() {
            self.inner
                .releases
                .update_history_status(history.id, status)
                .await?;
        }
        Ok(status)
    }

    /// Dry run: the registry content publishing `version` to the stage
    /// would produce, as key to payload. Payloads carry publish id 0.
    pub async fn render(
        &self,
        gateway_id: GatewayId,
        stage_id: StageId,
        version_id: ResourceVersionId,
    ) -> Result<BTreeMap<String, String>, ReleaseError> {
        let gateway = self.gateway(gateway_id).await?;
        let stage = self.stage(&gateway, stage_id).await?;
        let version = self
            .inner
            .catalog
            .get_resource_version(version_id)
            .await?
            .filter(|v| v.gateway_id == gateway.id)
            .ok_or_else(|| ReleaseError::not_found("resource version", version_id))?;
        let target = InstanceTarget::shared(self.resolve_target(&stage)?.name);
        let snapshot = load_snapshot(self.inner.catalog.as_ref(), gateway, stage, version).await?;
        validate_snapshot(&snapshot)?;

        let registry = Arc::new(MemoryRegistry::new());
        let mut distributor =
            SharedInstanceDistributor::new(registry.clone(), self.inner.layout.clone())
                .with_retry(RetryPolicy::none());
        if !self.inner.global_plugins.is_empty() {
            distributor = distributor.with_global_plugins(
                self.inner.config.default_instance.clone(),
                self.inner.global_plugins.clone(),
            );
        }
        distributor
            .distribute(&snapshot, &target, TransformContext::new(0, Utc::now()))
            .await?;
        Ok(registry
            .keys()
            .into_iter()
            .filter_map(|key| registry.get(&key).map(|value| (key, value)))
            .collect())
    }

    /// Decode the release marker currently published for a stage on a
    /// shared instance.
    pub async fn published_marker(
        &self,
        gateway_id: GatewayId,
        stage_id: StageId,
    ) -> Result<Option<ReleaseMarker>, ReleaseError> {
        let registry = self.inner.registry.clone().ok_or_else(|| {
            ReleaseError::Configuration("marker inspection needs a registry".into())
        })?;
        let gateway = self.gateway(gateway_id).await?;
        let stage = self.stage(&gateway, stage_id).await?;
        let target = self.resolve_target(&stage)?;
        if let InstanceKind::Dedicated(_) = target.kind {
            return Err(ValidationError::Other(format!(
                "instance {} is dedicated; its markers live in the chart",
                target.name
            ))
            .into());
        }
        let marker = SharedInstanceDistributor::new(registry, self.inner.layout.clone())
            .published_marker(&target.name, &gateway.name, &stage.name)
            .await?;
        Ok(marker)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use gantry_core::ActivationStatus;
    use gantry_store::{CatalogStore, EventLedger, ReleaseStore};

    use super::*;
    use crate::PublishRequest;
    use crate::fixtures::{GATEWAY, PROD, TEST, harness};

    fn request(version: ResourceVersionId) -> PublishRequest {
        PublishRequest::new(GATEWAY, PROD, version, "admin")
    }

    #[tokio::test]
    async fn never_published_stage_is_pending() {
        let h = harness().await;
        let statuses = h.orchestrator.query_status(&[PROD, TEST]).await.unwrap();
        assert_eq!(
            statuses[&TEST],
            StageStatus {
                status: PublishStatus::Pending,
                publish_id: None
            }
        );
    }

    #[tokio::test]
    async fn status_follows_data_plane_reports() {
        let h = harness().await;
        let id = h.orchestrator.publish_sync(request(h.version)).await.unwrap();

        let statuses = h.orchestrator.query_status(&[PROD]).await.unwrap();
        assert_eq!(statuses[&PROD].status, PublishStatus::Doing);
        assert_eq!(statuses[&PROD].publish_id, Some(id.get()));

        h.orchestrator
            .report_event(id, PublishStep::ParseConfiguration, PublishStatus::Doing, json!({}))
            .await
            .unwrap();
        h.orchestrator
            .report_event(
                id,
                PublishStep::LoadConfiguration,
                PublishStatus::Success,
                json!({"instance": "gw-1"}),
            )
            .await
            .unwrap();

        let statuses = h.orchestrator.query_status(&[PROD]).await.unwrap();
        assert_eq!(statuses[&PROD].status, PublishStatus::Success);
        assert_eq!(
            h.store.get_history(id).await.unwrap().unwrap().status,
            PublishStatus::Success
        );

        let view = h.orchestrator.query_events(id).await.unwrap();
        assert_eq!(view.status, PublishStatus::Success);
        assert_eq!(view.steps.len(), 6);
        // Parse never finished and load never started; both are backfilled.
        assert!(view.events.iter().any(|e| e.step == PublishStep::ParseConfiguration
            && e.status == PublishStatus::Success
            && e.id.is_synthetic()));
        assert!(view.events.iter().any(|e| e.step == PublishStep::LoadConfiguration
            && e.status == PublishStatus::Doing
            && e.id.is_synthetic()));
    }

    #[tokio::test]
    async fn data_plane_failure_is_cached() {
        let h = harness().await;
        let id = h.orchestrator.publish_sync(request(h.version)).await.unwrap();
        h.orchestrator
            .report_event(
                id,
                PublishStep::ApplyConfiguration,
                PublishStatus::Failure,
                json!({"message": "route conflict"}),
            )
            .await
            .unwrap();
        assert_eq!(
            h.store.get_history(id).await.unwrap().unwrap().status,
            PublishStatus::Failure
        );
        // The pointer moved when distribution succeeded.
        assert!(h.store.get_release(GATEWAY, PROD).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn late_report_keeps_terminal_status() {
        let h = harness().await;
        let id = h.orchestrator.publish_sync(request(h.version)).await.unwrap();
        h.orchestrator
            .report_event(id, PublishStep::LoadConfiguration, PublishStatus::Success, json!({}))
            .await
            .unwrap();
        h.orchestrator
            .report_event(
                id,
                PublishStep::LoadConfiguration,
                PublishStatus::Failure,
                json!({"message": "late"}),
            )
            .await
            .unwrap();

        assert_eq!(
            h.store.get_history(id).await.unwrap().unwrap().status,
            PublishStatus::Success
        );
        let view = h.orchestrator.query_events(id).await.unwrap();
        assert_eq!(view.status, PublishStatus::Success);
        let events = h.store.list_events(id).await.unwrap();
        assert!(events.iter().any(|e| e.status == PublishStatus::Failure));
    }

    #[tokio::test]
    async fn report_for_missing_history_is_not_found() {
        let h = harness().await;
        let err = h
            .orchestrator
            .report_event(
                ReleaseHistoryId(404),
                PublishStep::LoadConfiguration,
                PublishStatus::Success,
                json!({}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ReleaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn render_does_not_touch_the_registry() {
        let h = harness().await;
        let rendered = h.orchestrator.render(GATEWAY, PROD, h.version).await.unwrap();
        assert!(h.registry.keys().is_empty());
        assert!(rendered.contains_key("gantry/default/shop/prod/v2/service/shop.prod.users"));
        let marker = &rendered["gantry/default/shop/prod/v2/release/shop.prod.release"];
        assert!(marker.contains("1.0.0"), "{marker}");
        // Rendering leaves the stage as it was.
        let stage = h.store.get_stage(PROD).await.unwrap().unwrap();
        assert_eq!(stage.status, ActivationStatus::Inactive);
    }

    #[tokio::test]
    async fn render_validates_first() {
        let h = harness().await;
        h.store.set_stage_var(PROD, "bad-name", "x");
        let err = h
            .orchestrator
            .render(GATEWAY, PROD, h.version)
            .await
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Validation { .. }));
    }

    #[tokio::test]
    async fn marker_reflects_latest_publish() {
        let h = harness().await;
        assert!(
            h.orchestrator
                .published_marker(GATEWAY, PROD)
                .await
                .unwrap()
                .is_none()
        );
        let id = h.orchestrator.publish_sync(request(h.version)).await.unwrap();
        let marker = h
            .orchestrator
            .published_marker(GATEWAY, PROD)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(marker.publish_id, id.get());
        assert_eq!(marker.resource_version.as_deref(), Some("1.0.0"));
        assert!(!marker.revoked);
    }
}
