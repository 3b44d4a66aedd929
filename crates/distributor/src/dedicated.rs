use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, instrument};

use gantry_core::{Gateway, ReleaseSnapshot, Stage, ValidationError};
use gantry_executor::RetryPolicy;
use gantry_transform::{GatewayTransformer, TransformContext, Transformer, release_marker};

use crate::chart::{Chart, ChartClient, ChartError, ChartMeta, ChartRelease, package, render_chart};
use crate::distributor::Distributor;
use crate::error::DistributeError;
use crate::target::{ChartTarget, InstanceKind, InstanceTarget, RevokeMode};

const REVOKED_APP_VERSION: &str = "revoked";

/// Publishes a stage as a chart deployment of its own instance.
pub struct DedicatedInstanceDistributor {
    client: Arc<dyn ChartClient>,
    retry: RetryPolicy,
}

impl DedicatedInstanceDistributor {
    pub fn new(client: Arc<dyn ChartClient>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Push `chart` and upsert its release. Does not wait for the rollout.
    async fn deploy(&self, target: &ChartTarget, chart: &Chart) -> Result<(), DistributeError> {
        let archive = package(chart)?;
        let archive_name = chart.archive_name();
        self.retry
            .run("chart push", ChartError::is_retryable, |_| {
                self.client.push_chart(target, &archive_name, archive.clone())
            })
            .await?;

        let release = ChartRelease {
            name: chart.meta.name.clone(),
            chart_name: chart.meta.name.clone(),
            chart_version: chart.meta.version.clone(),
            values: chart.values_yaml.clone(),
        };
        let outcome = self
            .retry
            .run("chart release", ChartError::is_retryable, |_| {
                self.client.ensure_release(target, &release)
            })
            .await?;
        if !outcome.found {
            return Err(DistributeError::Transient(format!(
                "chart release {} not found in {}/{}: {}",
                release.name, target.cluster, target.namespace, outcome.detail
            )));
        }
        info!(
            release = %release.name,
            version = %release.chart_version,
            detail = %outcome.detail,
            "chart release ensured"
        );
        Ok(())
    }
}

fn chart_target(target: &InstanceTarget) -> Result<&ChartTarget, DistributeError> {
    match &target.kind {
        InstanceKind::Dedicated(chart) => Ok(chart),
        InstanceKind::Shared => Err(ValidationError::Other(format!(
            "instance {} is not a dedicated instance",
            target.name
        ))
        .into()),
    }
}

#[async_trait]
impl Distributor for DedicatedInstanceDistributor {
    #[instrument(
        skip_all,
        fields(
            gateway = %snapshot.gateway.name,
            stage = %snapshot.stage.name,
            instance = %target.name,
            publish_id = ctx.publish_id,
        )
    )]
    async fn distribute(
        &self,
        snapshot: &ReleaseSnapshot,
        target: &InstanceTarget,
        ctx: TransformContext,
    ) -> Result<(), DistributeError> {
        let chart_target = chart_target(target)?;
        let resources = GatewayTransformer::new(snapshot, ctx)?.collect_resources()?;
        let meta = ChartMeta::for_stage(
            &snapshot.gateway.name,
            &snapshot.stage.name,
            ctx.publish_id,
            &snapshot.version.version,
        );
        let chart = render_chart(meta, &resources)?;
        self.deploy(chart_target, &chart).await
    }

    #[instrument(
        skip_all,
        fields(gateway = %gateway.name, stage = %stage.name, instance = %target.name)
    )]
    async fn revoke(
        &self,
        gateway: &Gateway,
        stage: &Stage,
        target: &InstanceTarget,
        mode: RevokeMode,
    ) -> Result<(), DistributeError> {
        let chart_target = chart_target(target)?;
        let publish_id = match mode {
            RevokeMode::Republish { publish_id } => Some(publish_id),
            RevokeMode::Delete => None,
        };
        let meta = ChartMeta::for_stage(
            &gateway.name,
            &stage.name,
            publish_id.unwrap_or_default(),
            REVOKED_APP_VERSION,
        );
        self.retry
            .run("chart delete", ChartError::is_retryable, |_| {
                self.client.delete_release(chart_target, &meta.name)
            })
            .await?;

        if let Some(publish_id) = publish_id {
            let marker = release_marker(
                gateway,
                stage,
                None,
                TransformContext::new(publish_id, Utc::now()),
            );
            let chart = render_chart(meta, &[marker])?;
            self.deploy(chart_target, &chart).await?;
        }
        info!(?mode, "dedicated instance revoked");
        Ok(())
    }
}
