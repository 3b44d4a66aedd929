use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use gantry_core::{
    ActivationStatus, Gateway, GatewayId, NewReleaseHistory, PluginMetadataSpec, PublishSource,
    PublishStatus, PublishStep, Release, ReleaseHistory, ReleaseHistoryId, ReleaseSnapshot,
    ResourceVersion, ResourceVersionId, ResourceVersionSpec, Stage, StageId, TriggerKind,
    ValidationError,
};
use gantry_distributor::{DistributeError, Distributor, ErrorClass, InstanceTarget, RevokeMode};
use gantry_executor::{TaskError, TaskExecutor, TaskOutcome};
use gantry_ledger::{EventReporter, StatusReducer};
use gantry_registry::{Registry, RegistryLayout};
use gantry_store::{CatalogStore, EventLedger, ReleaseStore, StoreError};
use gantry_transform::TransformContext;

use crate::config::ReleaseConfig;
use crate::error::ReleaseError;
use crate::snapshot::load_snapshot;
use crate::validate::validate_snapshot;

/// An operator request to publish one resource version to one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub gateway_id: GatewayId,
    pub stage_id: StageId,
    pub resource_version_id: ResourceVersionId,
    #[serde(default)]
    pub comment: String,
    pub actor: String,
    #[serde(default = "default_source")]
    pub source: PublishSource,
}

fn default_source() -> PublishSource {
    PublishSource::VersionPublish
}

impl PublishRequest {
    pub fn new(
        gateway_id: GatewayId,
        stage_id: StageId,
        resource_version_id: ResourceVersionId,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            gateway_id,
            stage_id,
            resource_version_id,
            comment: String::new(),
            actor: actor.into(),
            source: default_source(),
        }
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: PublishSource) -> Self {
        self.source = source;
        self
    }
}

/// A stage left out of a rolling update or revoke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedStage {
    pub stage_id: StageId,
    pub release_history_id: ReleaseHistoryId,
    pub reason: String,
}

/// What a trigger scheduled, per affected stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollingUpdateOutcome {
    pub scheduled: Vec<ReleaseHistoryId>,
    pub skipped: Vec<SkippedStage>,
}

#[derive(Debug, Clone)]
enum JobKind {
    Distribute(Box<ReleaseSnapshot>),
    Revoke(RevokeMode),
}

/// One background distribute or revoke, bound to its history row.
#[derive(Debug, Clone)]
struct Job {
    history: ReleaseHistory,
    gateway: Gateway,
    stage: Stage,
    target: InstanceTarget,
    kind: JobKind,
}

impl Job {
    fn task_name(&self) -> String {
        let action = match self.kind {
            JobKind::Distribute(_) => "distribute",
            JobKind::Revoke(_) => "revoke",
        };
        format!(
            "{action} {}/{} #{}",
            self.gateway.name, self.stage.name, self.history.id
        )
    }
}

pub(crate) struct Inner {
    pub(crate) catalog: Arc<dyn CatalogStore>,
    pub(crate) releases: Arc<dyn ReleaseStore>,
    pub(crate) ledger: Arc<dyn EventLedger>,
    pub(crate) distributor: Arc<dyn Distributor>,
    pub(crate) registry: Option<Arc<dyn Registry>>,
    pub(crate) layout: RegistryLayout,
    pub(crate) instances: HashMap<String, InstanceTarget>,
    pub(crate) global_plugins: Vec<PluginMetadataSpec>,
    pub(crate) executor: TaskExecutor,
    pub(crate) reducer: StatusReducer,
    pub(crate) config: ReleaseConfig,
}

/// Drives publish, rolling-update, and revoke attempts.
///
/// Every attempt gets a [`ReleaseHistory`] row whose id doubles as the
/// publish id. Validation and task generation run on the caller's task;
/// distribution runs on the background executor, after the previous attempt
/// for the same stage has finished or the wait cap has elapsed.
#[derive(Clone)]
pub struct ReleaseOrchestrator {
    pub(crate) inner: Arc<Inner>,
}

impl std::fmt::Debug for ReleaseOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseOrchestrator")
            .field("config", &self.inner.config)
            .field("instances", &self.inner.instances.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ReleaseOrchestrator {
    pub fn builder() -> crate::builder::OrchestratorBuilder {
        crate::builder::OrchestratorBuilder::new()
    }

    pub fn config(&self) -> &ReleaseConfig {
        &self.inner.config
    }

    /// Wait for every scheduled task to finish. No new work is accepted.
    pub async fn shutdown(&self) {
        self.inner.executor.shutdown().await;
    }

    /// Persist a new immutable resource version for a gateway.
    #[instrument(skip_all, fields(gateway_id = %gateway_id, version = %spec.version))]
    pub async fn create_resource_version(
        &self,
        gateway_id: GatewayId,
        spec: ResourceVersionSpec,
        actor: &str,
    ) -> Result<ResourceVersion, ReleaseError> {
        let gateway = self.gateway(gateway_id).await?;
        let backends = self.inner.catalog.backends(gateway.id).await?;
        if let Some(resource) = spec
            .resources
            .iter()
            .find(|r| !backends.iter().any(|b| b.id == r.backend_id))
        {
            return Err(ValidationError::Other(format!(
                "resource {} references backend {} outside gateway {}",
                resource.name, resource.backend_id, gateway.name
            ))
            .into());
        }
        let version = self
            .inner
            .catalog
            .create_resource_version(gateway.id, spec, actor, Utc::now())
            .await?;
        info!(version_id = %version.id, "resource version created");
        Ok(version)
    }

    /// Validate and schedule a publish. Returns the release history id to
    /// poll; distribution happens in the background.
    #[instrument(skip_all, fields(gateway_id = %request.gateway_id, stage_id = %request.stage_id))]
    pub async fn publish(&self, request: PublishRequest) -> Result<ReleaseHistoryId, ReleaseError> {
        let job = self.prepare_publish(&request).await?;
        let id = job.history.id;
        self.dispatch(job).await?;
        Ok(id)
    }

    /// Like [`publish`](Self::publish), but runs distribution on the
    /// caller's task and reports its outcome.
    #[instrument(skip_all, fields(gateway_id = %request.gateway_id, stage_id = %request.stage_id))]
    pub async fn publish_sync(
        &self,
        request: PublishRequest,
    ) -> Result<ReleaseHistoryId, ReleaseError> {
        let job = self.prepare_publish(&request).await?;
        let id = job.history.id;
        let reporter = self.reporter(id);
        reporter.completed(PublishStep::GenerateReleaseTask).await?;
        let outcome = self.run_inline(job).await;
        outcome.result?;

        let history = self.history(id).await?;
        if history.status == PublishStatus::Failure {
            let message = self.last_failure_message(id).await?;
            return Err(ReleaseError::PublishFailed {
                release_history_id: id,
                message,
            });
        }
        Ok(id)
    }

    /// Re-publish, revoke, or delete every release in scope, as dictated by
    /// the source's trigger kind.
    ///
    /// Stages failing their preconditions are recorded as a validation
    /// failure on their own history and skipped; the rest still proceed.
    #[instrument(skip_all, fields(%source, gateway_id = %gateway_id))]
    pub async fn trigger_rolling_update(
        &self,
        source: PublishSource,
        gateway_id: GatewayId,
        stage_id: Option<StageId>,
        actor: &str,
    ) -> Result<RollingUpdateOutcome, ReleaseError> {
        let kind = source.trigger_kind();
        if kind == TriggerKind::Publish {
            return Err(ValidationError::Other(format!(
                "{source} requires an explicit resource version"
            ))
            .into());
        }
        let gateway = self.gateway(gateway_id).await?;
        if let Some(stage_id) = stage_id {
            self.stage(&gateway, stage_id).await?;
        }

        let mut outcome = RollingUpdateOutcome::default();
        let releases = self.inner.releases.list_releases(gateway.id).await?;
        for release in releases
            .into_iter()
            .filter(|r| stage_id.is_none_or(|id| r.stage_id == id))
        {
            let Some(stage) = self.inner.catalog.get_stage(release.stage_id).await? else {
                warn!(stage_id = %release.stage_id, "release points at a missing stage, skipping");
                continue;
            };
            let history = self
                .inner
                .releases
                .create_history(NewReleaseHistory {
                    gateway_id: gateway.id,
                    stage_id: stage.id,
                    resource_version_id: release.resource_version_id,
                    source,
                    comment: source.as_str().to_owned(),
                    created_by: actor.to_owned(),
                    created_time: Utc::now(),
                })
                .await?;
            let reporter = self.reporter(history.id);
            reporter.doing(PublishStep::ValidateConfiguration).await?;

            let prepared = match kind {
                TriggerKind::RollingUpdate => {
                    self.prepare_rolling_update(source, &gateway, &stage, &history)
                        .await?
                }
                _ => revoke_mode(kind, &stage, &history).map(JobKind::Revoke),
            };
            let job_kind = match prepared {
                Ok(job_kind) => job_kind,
                Err(error) => {
                    let reason = error.to_string();
                    self.reject(&reporter, &reason).await?;
                    info!(stage = %stage.name, %reason, "stage skipped");
                    outcome.skipped.push(SkippedStage {
                        stage_id: stage.id,
                        release_history_id: history.id,
                        reason,
                    });
                    continue;
                }
            };
            let target = match self.resolve_target(&stage) {
                Ok(target) => target,
                Err(error) => {
                    let reason = error.to_string();
                    self.reject(&reporter, &reason).await?;
                    outcome.skipped.push(SkippedStage {
                        stage_id: stage.id,
                        release_history_id: history.id,
                        reason,
                    });
                    continue;
                }
            };
            reporter.success(PublishStep::ValidateConfiguration).await?;

            let id = history.id;
            self.dispatch(Job {
                history,
                gateway: gateway.clone(),
                stage,
                target,
                kind: job_kind,
            })
            .await?;
            outcome.scheduled.push(id);
        }
        info!(
            scheduled = outcome.scheduled.len(),
            skipped = outcome.skipped.len(),
            "trigger handled"
        );
        Ok(outcome)
    }

    async fn prepare_publish(&self, request: &PublishRequest) -> Result<Job, ReleaseError> {
        let gateway = self.gateway(request.gateway_id).await?;
        let stage = self.stage(&gateway, request.stage_id).await?;
        let version = self
            .inner
            .catalog
            .get_resource_version(request.resource_version_id)
            .await?
            .filter(|v| v.gateway_id == gateway.id)
            .ok_or_else(|| ReleaseError::not_found("resource version", request.resource_version_id))?;

        let history = self
            .inner
            .releases
            .create_history(NewReleaseHistory {
                gateway_id: gateway.id,
                stage_id: stage.id,
                resource_version_id: version.id,
                source: request.source,
                comment: request.comment.clone(),
                created_by: request.actor.clone(),
                created_time: Utc::now(),
            })
            .await?;
        let reporter = self.reporter(history.id);
        reporter.doing(PublishStep::ValidateConfiguration).await?;

        let snapshot = load_snapshot(
            self.inner.catalog.as_ref(),
            gateway.clone(),
            stage.clone(),
            version,
        )
        .await?;
        let checked = validate_snapshot(&snapshot).and_then(|()| self.resolve_target(&stage));
        let target = match checked {
            Ok(target) => target,
            Err(error) => {
                self.reject(&reporter, &error.to_string()).await?;
                warn!(release_history_id = %history.id, %error, "publish rejected");
                return Err(ReleaseError::Validation {
                    release_history_id: Some(history.id),
                    error,
                });
            }
        };
        reporter.success(PublishStep::ValidateConfiguration).await?;

        Ok(Job {
            history,
            gateway,
            stage,
            target,
            kind: JobKind::Distribute(Box::new(snapshot)),
        })
    }

    async fn prepare_rolling_update(
        &self,
        source: PublishSource,
        gateway: &Gateway,
        stage: &Stage,
        history: &ReleaseHistory,
    ) -> Result<Result<JobKind, ValidationError>, ReleaseError> {
        if !stage.is_active() && source != PublishSource::GatewayEnable {
            return Ok(Err(ValidationError::StageInactive {
                stage: stage.name.clone(),
            }));
        }
        if !gateway.is_active() && !source.is_gateway_scoped() {
            return Ok(Err(ValidationError::GatewayInactive {
                gateway: gateway.name.clone(),
            }));
        }
        let version = self
            .inner
            .catalog
            .get_resource_version(history.resource_version_id)
            .await?
            .ok_or_else(|| ReleaseError::not_found("resource version", history.resource_version_id))?;
        let snapshot =
            load_snapshot(self.inner.catalog.as_ref(), gateway.clone(), stage.clone(), version)
                .await?;
        Ok(validate_snapshot(&snapshot).map(|()| JobKind::Distribute(Box::new(snapshot))))
    }

    /// Record a validation failure on the history behind `reporter`.
    async fn reject(&self, reporter: &EventReporter, reason: &str) -> Result<(), ReleaseError> {
        reporter.try_failure(PublishStep::ValidateConfiguration, reason).await;
        self.inner
            .releases
            .update_history_status(reporter.release_history_id(), PublishStatus::Failure)
            .await?;
        Ok(())
    }

    /// Instance serving `stage`: its dedicated instance if any, else the
    /// shared default.
    pub(crate) fn resolve_target(&self, stage: &Stage) -> Result<InstanceTarget, ValidationError> {
        let name = stage
            .instance
            .as_deref()
            .unwrap_or(&self.inner.config.default_instance);
        match self.inner.instances.get(name) {
            Some(target) => Ok(target.clone()),
            None if name == self.inner.config.default_instance => {
                Ok(InstanceTarget::shared(name))
            }
            None => Err(ValidationError::Other(format!(
                "stage {} is bound to unknown instance {name}",
                stage.name
            ))),
        }
    }

    /// Schedule `job` on the executor and record the task-generation step.
    async fn dispatch(&self, job: Job) -> Result<(), ReleaseError> {
        let reporter = self.reporter(job.history.id);
        reporter.doing(PublishStep::GenerateReleaseTask).await?;
        let name = job.task_name();
        let this = self.clone();
        let job = Arc::new(job);
        self.inner.executor.spawn(name.clone(), move || {
            let this = this.clone();
            let job = Arc::clone(&job);
            async move { this.run_job(&job).await }
        });
        reporter.success(PublishStep::GenerateReleaseTask).await?;
        debug!(task = %name, "task scheduled");
        Ok(())
    }

    async fn run_inline(&self, job: Job) -> TaskOutcome {
        let name = job.task_name();
        self.inner
            .executor
            .run(name, || self.run_job(&job))
            .await
    }

    /// One attempt of a background job.
    ///
    /// Validation and transient distribution failures are recorded and end
    /// the task; fatal ones also abort it. Store failures are retried.
    async fn run_job(&self, job: &Job) -> Result<(), TaskError> {
        let id = job.history.id;
        let reporter = self.reporter(id);
        self.wait_for_previous(job.history.stage_id, id)
            .await
            .map_err(into_task_error)?;
        reporter
            .doing(PublishStep::DistributeConfiguration)
            .await
            .map_err(store_task_error)?;
        self.inner
            .releases
            .update_history_status(id, PublishStatus::Doing)
            .await
            .map_err(store_task_error)?;

        let result = match &job.kind {
            JobKind::Distribute(snapshot) => {
                let ctx = TransformContext::new(job.history.publish_id(), job.history.created_time);
                self.inner
                    .distributor
                    .distribute(snapshot, &job.target, ctx)
                    .await
            }
            JobKind::Revoke(mode) => {
                self.inner
                    .distributor
                    .revoke(&job.gateway, &job.stage, &job.target, *mode)
                    .await
            }
        };

        match result {
            Ok(()) => {
                self.on_distributed(job).await.map_err(store_task_error)?;
                reporter
                    .success(PublishStep::DistributeConfiguration)
                    .await
                    .map_err(store_task_error)?;
                info!(
                    release_history_id = %id,
                    gateway = %job.gateway.name,
                    stage = %job.stage.name,
                    instance = %job.target.name,
                    "distribution finished"
                );
                Ok(())
            }
            Err(err) => self.on_distribute_failed(job, &reporter, err).await,
        }
    }

    async fn on_distributed(&self, job: &Job) -> Result<(), StoreError> {
        let history = &job.history;
        match &job.kind {
            JobKind::Distribute(snapshot) => {
                self.inner
                    .releases
                    .upsert_release(Release {
                        gateway_id: history.gateway_id,
                        stage_id: history.stage_id,
                        resource_version_id: snapshot.version.id,
                        comment: history.comment.clone(),
                        updated_by: history.created_by.clone(),
                        updated_time: Utc::now(),
                    })
                    .await?;
                self.inner
                    .catalog
                    .set_stage_status(history.stage_id, ActivationStatus::Active)
                    .await
            }
            // Flipped only once the revoke landed, after any queued publish
            // on the stage. No data plane reports on a revoked stage.
            JobKind::Revoke(_) => {
                self.inner
                    .catalog
                    .set_stage_status(history.stage_id, ActivationStatus::Inactive)
                    .await?;
                self.inner
                    .releases
                    .update_history_status(history.id, PublishStatus::Success)
                    .await
            }
        }
    }

    async fn on_distribute_failed(
        &self,
        job: &Job,
        reporter: &EventReporter,
        err: DistributeError,
    ) -> Result<(), TaskError> {
        let id = job.history.id;
        warn!(
            release_history_id = %id,
            class = ?err.class(),
            error = %err,
            "distribution failed"
        );
        reporter
            .try_failure(PublishStep::DistributeConfiguration, err.to_string())
            .await;
        self.inner
            .releases
            .update_history_status(id, PublishStatus::Failure)
            .await
            .map_err(store_task_error)?;
        match err.class() {
            ErrorClass::Fatal => Err(TaskError::Fatal(err.to_string())),
            ErrorClass::Validation | ErrorClass::Transient => Ok(()),
        }
    }

    /// Block until the previous attempt on `stage` has finished, or the
    /// wait cap has elapsed.
    async fn wait_for_previous(
        &self,
        stage: StageId,
        id: ReleaseHistoryId,
    ) -> Result<(), ReleaseError> {
        let config = &self.inner.config;
        let deadline = Instant::now() + config.wait_cap();
        loop {
            let Some(previous) = self.inner.releases.previous_history(stage, id).await? else {
                return Ok(());
            };
            let status = self.current_status(&previous).await?;
            if status.is_terminal() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!(
                    release_history_id = %id,
                    previous = %previous.id,
                    %status,
                    waited_ms = %config.wait_cap().as_millis(),
                    "previous publish still running, proceeding"
                );
                return Ok(());
            }
            tokio::time::sleep(config.wait_poll_interval).await;
        }
    }

    pub(crate) fn reporter(&self, id: ReleaseHistoryId) -> EventReporter {
        EventReporter::new(Arc::clone(&self.inner.ledger), id)
    }

    pub(crate) async fn gateway(&self, id: GatewayId) -> Result<Gateway, ReleaseError> {
        self.inner
            .catalog
            .get_gateway(id)
            .await?
            .ok_or_else(|| ReleaseError::not_found("gateway", id))
    }

    /// Look up a stage, treating a stage of another gateway as missing.
    pub(crate) async fn stage(&self, gateway: &Gateway, id: StageId) -> Result<Stage, ReleaseError> {
        self.inner
            .catalog
            .get_stage(id)
            .await?
            .filter(|s| s.gateway_id == gateway.id)
            .ok_or_else(|| ReleaseError::not_found("stage", id))
    }

    pub(crate) async fn history(&self, id: ReleaseHistoryId) -> Result<ReleaseHistory, ReleaseError> {
        self.inner
            .releases
            .get_history(id)
            .await?
            .ok_or_else(|| ReleaseError::not_found("release history", id))
    }

    async fn last_failure_message(&self, id: ReleaseHistoryId) -> Result<String, ReleaseError> {
        let events = self.inner.ledger.list_events(id).await?;
        Ok(events
            .iter()
            .filter(|e| e.status == PublishStatus::Failure)
            .max_by_key(|e| (e.created_time, e.id))
            .and_then(|e| e.detail.get("message"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("publish failed")
            .to_owned())
    }
}

fn revoke_mode(
    kind: TriggerKind,
    stage: &Stage,
    history: &ReleaseHistory,
) -> Result<RevokeMode, ValidationError> {
    match kind {
        TriggerKind::RevokeDisable => Ok(RevokeMode::Republish {
            publish_id: history.publish_id(),
        }),
        TriggerKind::RevokeDelete => Ok(RevokeMode::Delete),
        other => Err(ValidationError::Other(format!(
            "cannot revoke stage {} for trigger {other:?}",
            stage.name
        ))),
    }
}

fn store_task_error(err: StoreError) -> TaskError {
    if err.is_retryable() {
        TaskError::Retryable(err.to_string())
    } else {
        TaskError::Fatal(err.to_string())
    }
}

fn into_task_error(err: ReleaseError) -> TaskError {
    match err {
        ReleaseError::Store(store) => store_task_error(store),
        other => TaskError::Fatal(other.to_string()),
    }
}
