use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use gantry_core::{
    NewPublishEvent, PublishEvent, PublishStatus, PublishStep, ReleaseHistoryId,
};
use gantry_store::{EventLedger, StoreError};

/// Appends control-plane step transitions for one publish attempt.
#[derive(Clone)]
pub struct EventReporter {
    ledger: Arc<dyn EventLedger>,
    release_history_id: ReleaseHistoryId,
}

impl EventReporter {
    pub fn new(ledger: Arc<dyn EventLedger>, release_history_id: ReleaseHistoryId) -> Self {
        Self {
            ledger,
            release_history_id,
        }
    }

    pub fn release_history_id(&self) -> ReleaseHistoryId {
        self.release_history_id
    }

    pub async fn doing(&self, step: PublishStep) -> Result<PublishEvent, StoreError> {
        self.append(self.event(step, PublishStatus::Doing)).await
    }

    pub async fn success(&self, step: PublishStep) -> Result<PublishEvent, StoreError> {
        self.append(self.event(step, PublishStatus::Success)).await
    }

    pub async fn failure(
        &self,
        step: PublishStep,
        message: impl Into<String>,
    ) -> Result<PublishEvent, StoreError> {
        let event = self.event(step, PublishStatus::Failure).with_message(message);
        self.append(event).await
    }

    /// Record `step` as started and finished in one go.
    pub async fn completed(&self, step: PublishStep) -> Result<(), StoreError> {
        self.doing(step).await?;
        self.success(step).await?;
        Ok(())
    }

    /// Like [`failure`](Self::failure), but a ledger error is only logged.
    /// Used on paths that are already reporting another error.
    pub async fn try_failure(&self, step: PublishStep, message: impl Into<String>) {
        if let Err(e) = self.failure(step, message).await {
            warn!(
                release_history_id = %self.release_history_id,
                %step,
                error = %e,
                "failed to record publish event"
            );
        }
    }

    fn event(&self, step: PublishStep, status: PublishStatus) -> NewPublishEvent {
        NewPublishEvent::new(self.release_history_id, step, status, Utc::now())
    }

    async fn append(&self, event: NewPublishEvent) -> Result<PublishEvent, StoreError> {
        let event = self.ledger.append(event).await?;
        debug!(
            release_history_id = %event.release_history_id,
            step = %event.step,
            status = %event.status,
            "publish event recorded"
        );
        Ok(event)
    }
}

impl std::fmt::Debug for EventReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventReporter")
            .field("release_history_id", &self.release_history_id)
            .finish_non_exhaustive()
    }
}
