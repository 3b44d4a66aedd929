//! The fixed publish pipeline and the events reported against it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{PublishEventId, ReleaseHistoryId};

/// One step of the publish pipeline, in template order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStep {
    ValidateConfiguration,
    GenerateReleaseTask,
    DistributeConfiguration,
    ParseConfiguration,
    ApplyConfiguration,
    LoadConfiguration,
}

/// Who reports a given step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepReporter {
    ControlPlane,
    DataPlane,
}

impl PublishStep {
    /// The pipeline template.
    pub const TEMPLATE: [Self; 6] = [
        Self::ValidateConfiguration,
        Self::GenerateReleaseTask,
        Self::DistributeConfiguration,
        Self::ParseConfiguration,
        Self::ApplyConfiguration,
        Self::LoadConfiguration,
    ];

    #[must_use]
    pub fn ordinal(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::TEMPLATE.get(ordinal).copied()
    }

    #[must_use]
    pub fn last() -> Self {
        Self::LoadConfiguration
    }

    #[must_use]
    pub fn is_last(self) -> bool {
        self == Self::last()
    }

    #[must_use]
    pub fn reporter(self) -> StepReporter {
        if self.ordinal() <= Self::DistributeConfiguration.ordinal() {
            StepReporter::ControlPlane
        } else {
            StepReporter::DataPlane
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidateConfiguration => "validate_configuration",
            Self::GenerateReleaseTask => "generate_release_task",
            Self::DistributeConfiguration => "distribute_configuration",
            Self::ParseConfiguration => "parse_configuration",
            Self::ApplyConfiguration => "apply_configuration",
            Self::LoadConfiguration => "load_configuration",
        }
    }

    /// Short description shown alongside the template in status views.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::ValidateConfiguration => "validate stage and backend configuration",
            Self::GenerateReleaseTask => "schedule the distribution task",
            Self::DistributeConfiguration => "write resources to the data-plane registry",
            Self::ParseConfiguration => "data plane parses the published resources",
            Self::ApplyConfiguration => "data plane applies the published resources",
            Self::LoadConfiguration => "data plane serves the new configuration",
        }
    }
}

impl std::fmt::Display for PublishStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a step, or of a whole publish attempt.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    #[default]
    Pending,
    Doing,
    Success,
    Failure,
}

impl PublishStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Doing => "doing",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl std::fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported status transition of one step. Rows are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishEvent {
    pub id: PublishEventId,
    pub release_history_id: ReleaseHistoryId,
    pub step: PublishStep,
    pub status: PublishStatus,
    #[serde(default)]
    pub detail: serde_json::Value,
    pub created_time: DateTime<Utc>,
}

impl PublishEvent {
    /// Ledger ordering: (step, status, created time, id).
    pub fn sort_key(&self) -> (PublishStep, PublishStatus, DateTime<Utc>, PublishEventId) {
        (self.step, self.status, self.created_time, self.id)
    }
}

/// An event that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPublishEvent {
    pub release_history_id: ReleaseHistoryId,
    pub step: PublishStep,
    pub status: PublishStatus,
    #[serde(default)]
    pub detail: serde_json::Value,
    pub created_time: DateTime<Utc>,
}

impl NewPublishEvent {
    pub fn new(
        release_history_id: ReleaseHistoryId,
        step: PublishStep,
        status: PublishStatus,
        created_time: DateTime<Utc>,
    ) -> Self {
        Self {
            release_history_id,
            step,
            status,
            detail: serde_json::Value::Null,
            created_time,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }

    /// Attach an error message as `{"message": ...}`.
    #[must_use]
    pub fn with_message(self, message: impl Into<String>) -> Self {
        let message: String = message.into();
        self.with_detail(serde_json::json!({ "message": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_is_ordered_by_ordinal() {
        for (i, step) in PublishStep::TEMPLATE.iter().enumerate() {
            assert_eq!(step.ordinal(), i);
            assert_eq!(PublishStep::from_ordinal(i), Some(*step));
        }
        assert_eq!(PublishStep::from_ordinal(6), None);
        assert!(PublishStep::LoadConfiguration.is_last());
        assert!(!PublishStep::ApplyConfiguration.is_last());
    }

    #[test]
    fn first_three_steps_are_control_plane() {
        let reporters: Vec<_> = PublishStep::TEMPLATE.iter().map(|s| s.reporter()).collect();
        assert_eq!(
            reporters,
            vec![
                StepReporter::ControlPlane,
                StepReporter::ControlPlane,
                StepReporter::ControlPlane,
                StepReporter::DataPlane,
                StepReporter::DataPlane,
                StepReporter::DataPlane,
            ]
        );
    }

    #[test]
    fn step_serializes_as_snake_case_name() {
        let json = serde_json::to_string(&PublishStep::ApplyConfiguration).unwrap();
        assert_eq!(json, "\"apply_configuration\"");
        assert_eq!(PublishStep::ApplyConfiguration.to_string(), "apply_configuration");
    }

    #[test]
    fn only_success_and_failure_are_terminal() {
        assert!(!PublishStatus::Pending.is_terminal());
        assert!(!PublishStatus::Doing.is_terminal());
        assert!(PublishStatus::Success.is_terminal());
        assert!(PublishStatus::Failure.is_terminal());
    }
}
