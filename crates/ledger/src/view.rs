use serde::Serialize;

use gantry_core::{PublishEvent, PublishStatus, PublishStep, ReleaseHistoryId, StepReporter};

use crate::reducer::ReducedEvents;

/// One entry of the step template, as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepInfo {
    pub step: PublishStep,
    pub ordinal: usize,
    pub description: &'static str,
    pub reporter: StepReporter,
}

impl From<PublishStep> for StepInfo {
    fn from(step: PublishStep) -> Self {
        Self {
            step,
            ordinal: step.ordinal(),
            description: step.description(),
            reporter: step.reporter(),
        }
    }
}

/// Template plus the (backfilled) events of one publish attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishEventsView {
    pub release_history_id: ReleaseHistoryId,
    pub status: PublishStatus,
    pub steps: Vec<StepInfo>,
    pub events: Vec<PublishEvent>,
}

impl PublishEventsView {
    pub fn new(release_history_id: ReleaseHistoryId, reduced: ReducedEvents) -> Self {
        Self {
            release_history_id,
            status: reduced.status,
            steps: PublishStep::TEMPLATE.into_iter().map(StepInfo::from).collect(),
            events: reduced.events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_is_listed_in_order() {
        let view = PublishEventsView::new(
            ReleaseHistoryId(1),
            ReducedEvents {
                events: Vec::new(),
                status: PublishStatus::Pending,
            },
        );
        assert_eq!(view.steps.len(), 6);
        assert_eq!(view.steps[0].reporter, StepReporter::ControlPlane);
        assert_eq!(view.steps[5].step, PublishStep::LoadConfiguration);
        assert_eq!(view.steps[5].reporter, StepReporter::DataPlane);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["steps"][2]["step"], "distribute_configuration");
    }
}
