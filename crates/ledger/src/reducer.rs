//! Derives the status of a publish attempt from its sparse event stream.
//!
//! Data-plane instances report asynchronously, may skip intermediate
//! events, and may die without reporting at all. The reducer fills the gaps:
//!
//! - a step with a terminal event but no `doing` gets a `doing` copied from
//!   its first event;
//! - a step still `doing` when a later step has events gets a `success`;
//! - the latest step still `doing` past the grace period gets a `failure`.
//!
//! Backfilled events carry negative ids and are never persisted.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;

use gantry_core::{PublishEvent, PublishEventId, PublishStatus, PublishStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReducerConfig {
    /// How long the latest step may stay unfinished before the attempt is
    /// considered dead.
    pub grace_period: Duration,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(10 * 60),
        }
    }
}

/// Backfilled event list and the overall status derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedEvents {
    /// Ordered by (step, status, created time, id).
    pub events: Vec<PublishEvent>,
    pub status: PublishStatus,
}

#[derive(Debug, Clone, Default)]
pub struct StatusReducer {
    config: ReducerConfig,
}

impl StatusReducer {
    pub fn new(config: ReducerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReducerConfig {
        &self.config
    }

    /// Reduce the events of one release history as seen at `now`.
    pub fn reduce(&self, events: &[PublishEvent], now: DateTime<Utc>) -> ReducedEvents {
        let Some(latest_time) = events.iter().map(|e| e.created_time).max() else {
            return ReducedEvents {
                events: Vec::new(),
                status: PublishStatus::Pending,
            };
        };
        let grace = chrono::Duration::from_std(self.config.grace_period)
            .unwrap_or(chrono::Duration::MAX);
        let stale = now.signed_duration_since(latest_time) > grace;

        let mut by_step: BTreeMap<PublishStep, Vec<PublishEvent>> = BTreeMap::new();
        for event in events {
            by_step.entry(event.step).or_default().push(event.clone());
        }
        let latest_step = by_step.keys().next_back().copied();

        let mut next_id = -1;
        let mut synthesize = |template: &PublishEvent, status, created_time, detail| {
            let event = PublishEvent {
                id: PublishEventId(next_id),
                release_history_id: template.release_history_id,
                step: template.step,
                status,
                detail,
                created_time,
            };
            next_id -= 1;
            event
        };

        let mut reduced = Vec::with_capacity(events.len() + 2);
        for (step, mut step_events) in by_step {
            step_events.sort_by_key(|e| (e.created_time, e.id));
            let first = step_events[0].clone();
            let last = step_events[step_events.len() - 1].clone();

            if !step_events.iter().any(|e| e.status == PublishStatus::Doing) {
                let doing = synthesize(
                    &first,
                    PublishStatus::Doing,
                    first.created_time,
                    first.detail.clone(),
                );
                step_events.push(doing);
            }

            if !step_events.iter().any(|e| e.status.is_terminal()) {
                if Some(step) != latest_step {
                    step_events.push(synthesize(
                        &last,
                        PublishStatus::Success,
                        last.created_time,
                        serde_json::Value::Null,
                    ));
                } else if stale {
                    step_events.push(synthesize(
                        &last,
                        PublishStatus::Failure,
                        last.created_time + grace,
                        json!({
                            "message": format!(
                                "no result reported for {step} within {}s",
                                self.config.grace_period.as_secs()
                            )
                        }),
                    ));
                }
            }
            reduced.extend(step_events);
        }
        reduced.sort_by_key(PublishEvent::sort_key);

        let status = overall_status(&reduced, latest_step, stale);
        ReducedEvents {
            events: reduced,
            status,
        }
    }
}

/// Terminal status of `step`, picking the later event when both exist.
fn terminal_of(events: &[PublishEvent], step: PublishStep) -> Option<PublishStatus> {
    events
        .iter()
        .filter(|e| e.step == step && e.status.is_terminal())
        .max_by_key(|e| (e.created_time, e.id.is_synthetic(), e.id))
        .map(|e| e.status)
}

fn overall_status(
    events: &[PublishEvent],
    latest_step: Option<PublishStep>,
    stale: bool,
) -> PublishStatus {
    let Some(latest_step) = latest_step else {
        return PublishStatus::Pending;
    };
    if terminal_of(events, PublishStep::last()) == Some(PublishStatus::Success) {
        return PublishStatus::Success;
    }
    if terminal_of(events, latest_step) == Some(PublishStatus::Failure) {
        return PublishStatus::Failure;
    }
    if stale {
        PublishStatus::Failure
    } else {
        PublishStatus::Doing
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use gantry_core::ReleaseHistoryId;

    use super::*;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn minutes(m: i64) -> DateTime<Utc> {
        t(m * 60)
    }

    fn event(id: i64, step: PublishStep, status: PublishStatus, at: DateTime<Utc>) -> PublishEvent {
        PublishEvent {
            id: PublishEventId(id),
            release_history_id: ReleaseHistoryId(1),
            step,
            status,
            detail: serde_json::Value::Null,
            created_time: at,
        }
    }

    fn control_plane_success() -> Vec<PublishEvent> {
        vec![
            event(1, PublishStep::ValidateConfiguration, PublishStatus::Doing, t(0)),
            event(2, PublishStep::ValidateConfiguration, PublishStatus::Success, t(1)),
            event(3, PublishStep::GenerateReleaseTask, PublishStatus::Doing, t(1)),
            event(4, PublishStep::GenerateReleaseTask, PublishStatus::Success, t(1)),
            event(5, PublishStep::DistributeConfiguration, PublishStatus::Doing, t(2)),
            event(6, PublishStep::DistributeConfiguration, PublishStatus::Success, t(3)),
        ]
    }

    fn reducer() -> StatusReducer {
        StatusReducer::default()
    }

    #[test]
    fn no_events_is_pending() {
        let reduced = reducer().reduce(&[], t(0));
        assert_eq!(reduced.status, PublishStatus::Pending);
        assert!(reduced.events.is_empty());
    }

    #[test]
    fn success_on_last_step_is_success() {
        let mut events = control_plane_success();
        events.push(event(7, PublishStep::LoadConfiguration, PublishStatus::Success, t(10)));

        let reduced = reducer().reduce(&events, minutes(60));
        assert_eq!(reduced.status, PublishStatus::Success);

        // The skipped `doing` of the last step is backfilled.
        let load: Vec<_> = reduced
            .events
            .iter()
            .filter(|e| e.step == PublishStep::LoadConfiguration)
            .collect();
        assert_eq!(load.len(), 2);
        assert_eq!(load[0].status, PublishStatus::Doing);
        assert!(load[0].id.is_synthetic());
        assert_eq!(load[0].created_time, t(10));
    }

    #[test]
    fn doing_on_last_step_times_out() {
        let mut events = control_plane_success();
        events.push(event(7, PublishStep::LoadConfiguration, PublishStatus::Doing, minutes(0)));

        let fresh = reducer().reduce(&events, minutes(5));
        assert_eq!(fresh.status, PublishStatus::Doing);

        let reduced = reducer().reduce(&events, minutes(11));
        assert_eq!(reduced.status, PublishStatus::Failure);
        let synthetic = reduced
            .events
            .iter()
            .find(|e| e.step == PublishStep::LoadConfiguration && e.status == PublishStatus::Failure)
            .unwrap();
        assert!(synthetic.id.is_synthetic());
        assert_eq!(synthetic.created_time, minutes(10));
    }

    #[test]
    fn stuck_apply_step_times_out() {
        let events = vec![event(
            1,
            PublishStep::ApplyConfiguration,
            PublishStatus::Doing,
            minutes(0),
        )];
        let reduced = reducer().reduce(&events, minutes(11));
        assert_eq!(reduced.status, PublishStatus::Failure);
        assert!(
            reduced
                .events
                .iter()
                .any(|e| e.status == PublishStatus::Failure && e.id.is_synthetic())
        );
    }

    #[test]
    fn earlier_unfinished_steps_are_backfilled_as_success() {
        let mut events = control_plane_success();
        events.push(event(7, PublishStep::ParseConfiguration, PublishStatus::Doing, t(20)));
        events.push(event(8, PublishStep::ApplyConfiguration, PublishStatus::Doing, t(30)));

        let reduced = reducer().reduce(&events, t(40));
        assert_eq!(reduced.status, PublishStatus::Doing);
        let parse_success = reduced
            .events
            .iter()
            .find(|e| e.step == PublishStep::ParseConfiguration && e.status == PublishStatus::Success)
            .unwrap();
        assert!(parse_success.id.is_synthetic());
        assert!(
            !reduced
                .events
                .iter()
                .any(|e| e.step == PublishStep::ApplyConfiguration && e.status.is_terminal()),
            "the in-flight step is left open within the grace period"
        );
    }

    #[test]
    fn reported_failure_is_failure() {
        let events = vec![
            event(1, PublishStep::ValidateConfiguration, PublishStatus::Doing, t(0)),
            event(2, PublishStep::ValidateConfiguration, PublishStatus::Failure, t(1)),
        ];
        let reduced = reducer().reduce(&events, t(2));
        assert_eq!(reduced.status, PublishStatus::Failure);
        assert_eq!(reduced.events.len(), 2, "nothing to backfill");
    }

    #[test]
    fn data_plane_failure_without_doing() {
        let mut events = control_plane_success();
        events.push(event(7, PublishStep::ParseConfiguration, PublishStatus::Failure, t(20)));
        let reduced = reducer().reduce(&events, t(21));
        assert_eq!(reduced.status, PublishStatus::Failure);
        assert!(
            reduced
                .events
                .iter()
                .any(|e| e.step == PublishStep::ParseConfiguration
                    && e.status == PublishStatus::Doing
                    && e.id.is_synthetic())
        );
    }

    #[test]
    fn distributed_but_silent_data_plane_goes_stale() {
        let events = control_plane_success();
        assert_eq!(reducer().reduce(&events, minutes(9)).status, PublishStatus::Doing);
        assert_eq!(reducer().reduce(&events, minutes(11)).status, PublishStatus::Failure);
    }

    #[test]
    fn grace_period_is_configurable() {
        let reducer = StatusReducer::new(ReducerConfig {
            grace_period: Duration::from_secs(30),
        });
        let events = vec![event(1, PublishStep::LoadConfiguration, PublishStatus::Doing, t(0))];
        assert_eq!(reducer.reduce(&events, t(30)).status, PublishStatus::Doing);
        assert_eq!(reducer.reduce(&events, t(31)).status, PublishStatus::Failure);
    }

    #[test]
    fn synthetic_ids_are_unique_and_negative() {
        let events = vec![
            event(1, PublishStep::ValidateConfiguration, PublishStatus::Success, t(0)),
            event(2, PublishStep::GenerateReleaseTask, PublishStatus::Success, t(1)),
            event(3, PublishStep::DistributeConfiguration, PublishStatus::Success, t(2)),
        ];
        let reduced = reducer().reduce(&events, t(3));
        let mut ids: Vec<i64> = reduced
            .events
            .iter()
            .filter(|e| e.id.is_synthetic())
            .map(|e| e.id.get())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| *id < 0));
    }
}
