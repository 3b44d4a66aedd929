//! Release orchestration: turns operator and admin actions into publish,
//! rolling-update, and revoke attempts, and answers status queries.
//!
//! Attempts for one stage are serialized: a distribute task waits for the
//! previous attempt of its stage to finish (bounded by
//! [`ReleaseConfig::wait_cap`]). Attempts for different stages run in
//! parallel on the executor.

pub mod builder;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod query;
mod snapshot;
pub mod validate;

#[cfg(test)]
pub(crate) mod fixtures;

pub use builder::OrchestratorBuilder;
pub use config::ReleaseConfig;
pub use error::ReleaseError;
pub use orchestrator::{PublishRequest, ReleaseOrchestrator, RollingUpdateOutcome, SkippedStage};
pub use query::StageStatus;
pub use validate::validate_snapshot;
