//! Distribution strategies for Gantry releases.
//!
//! A [`Distributor`] pushes the wire resources of one release snapshot to a
//! data-plane instance and revokes them again. Shared instances read a
//! prefixed [`Registry`](gantry_registry::Registry); dedicated instances are
//! deployed from a generated chart.

pub mod chart;
pub mod dedicated;
pub mod distributor;
pub mod error;
pub mod instance;
pub mod shared;
pub mod target;

#[cfg(test)]
pub(crate) mod fixtures;

pub use chart::ChartClient;
pub use dedicated::DedicatedInstanceDistributor;
pub use distributor::Distributor;
pub use error::{DistributeError, ErrorClass};
pub use instance::InstanceDistributor;
pub use shared::SharedInstanceDistributor;
pub use target::{ChartTarget, InstanceKind, InstanceTarget, RevokeMode};
