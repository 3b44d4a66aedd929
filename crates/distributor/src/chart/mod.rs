//! Chart generation for dedicated data-plane instances.
//!
//! A chart holds `Chart.yaml`, `values.yaml` with the overridable fields,
//! and `templates/resources.yaml` with one manifest per wire resource.

pub mod client;
pub mod package;
pub mod render;
pub mod values;

use thiserror::Error;

pub use client::{ChartClient, ChartRelease, EnsureOutcome, HttpChartClient};
pub use package::package;
pub use render::{Chart, ChartMeta, render_chart};
pub use values::{OVERRIDABLE_FIELDS, OverridableField, override_key};

#[derive(Debug, Clone, Error)]
pub enum ChartError {
    #[error("chart render error: {0}")]
    Render(String),

    #[error("chart packaging error: {0}")]
    Package(String),

    #[error("chart service unavailable: {0}")]
    Unavailable(String),

    #[error("chart service rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl ChartError {
    /// Returns `true` if the request may succeed when tried again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
