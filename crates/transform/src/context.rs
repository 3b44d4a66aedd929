use chrono::{DateTime, Utc};

/// Per-publish values stamped onto every emitted resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformContext {
    /// Equal to the release history id of the attempt.
    pub publish_id: i64,
    pub publish_time: DateTime<Utc>,
}

impl TransformContext {
    pub fn new(publish_id: i64, publish_time: DateTime<Utc>) -> Self {
        Self {
            publish_id,
            publish_time,
        }
    }
}
