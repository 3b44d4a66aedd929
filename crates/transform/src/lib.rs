//! Wire-resource model and the transformers producing it.
//!
//! A transformer turns one release snapshot (or the cross-gateway plugin
//! metadata) into a lazily produced sequence of [`WireResource`]s. Ids are
//! deterministic, so publishing the same logical object twice overwrites
//! instead of duplicating.

pub mod context;
pub mod error;
pub mod gateway;
pub mod global;
pub mod ident;
pub mod labels;
pub mod resource;

pub use context::TransformContext;
pub use error::TransformError;
pub use gateway::{GatewayTransformer, release_marker, route_uris};
pub use global::GlobalTransformer;
pub use ident::{MAX_ID_LEN, is_valid_id, make_id};
pub use labels::Labels;
pub use resource::{
    PluginMetadata, ReleaseMarker, ResourceKind, ResourceMeta, Route, Service, Ssl, Timeout,
    Upstream, UpstreamNode, WireResource,
};

/// A finite, lazily produced sequence of wire resources.
pub trait Transformer {
    fn resources(&self) -> Box<dyn Iterator<Item = Result<WireResource, TransformError>> + '_>;

    /// Drain the sequence, stopping at the first error.
    fn collect_resources(&self) -> Result<Vec<WireResource>, TransformError> {
        self.resources().collect()
    }
}
