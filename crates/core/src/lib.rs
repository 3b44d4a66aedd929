//! Data model shared by every stage of the release pipeline.

pub mod backend;
pub mod error;
pub mod event;
pub mod gateway;
pub mod ids;
pub mod plugin;
pub mod release;
pub mod resource;
pub mod snapshot;
pub mod stage;
pub mod vars;

pub use backend::{Backend, BackendConfig, BackendHost, LoadBalance, Scheme, parse_host_port};
pub use error::ValidationError;
pub use event::{NewPublishEvent, PublishEvent, PublishStatus, PublishStep, StepReporter};
pub use gateway::{ActivationStatus, Gateway, validate_gateway_name};
pub use ids::{
    BackendId, CertificateId, GatewayId, PublishEventId, ReleaseHistoryId, ResourceId,
    ResourceVersionId, StageId,
};
pub use plugin::{Certificate, PluginBinding, PluginMetadataSpec, PluginScope};
pub use release::{NewReleaseHistory, PublishSource, Release, ReleaseHistory, TriggerKind};
pub use resource::{AuthRequirement, ResourceSpec, ResourceVersion, ResourceVersionSpec};
pub use snapshot::{ReleaseSnapshot, StageBackend};
pub use stage::Stage;
