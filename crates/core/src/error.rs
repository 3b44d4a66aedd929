use thiserror::Error;

/// A configuration problem detected before any distribution is attempted.
///
/// Validation errors are never retried; they are recorded against the
/// `validate_configuration` step and surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid gateway name {0:?}")]
    InvalidGatewayName(String),

    #[error("invalid stage name {0:?}")]
    InvalidStageName(String),

    #[error("invalid stage variable name {0:?}")]
    InvalidVariableName(String),

    #[error("stage variable {name:?} referenced by {context} is not defined")]
    UnresolvedVariable { name: String, context: String },

    #[error("backend {backend:?} has no configuration for stage {stage:?}")]
    MissingBackendConfig { backend: String, stage: String },

    #[error("backend {backend:?} has no upstream hosts")]
    EmptyBackendHosts { backend: String },

    #[error("backend {backend:?} host {host:?} is malformed: {reason}")]
    MalformedHost {
        backend: String,
        host: String,
        reason: String,
    },

    #[error("resource version {version} does not belong to gateway {gateway}")]
    ForeignResourceVersion { version: String, gateway: String },

    #[error("stage {stage:?} is not active")]
    StageInactive { stage: String },

    #[error("gateway {gateway:?} is not active")]
    GatewayInactive { gateway: String },

    #[error("{0}")]
    Other(String),
}
