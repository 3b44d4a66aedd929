use thiserror::Error;

use gantry_core::ValidationError;
use gantry_registry::RegistryError;
use gantry_transform::TransformError;

use crate::chart::ChartError;

/// How the pipeline treats a failed distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Configuration problem. Never retried; reported to the operator.
    Validation,
    /// Infrastructure flakiness. Retried within the distributor's budget.
    Transient,
    /// A bug in resource generation. Aborts the worker task.
    Fatal,
}

#[derive(Debug, Clone, Error)]
pub enum DistributeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("transient distribution failure: {0}")]
    Transient(String),

    #[error("fatal distribution failure: {0}")]
    Fatal(String),
}

impl DistributeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) => ErrorClass::Validation,
            Self::Transient(_) => ErrorClass::Transient,
            Self::Fatal(_) => ErrorClass::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

impl From<TransformError> for DistributeError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::Validation(e) => Self::Validation(e),
            other => Self::Fatal(other.to_string()),
        }
    }
}

impl From<RegistryError> for DistributeError {
    fn from(err: RegistryError) -> Self {
        if err.is_retryable() {
            Self::Transient(err.to_string())
        } else {
            Self::Fatal(err.to_string())
        }
    }
}

impl From<ChartError> for DistributeError {
    fn from(err: ChartError) -> Self {
        if err.is_retryable() {
            Self::Transient(err.to_string())
        } else {
            Self::Fatal(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gantry_core::BackendId;

    use super::*;

    #[test]
    fn classification() {
        let validation: DistributeError =
            TransformError::Validation(ValidationError::EmptyBackendHosts {
                backend: "users".into(),
            })
            .into();
        assert_eq!(validation.class(), ErrorClass::Validation);

        let duplicate: DistributeError = TransformError::DuplicateServiceId {
            id: "gw.prod.users".into(),
            first: BackendId(1),
            second: BackendId(2),
        }
        .into();
        assert_eq!(duplicate.class(), ErrorClass::Fatal);

        let timeout: DistributeError = RegistryError::Timeout(Duration::from_secs(3)).into();
        assert!(timeout.is_retryable());

        let bad_key: DistributeError = RegistryError::InvalidKey {
            key: "a//b".into(),
            reason: "empty path segment".into(),
        }
        .into();
        assert_eq!(bad_key.class(), ErrorClass::Fatal);
    }
}
