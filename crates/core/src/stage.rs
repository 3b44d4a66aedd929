use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::gateway::ActivationStatus;
use crate::ids::{GatewayId, StageId};

static STAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]{0,19}$")
        .expect("stage name regex is valid")
});

static VAR_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]{0,49}$")
        .expect("variable name regex is valid")
});

/// A named deployment environment within a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub gateway_id: GatewayId,
    pub name: String,
    /// Free-form variables used for path and host templating.
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    /// Only a successful publish activates a stage.
    #[serde(default)]
    pub status: ActivationStatus,
    /// Dedicated data-plane instance; `None` means the shared default.
    #[serde(default)]
    pub instance: Option<String>,
}

impl Stage {
    pub fn new(
        id: StageId,
        gateway_id: GatewayId,
        name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if !STAGE_NAME.is_match(&name) {
            return Err(ValidationError::InvalidStageName(name));
        }
        Ok(Self {
            id,
            gateway_id,
            name,
            vars: BTreeMap::new(),
            status: ActivationStatus::Inactive,
            instance: None,
        })
    }

    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Check that every variable name is well-formed.
    pub fn validate_vars(&self) -> Result<(), ValidationError> {
        for key in self.vars.keys() {
            if !VAR_NAME.is_match(key) {
                return Err(ValidationError::InvalidVariableName(key.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_starts_inactive() {
        let stage = Stage::new(StageId(1), GatewayId(1), "prod").unwrap();
        assert!(!stage.is_active());
        assert!(stage.instance.is_none());
    }

    #[test]
    fn rejects_bad_stage_name() {
        assert!(Stage::new(StageId(1), GatewayId(1), "9prod").is_err());
        assert!(Stage::new(StageId(1), GatewayId(1), "").is_err());
    }

    #[test]
    fn validates_variable_names() {
        let stage = Stage::new(StageId(1), GatewayId(1), "prod")
            .unwrap()
            .with_var("domain", "example.com")
            .with_var("prefix_2", "/v2");
        assert!(stage.validate_vars().is_ok());

        let bad = stage.with_var("2bad", "x");
        assert_eq!(
            bad.validate_vars(),
            Err(ValidationError::InvalidVariableName("2bad".into()))
        );
    }
}
