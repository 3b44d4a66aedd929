use std::fmt;

use crate::error::RegistryError;

/// Placeholder for the gateway and stage segments of the global prefix.
/// Gateway names never consist of a bare `-`, so it cannot collide.
pub const GLOBAL_SEGMENT: &str = "-";

/// A key prefix owning one stage's (or the global) published resources.
///
/// Format: `{namespace}/{instance}/{gateway}/{stage}/{schema_version}/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryPrefix {
    namespace: String,
    instance: String,
    gateway: String,
    stage: String,
    schema_version: String,
}

impl RegistryPrefix {
    pub fn new(
        namespace: impl Into<String>,
        instance: impl Into<String>,
        gateway: impl Into<String>,
        stage: impl Into<String>,
        schema_version: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let prefix = Self {
            namespace: namespace.into(),
            instance: instance.into(),
            gateway: gateway.into(),
            stage: stage.into(),
            schema_version: schema_version.into(),
        };
        for segment in [
            &prefix.namespace,
            &prefix.instance,
            &prefix.gateway,
            &prefix.stage,
            &prefix.schema_version,
        ] {
            check_segment(segment, &prefix)?;
        }
        Ok(prefix)
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn is_global(&self) -> bool {
        self.gateway == GLOBAL_SEGMENT && self.stage == GLOBAL_SEGMENT
    }

    /// Full key of one resource: `{prefix}{kind}/{id}`.
    pub fn key(&self, kind: &str, id: &str) -> String {
        format!("{self}{kind}/{id}")
    }

    /// Whether `key` lives under this prefix.
    pub fn contains(&self, key: &str) -> bool {
        key.starts_with(&self.to_string())
    }
}

impl fmt::Display for RegistryPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}/",
            self.namespace, self.instance, self.gateway, self.stage, self.schema_version
        )
    }
}

fn check_segment(segment: &str, prefix: &RegistryPrefix) -> Result<(), RegistryError> {
    let reason = if segment.is_empty() {
        "empty path segment"
    } else if segment.contains('/') {
        "path segment contains '/'"
    } else {
        return Ok(());
    };
    Err(RegistryError::InvalidKey {
        key: prefix.to_string(),
        reason: reason.to_owned(),
    })
}

/// Namespace and schema version shared by every prefix of one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryLayout {
    pub namespace: String,
    pub schema_version: String,
}

impl Default for RegistryLayout {
    fn default() -> Self {
        Self {
            namespace: "gantry".to_owned(),
            schema_version: "v2".to_owned(),
        }
    }
}

impl RegistryLayout {
    pub fn stage_prefix(
        &self,
        instance: &str,
        gateway: &str,
        stage: &str,
    ) -> Result<RegistryPrefix, RegistryError> {
        RegistryPrefix::new(
            self.namespace.as_str(),
            instance,
            gateway,
            stage,
            self.schema_version.as_str(),
        )
    }

    /// Prefix for cross-gateway resources of one instance.
    pub fn global_prefix(&self, instance: &str) -> Result<RegistryPrefix, RegistryError> {
        self.stage_prefix(instance, GLOBAL_SEGMENT, GLOBAL_SEGMENT)
    }
}
