use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{BackendId, GatewayId, ResourceId, ResourceVersionId};

/// Authentication requirements enforced by the data plane for one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequirement {
    #[serde(default)]
    pub app_verified_required: bool,
    #[serde(default)]
    pub auth_verified_required: bool,
    #[serde(default)]
    pub resource_perm_required: bool,
}

/// One public resource as captured in a [`ResourceVersion`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub id: ResourceId,
    pub name: String,
    /// HTTP method, or `ANY`.
    pub method: String,
    /// Public path, relative to the stage root. May contain path params.
    pub path: String,
    /// Also match every path below `path`.
    #[serde(default)]
    pub match_subpath: bool,
    pub backend_id: BackendId,
    /// Upstream path; may contain `{env.NAME}` placeholders.
    pub backend_path: String,
    /// Upstream method. Defaults to the public method.
    #[serde(default)]
    pub backend_method: Option<String>,
    /// Per-resource override of the backend timeout, in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u32>,
    #[serde(default)]
    pub auth: AuthRequirement,
}

impl ResourceSpec {
    #[must_use]
    pub fn upstream_method(&self) -> &str {
        self.backend_method.as_deref().unwrap_or(&self.method)
    }
}

/// Content submitted by an operator to create a new version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceVersionSpec {
    /// Human-readable version label, e.g. `1.4.0`. Must be unique per gateway.
    pub version: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub resources: Vec<ResourceSpec>,
}

/// Immutable snapshot of a gateway's public resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceVersion {
    pub id: ResourceVersionId,
    pub gateway_id: GatewayId,
    pub version: String,
    pub comment: String,
    pub resources: Vec<ResourceSpec>,
    pub created_by: String,
    pub created_time: DateTime<Utc>,
}

impl ResourceVersion {
    /// Backends referenced by at least one resource, deduplicated, in
    /// ascending id order.
    #[must_use]
    pub fn referenced_backends(&self) -> Vec<BackendId> {
        let mut ids: Vec<BackendId> = self.resources.iter().map(|r| r.backend_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Whether this version was created after `other`.
    #[must_use]
    pub fn is_newer_than(&self, other: ResourceVersionId) -> bool {
        self.id > other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: i64, backend: i64) -> ResourceSpec {
        ResourceSpec {
            id: ResourceId(id),
            name: format!("r{id}"),
            method: "GET".into(),
            path: format!("/r{id}"),
            match_subpath: false,
            backend_id: BackendId(backend),
            backend_path: "/".into(),
            backend_method: None,
            timeout_secs: None,
            auth: AuthRequirement::default(),
        }
    }

    #[test]
    fn referenced_backends_are_deduplicated() {
        let version = ResourceVersion {
            id: ResourceVersionId(3),
            gateway_id: GatewayId(1),
            version: "1.0.0".into(),
            comment: String::new(),
            resources: vec![resource(1, 5), resource(2, 2), resource(3, 5)],
            created_by: "admin".into(),
            created_time: Utc::now(),
        };
        assert_eq!(version.referenced_backends(), vec![BackendId(2), BackendId(5)]);
        assert!(version.is_newer_than(ResourceVersionId(2)));
        assert!(!version.is_newer_than(ResourceVersionId(3)));
    }

    #[test]
    fn upstream_method_falls_back_to_public_method() {
        let mut r = resource(1, 1);
        assert_eq!(r.upstream_method(), "GET");
        r.backend_method = Some("POST".into());
        assert_eq!(r.upstream_method(), "POST");
    }
}
