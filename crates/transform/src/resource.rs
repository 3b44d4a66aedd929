use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use gantry_core::{LoadBalance, Scheme};

use crate::error::TransformError;
use crate::ident::is_valid_id;
use crate::labels::Labels;

/// The closed set of resource kinds the data plane understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Service,
    Route,
    Ssl,
    PluginMetadata,
    ReleaseMarker,
}

impl ResourceKind {
    /// Registry key segment for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Route => "route",
            Self::Ssl => "ssl",
            Self::PluginMetadata => "plugin_metadata",
            Self::ReleaseMarker => "release",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields shared by every wire resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMeta {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeout {
    pub connect: u32,
    pub send: u32,
    pub read: u32,
}

impl Timeout {
    pub fn uniform(secs: u32) -> Self {
        Self {
            connect: secs,
            send: secs,
            read: secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamNode {
    pub host: String,
    pub port: u16,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upstream {
    pub scheme: Scheme,
    #[serde(rename = "type")]
    pub balance: LoadBalance,
    pub nodes: Vec<UpstreamNode>,
    pub timeout: Timeout,
}

/// Upstream wiring of one backend for one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub upstream: Upstream,
    #[serde(default)]
    pub plugins: BTreeMap<String, Value>,
}

/// One public resource. References its service by id only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub uris: Vec<String>,
    /// Empty means any method.
    #[serde(default)]
    pub methods: Vec<String>,
    pub service_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Timeout>,
    #[serde(default)]
    pub plugins: BTreeMap<String, Value>,
}

/// TLS material for a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ssl {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub snis: Vec<String>,
    pub cert: String,
    pub key: String,
}

/// Instance-wide configuration of one plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginMetadata {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub config: Value,
}

/// Records which publish produced the content of a stage prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseMarker {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub publish_id: i64,
    pub publish_time: DateTime<Utc>,
    pub gateway: String,
    pub stage: String,
    #[serde(default)]
    pub resource_version_id: Option<i64>,
    #[serde(default)]
    pub resource_version: Option<String>,
    /// Set when the stage was revoked; the prefix holds nothing else.
    #[serde(default)]
    pub revoked: bool,
}

/// A resource ready to be published.
#[derive(Debug, Clone, PartialEq)]
pub enum WireResource {
    Service(Service),
    Route(Route),
    Ssl(Ssl),
    PluginMetadata(PluginMetadata),
    ReleaseMarker(ReleaseMarker),
}

impl WireResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Service(_) => ResourceKind::Service,
            Self::Route(_) => ResourceKind::Route,
            Self::Ssl(_) => ResourceKind::Ssl,
            Self::PluginMetadata(_) => ResourceKind::PluginMetadata,
            Self::ReleaseMarker(_) => ResourceKind::ReleaseMarker,
        }
    }

    pub fn meta(&self) -> &ResourceMeta {
        match self {
            Self::Service(r) => &r.meta,
            Self::Route(r) => &r.meta,
            Self::Ssl(r) => &r.meta,
            Self::PluginMetadata(r) => &r.meta,
            Self::ReleaseMarker(r) => &r.meta,
        }
    }

    pub fn id(&self) -> &str {
        &self.meta().id
    }

    pub fn labels(&self) -> &Labels {
        &self.meta().labels
    }

    /// JSON payload, after checking the id is well-formed.
    pub fn to_value(&self) -> Result<Value, TransformError> {
        if !is_valid_id(self.id()) {
            return Err(TransformError::Malformed {
                kind: self.kind().as_str(),
                id: self.id().to_owned(),
                reason: "id must match [A-Za-z0-9._-]{1,64}".to_owned(),
            });
        }
        let value = match self {
            Self::Service(r) => serde_json::to_value(r),
            Self::Route(r) => serde_json::to_value(r),
            Self::Ssl(r) => serde_json::to_value(r),
            Self::PluginMetadata(r) => serde_json::to_value(r),
            Self::ReleaseMarker(r) => serde_json::to_value(r),
        };
        value.map_err(|e| TransformError::Serialization(e.to_string()))
    }

    /// Compact JSON string, as stored in the registry.
    pub fn to_json(&self) -> Result<String, TransformError> {
        Ok(self.to_value()?.to_string())
    }
}
