use serde::{Deserialize, Serialize};

use crate::ids::{CertificateId, GatewayId, ResourceId, StageId};

/// Where a plugin is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum PluginScope {
    Stage(StageId),
    Resource(ResourceId),
}

/// A plugin configuration bound to a stage or a resource.
///
/// Bindings are live configuration: they are not captured by a resource
/// version, so editing one triggers a rolling update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginBinding {
    pub gateway_id: GatewayId,
    #[serde(flatten)]
    pub scope: PluginScope,
    /// Plugin type, e.g. `ip-restriction`.
    pub plugin_type: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Plugin metadata shared by every gateway on a data-plane instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginMetadataSpec {
    /// Plugin name; also the wire-resource id.
    pub name: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// TLS material bound to a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: CertificateId,
    pub stage_id: StageId,
    pub name: String,
    pub snis: Vec<String>,
    pub cert: String,
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_scope_is_flattened() {
        let binding = PluginBinding {
            gateway_id: GatewayId(1),
            scope: PluginScope::Resource(ResourceId(9)),
            plugin_type: "ip-restriction".into(),
            config: serde_json::json!({"whitelist": ["10.0.0.0/8"]}),
        };
        let value = serde_json::to_value(&binding).unwrap();
        assert_eq!(value["scope"], "resource");
        assert_eq!(value["id"], 9);
        let back: PluginBinding = serde_json::from_value(value).unwrap();
        assert_eq!(back, binding);
    }
}
