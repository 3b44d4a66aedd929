use std::collections::BTreeMap;

use serde_json::Value;

use gantry_transform::{ResourceKind, TransformError, WireResource};

/// A field of one resource kind that deployments may override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverridableField {
    pub kind: ResourceKind,
    /// Dotted path into the resource payload.
    pub path: &'static str,
}

pub const OVERRIDABLE_FIELDS: &[OverridableField] = &[
    OverridableField {
        kind: ResourceKind::Service,
        path: "upstream.nodes",
    },
    OverridableField {
        kind: ResourceKind::Service,
        path: "upstream.timeout",
    },
    OverridableField {
        kind: ResourceKind::Route,
        path: "timeout",
    },
    OverridableField {
        kind: ResourceKind::Route,
        path: "plugins",
    },
    OverridableField {
        kind: ResourceKind::PluginMetadata,
        path: "config",
    },
];

/// Key of one overridable value under `.Values.overrides`.
pub fn override_key(kind: ResourceKind, id: &str, path: &str) -> String {
    format!("{kind}.{id}.{path}")
}

/// A resource payload whose overridable fields were replaced by
/// placeholders.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Manifest {
    pub kind: ResourceKind,
    pub id: String,
    pub spec: Value,
    /// Override keys referenced from `spec`.
    pub overrides: Vec<String>,
}

impl Manifest {
    /// The manifest spec as a single JSON line, with placeholders turned into
    /// template lookups of the chart values.
    pub fn spec_template(&self) -> String {
        let mut rendered = self.spec.to_string();
        for key in &self.overrides {
            rendered = rendered.replace(
                &format!("\"{}\"", placeholder(key)),
                &format!("{{{{ index .Values.overrides \"{key}\" | toJson }}}}"),
            );
        }
        rendered
    }
}

/// Manifests plus the values they reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SplitValues {
    pub manifests: Vec<Manifest>,
    pub overrides: BTreeMap<String, Value>,
}

fn placeholder(key: &str) -> String {
    format!("@@override:{key}@@")
}

/// Move every overridable field out of the payloads into `overrides`.
pub(crate) fn split(resources: &[WireResource]) -> Result<SplitValues, TransformError> {
    let mut out = SplitValues::default();
    for resource in resources {
        let kind = resource.kind();
        let mut spec = resource.to_value()?;
        let mut keys = Vec::new();
        for field in OVERRIDABLE_FIELDS.iter().filter(|f| f.kind == kind) {
            let pointer = format!("/{}", field.path.replace('.', "/"));
            let Some(slot) = spec.pointer_mut(&pointer) else {
                continue;
            };
            let key = override_key(kind, resource.id(), field.path);
            let value = std::mem::replace(slot, Value::String(placeholder(&key)));
            out.overrides.insert(key.clone(), value);
            keys.push(key);
        }
        out.manifests.push(Manifest {
            kind,
            id: resource.id().to_owned(),
            spec,
            overrides: keys,
        });
    }
    Ok(out)
}
