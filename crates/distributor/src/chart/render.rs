use std::fmt::Write as _;

use minijinja::{Environment, context};

use gantry_transform::WireResource;

use super::ChartError;
use super::values::split;

const FUEL_LIMIT: u64 = 10_000;

const CHART_YAML: &str = "\
apiVersion: v2
name: {{ name }}
description: {{ description }}
type: application
version: {{ version }}
appVersion: {{ app_version }}
";

const MANIFEST_API_VERSION: &str = "gateway.gantry.dev/v1";

/// Identity of one generated chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartMeta {
    /// Chart and release name.
    pub name: String,
    /// Chart version; one per publish.
    pub version: String,
    pub app_version: String,
    pub description: String,
}

impl ChartMeta {
    pub fn for_stage(gateway: &str, stage: &str, publish_id: i64, app_version: &str) -> Self {
        Self {
            name: kube_name(&format!("{gateway}-{stage}")),
            version: format!("1.0.{publish_id}"),
            app_version: app_version.to_owned(),
            description: format!("Gateway resources of {gateway}/{stage}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chart {
    pub meta: ChartMeta,
    pub chart_yaml: String,
    pub values_yaml: String,
    pub resources_yaml: String,
}

impl Chart {
    /// Files of the chart directory, relative to its root.
    pub fn files(&self) -> [(&'static str, &str); 3] {
        [
            ("Chart.yaml", self.chart_yaml.as_str()),
            ("values.yaml", self.values_yaml.as_str()),
            ("templates/resources.yaml", self.resources_yaml.as_str()),
        ]
    }

    pub fn archive_name(&self) -> String {
        format!("{}-{}.tgz", self.meta.name, self.meta.version)
    }
}

/// Render a chart holding `resources`.
pub fn render_chart(meta: ChartMeta, resources: &[WireResource]) -> Result<Chart, ChartError> {
    let split = split(resources).map_err(|e| ChartError::Render(e.to_string()))?;

    let mut env = Environment::new();
    env.set_fuel(Some(FUEL_LIMIT));
    let chart_yaml = env
        .render_str(
            CHART_YAML,
            context! {
                name => &meta.name,
                description => yaml_string(&meta.description)?,
                version => &meta.version,
                app_version => yaml_string(&meta.app_version)?,
            },
        )
        .map_err(|e| ChartError::Render(format!("Chart.yaml: {e}")))?;

    let values_yaml = serde_yaml_ng::to_string(&serde_json::json!({ "overrides": split.overrides }))
        .map_err(|e| ChartError::Render(format!("values.yaml: {e}")))?;

    let mut resources_yaml = String::new();
    for manifest in &split.manifests {
        // Infallible: writing to a String.
        let _ = write!(
            resources_yaml,
            "---\napiVersion: {MANIFEST_API_VERSION}\nkind: GatewayResource\nmetadata:\n  \
             name: {name}\n  namespace: {{{{ .Release.Namespace }}}}\n  labels:\n    \
             gateway.gantry.dev/kind: {kind}\nspec: {spec}\n",
            name = kube_name(&format!("{}-{}", manifest.kind, manifest.id)),
            kind = manifest.kind,
            spec = manifest.spec_template(),
        );
    }

    Ok(Chart {
        meta,
        chart_yaml,
        values_yaml,
        resources_yaml,
    })
}

/// Quote `value` so it stays a YAML string whatever it contains.
fn yaml_string(value: &str) -> Result<String, ChartError> {
    serde_json::to_string(value).map_err(|e| ChartError::Render(e.to_string()))
}

/// Lowercase DNS-1123 name, at most 63 characters.
fn kube_name(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .map(|c| match c.to_ascii_lowercase() {
            c @ ('a'..='z' | '0'..='9' | '-' | '.') => c,
            _ => '-',
        })
        .collect();
    let trimmed = mapped.trim_matches(|c| c == '-' || c == '.');
    let mut name: String = trimmed.chars().take(63).collect();
    while name.ends_with(['-', '.']) {
        name.pop();
    }
    if name.is_empty() {
        "gantry".to_owned()
    } else {
        name
    }
}
