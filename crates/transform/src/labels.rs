use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GATEWAY_NAME: &str = "gateway.name";
pub const GATEWAY_STAGE: &str = "gateway.stage";
pub const PUBLISH_ID: &str = "gateway.publish_id";

/// Flat string labels. The registry only accepts string values, so every
/// value is coerced on insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(BTreeMap<String, String>);

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert any JSON value, coerced to a string.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), coerce(&value.into()));
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn coerce(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn values_are_coerced_to_strings() {
        let labels = Labels::new()
            .with(PUBLISH_ID, 42)
            .with("enabled", true)
            .with("name", "users")
            .with("empty", Value::Null)
            .with("list", json!(["a", 1]));
        assert_eq!(labels.get(PUBLISH_ID), Some("42"));
        assert_eq!(labels.get("enabled"), Some("true"));
        assert_eq!(labels.get("name"), Some("users"));
        assert_eq!(labels.get("empty"), Some(""));
        assert_eq!(labels.get("list"), Some(r#"["a",1]"#));
    }

    #[test]
    fn serializes_as_flat_string_map() {
        let labels = Labels::new().with(GATEWAY_NAME, "payments").with(PUBLISH_ID, 7);
        assert_eq!(
            serde_json::to_value(&labels).unwrap(),
            json!({"gateway.name": "payments", "gateway.publish_id": "7"})
        );
    }
}
