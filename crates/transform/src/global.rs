use gantry_core::PluginMetadataSpec;

use crate::Transformer;
use crate::context::TransformContext;
use crate::error::TransformError;
use crate::ident::is_valid_id;
use crate::labels::{self, Labels};
use crate::resource::{PluginMetadata, ResourceMeta, WireResource};

/// Renders the plugin metadata shared by every gateway on an instance.
pub struct GlobalTransformer<'a> {
    plugins: &'a [PluginMetadataSpec],
    ctx: TransformContext,
}

impl<'a> GlobalTransformer<'a> {
    pub fn new(plugins: &'a [PluginMetadataSpec], ctx: TransformContext) -> Self {
        Self { plugins, ctx }
    }

    fn metadata(&self, spec: &PluginMetadataSpec) -> Result<WireResource, TransformError> {
        // The plugin name is the id; the data plane looks metadata up by it.
        if !is_valid_id(&spec.name) {
            return Err(TransformError::Malformed {
                kind: "plugin_metadata",
                id: spec.name.clone(),
                reason: "plugin name is not a valid id".to_owned(),
            });
        }
        Ok(WireResource::PluginMetadata(PluginMetadata {
            meta: ResourceMeta {
                id: spec.name.clone(),
                name: spec.name.clone(),
                labels: Labels::new().with(labels::PUBLISH_ID, self.ctx.publish_id),
            },
            config: spec.config.clone(),
        }))
    }
}

impl Transformer for GlobalTransformer<'_> {
    fn resources(&self) -> Box<dyn Iterator<Item = Result<WireResource, TransformError>> + '_> {
        Box::new(self.plugins.iter().map(|p| self.metadata(p)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    #[test]
    fn emits_one_metadata_per_plugin() {
        let plugins = vec![
            PluginMetadataSpec {
                name: "bk-concurrency-limit".into(),
                config: json!({"max": 100}),
            },
            PluginMetadataSpec {
                name: "file-logger".into(),
                config: json!({"path": "/var/log/gw.log"}),
            },
        ];
        let transformer = GlobalTransformer::new(&plugins, TransformContext::new(5, Utc::now()));
        let resources = transformer.collect_resources().unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].id(), "bk-concurrency-limit");
        assert_eq!(resources[1].labels().get(labels::PUBLISH_ID), Some("5"));
    }

    #[test]
    fn invalid_plugin_name_is_fatal() {
        let plugins = vec![PluginMetadataSpec {
            name: "bad name".into(),
            config: json!({}),
        }];
        let transformer = GlobalTransformer::new(&plugins, TransformContext::new(1, Utc::now()));
        let err = transformer.collect_resources().unwrap_err();
        assert!(err.is_fatal());
    }
}
