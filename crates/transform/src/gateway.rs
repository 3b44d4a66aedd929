use std::collections::{BTreeMap, HashMap};
use std::iter;

use serde_json::{Value, json};

use gantry_core::{
    BackendId, Gateway, PluginScope, ReleaseSnapshot, ResourceSpec, ResourceVersion, Stage,
    StageBackend, ValidationError, parse_host_port, vars,
};

use crate::Transformer;
use crate::context::TransformContext;
use crate::error::TransformError;
use crate::ident::make_id;
use crate::labels::{self, Labels};
use crate::resource::{
    ReleaseMarker, ResourceMeta, Route, Service, Ssl, Timeout, Upstream, UpstreamNode,
    WireResource,
};

const PROXY_REWRITE: &str = "proxy-rewrite";
const AUTH_VERIFY: &str = "auth-verify";

/// Renders one stage of one gateway.
///
/// Emits a Service per configured backend, a Route per resource of the
/// version, an Ssl per stage certificate, then the release marker. The
/// backend to service-id map is built on construction and must be
/// injective.
pub struct GatewayTransformer<'a> {
    snapshot: &'a ReleaseSnapshot,
    ctx: TransformContext,
    service_ids: HashMap<BackendId, String>,
}

impl<'a> GatewayTransformer<'a> {
    pub fn new(snapshot: &'a ReleaseSnapshot, ctx: TransformContext) -> Result<Self, TransformError> {
        let mut service_ids = HashMap::with_capacity(snapshot.backends.len());
        let mut owners: HashMap<String, BackendId> = HashMap::new();
        for entry in &snapshot.backends {
            let id = service_id(&snapshot.gateway, &snapshot.stage, &entry.backend.name);
            if let Some(first) = owners.insert(id.clone(), entry.backend.id) {
                return Err(TransformError::DuplicateServiceId {
                    id,
                    first,
                    second: entry.backend.id,
                });
            }
            service_ids.insert(entry.backend.id, id);
        }
        Ok(Self {
            snapshot,
            ctx,
            service_ids,
        })
    }

    /// Service id assigned to `backend`, if it has a configuration.
    pub fn service_id(&self, backend: BackendId) -> Option<&str> {
        self.service_ids.get(&backend).map(String::as_str)
    }

    fn labels(&self) -> Labels {
        base_labels(&self.snapshot.gateway, &self.snapshot.stage, self.ctx.publish_id)
    }

    fn stage_plugins(&self) -> BTreeMap<String, Value> {
        self.snapshot
            .plugins
            .iter()
            .filter(|b| b.scope == PluginScope::Stage(self.snapshot.stage.id))
            .map(|b| (b.plugin_type.clone(), b.config.clone()))
            .collect()
    }

    fn service(&self, entry: &StageBackend) -> Result<WireResource, TransformError> {
        let StageBackend { backend, config } = entry;
        let Some(first) = config.hosts.first() else {
            return Err(ValidationError::EmptyBackendHosts {
                backend: backend.name.clone(),
            }
            .into());
        };

        let mut nodes = Vec::with_capacity(config.hosts.len());
        for host in &config.hosts {
            if host.scheme != first.scheme {
                return Err(ValidationError::MalformedHost {
                    backend: backend.name.clone(),
                    host: host.host.clone(),
                    reason: "all hosts of a backend must share one scheme".to_owned(),
                }
                .into());
            }
            let context = format!("backend {} host", backend.name);
            let rendered = vars::render(&host.host, &self.snapshot.stage.vars, &context)?;
            let (name, port) =
                parse_host_port(&rendered).map_err(|reason| ValidationError::MalformedHost {
                    backend: backend.name.clone(),
                    host: rendered.clone(),
                    reason,
                })?;
            nodes.push(UpstreamNode {
                host: name,
                port: port.unwrap_or_else(|| host.scheme.default_port()),
                weight: host.weight,
            });
        }

        let id = self
            .service_id(backend.id)
            .ok_or_else(|| TransformError::Malformed {
                kind: "service",
                id: backend.name.clone(),
                reason: "backend has no service id".to_owned(),
            })?
            .to_owned();
        Ok(WireResource::Service(Service {
            meta: ResourceMeta {
                id,
                name: backend.name.clone(),
                labels: self.labels().with("gateway.backend", backend.name.as_str()),
            },
            upstream: Upstream {
                scheme: first.scheme,
                balance: config.loadbalance,
                nodes,
                timeout: Timeout::uniform(config.timeout_secs),
            },
            plugins: self.stage_plugins(),
        }))
    }

    fn route(&self, resource: &ResourceSpec) -> Result<WireResource, TransformError> {
        let gateway = &self.snapshot.gateway;
        let stage = &self.snapshot.stage;
        let service_id = self
            .service_id(resource.backend_id)
            .ok_or_else(|| ValidationError::MissingBackendConfig {
                backend: resource.backend_id.to_string(),
                stage: stage.name.clone(),
            })?
            .to_owned();

        let context = format!("resource {} backend path", resource.name);
        let upstream_path = vars::render(&resource.backend_path, &stage.vars, &context)?;

        let mut plugins: BTreeMap<String, Value> = self
            .snapshot
            .plugins
            .iter()
            .filter(|b| b.scope == PluginScope::Resource(resource.id))
            .map(|b| (b.plugin_type.clone(), b.config.clone()))
            .collect();
        plugins.insert(
            PROXY_REWRITE.to_owned(),
            json!({
                "uri": upstream_path,
                "method": resource.upstream_method(),
                "match_subpath": resource.match_subpath,
            }),
        );
        plugins.insert(
            AUTH_VERIFY.to_owned(),
            serde_json::to_value(&resource.auth)
                .map_err(|e| TransformError::Serialization(e.to_string()))?,
        );

        let methods = if resource.method.eq_ignore_ascii_case("ANY") {
            Vec::new()
        } else {
            vec![resource.method.to_ascii_uppercase()]
        };

        Ok(WireResource::Route(Route {
            meta: ResourceMeta {
                id: make_id(&[&gateway.name, &stage.name, &resource.id.to_string()]),
                name: resource.name.clone(),
                labels: self
                    .labels()
                    .with("gateway.resource_id", resource.id.get())
                    .with("gateway.resource_name", resource.name.as_str()),
            },
            uris: route_uris(&gateway.name, &stage.name, &resource.path, resource.match_subpath),
            methods,
            service_id,
            timeout: resource.timeout_secs.map(Timeout::uniform),
            plugins,
        }))
    }

    fn ssl(&self, certificate: &gantry_core::Certificate) -> WireResource {
        let gateway = &self.snapshot.gateway;
        let stage = &self.snapshot.stage;
        WireResource::Ssl(Ssl {
            meta: ResourceMeta {
                id: make_id(&[&gateway.name, &stage.name, &certificate.id.to_string()]),
                name: certificate.name.clone(),
                labels: self.labels(),
            },
            snis: certificate.snis.clone(),
            cert: certificate.cert.clone(),
            key: certificate.key.clone(),
        })
    }
}

impl Transformer for GatewayTransformer<'_> {
    fn resources(&self) -> Box<dyn Iterator<Item = Result<WireResource, TransformError>> + '_> {
        let snapshot = self.snapshot;
        let services = snapshot.backends.iter().map(|b| self.service(b));
        let routes = snapshot.version.resources.iter().map(|r| self.route(r));
        let ssls = snapshot.certificates.iter().map(|c| Ok(self.ssl(c)));
        let marker = iter::once_with(|| {
            Ok(release_marker(
                &snapshot.gateway,
                &snapshot.stage,
                Some(&snapshot.version),
                self.ctx,
            ))
        });
        Box::new(services.chain(routes).chain(ssls).chain(marker))
    }
}

fn service_id(gateway: &Gateway, stage: &Stage, backend_name: &str) -> String {
    make_id(&[&gateway.name, &stage.name, backend_name])
}

fn base_labels(gateway: &Gateway, stage: &Stage, publish_id: i64) -> Labels {
    Labels::new()
        .with(labels::GATEWAY_NAME, gateway.name.as_str())
        .with(labels::GATEWAY_STAGE, stage.name.as_str())
        .with(labels::PUBLISH_ID, publish_id)
}

/// Public uris of a resource: `/api/{gateway}/{stage}{path}`, plus a `/*`
/// variant when sub-paths match too.
pub fn route_uris(gateway: &str, stage: &str, path: &str, match_subpath: bool) -> Vec<String> {
    let path = if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    };
    let base = format!("/api/{gateway}/{stage}{path}");
    if match_subpath {
        let wildcard = format!("{}/*", base.trim_end_matches('/'));
        vec![base, wildcard]
    } else {
        vec![base]
    }
}

/// The marker describing what a stage prefix currently holds.
///
/// `version` is `None` for the marker-only set written by a revoke.
pub fn release_marker(
    gateway: &Gateway,
    stage: &Stage,
    version: Option<&ResourceVersion>,
    ctx: TransformContext,
) -> WireResource {
    WireResource::ReleaseMarker(ReleaseMarker {
        meta: ResourceMeta {
            id: make_id(&[&gateway.name, &stage.name, "release"]),
            name: format!("{}-{}", gateway.name, stage.name),
            labels: base_labels(gateway, stage, ctx.publish_id),
        },
        publish_id: ctx.publish_id,
        publish_time: ctx.publish_time,
        gateway: gateway.name.clone(),
        stage: stage.name.clone(),
        resource_version_id: version.map(|v| v.id.get()),
        resource_version: version.map(|v| v.version.clone()),
        revoked: version.is_none(),
    })
}
