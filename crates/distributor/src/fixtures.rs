use chrono::{TimeZone, Utc};

use gantry_core::{
    ActivationStatus, AuthRequirement, Backend, BackendConfig, BackendHost, BackendId, Gateway,
    GatewayId, LoadBalance, ReleaseSnapshot, ResourceId, ResourceSpec, ResourceVersion,
    ResourceVersionId, Scheme, Stage, StageBackend, StageId,
};
use gantry_transform::TransformContext;

pub(crate) fn snapshot(gateway: &str, stage: &str) -> ReleaseSnapshot {
    let gateway = Gateway::new(GatewayId(1), gateway).unwrap();
    let mut stage = Stage::new(StageId(1), GatewayId(1), stage)
        .unwrap()
        .with_var("prefix", "v1");
    stage.status = ActivationStatus::Active;
    ReleaseSnapshot {
        gateway,
        stage,
        version: ResourceVersion {
            id: ResourceVersionId(3),
            gateway_id: GatewayId(1),
            version: "1.0.0".into(),
            comment: String::new(),
            resources: vec![ResourceSpec {
                id: ResourceId(10),
                name: "list_users".into(),
                method: "GET".into(),
                path: "/users".into(),
                match_subpath: false,
                backend_id: BackendId(1),
                backend_path: "/{env.prefix}/users".into(),
                backend_method: None,
                timeout_secs: None,
                auth: AuthRequirement::default(),
            }],
            created_by: "admin".into(),
            created_time: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        },
        backends: vec![StageBackend {
            backend: Backend {
                id: BackendId(1),
                gateway_id: GatewayId(1),
                name: "users".into(),
            },
            config: BackendConfig {
                backend_id: BackendId(1),
                stage_id: StageId(1),
                hosts: vec![BackendHost {
                    scheme: Scheme::Http,
                    host: "users.internal:8080".into(),
                    weight: 100,
                }],
                loadbalance: LoadBalance::RoundRobin,
                timeout_secs: 30,
            },
        }],
        plugins: Vec::new(),
        certificates: Vec::new(),
    }
}

pub(crate) fn ctx(publish_id: i64) -> TransformContext {
    TransformContext::new(publish_id, Utc.timestamp_opt(1_700_000_100, 0).unwrap())
}
