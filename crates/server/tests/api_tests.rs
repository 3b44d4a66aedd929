use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{self, Request, StatusCode};
use chrono::Utc;
use tower::ServiceExt;

use gantry_core::{
    ActivationStatus, AuthRequirement, Backend, BackendConfig, BackendHost, BackendId, Gateway,
    GatewayId, LoadBalance, ResourceId, ResourceSpec, ResourceVersionId, ResourceVersionSpec,
    Scheme, Stage, StageId,
};
use gantry_executor::RetryPolicy;
use gantry_registry_memory::MemoryRegistry;
use gantry_release::{ReleaseConfig, ReleaseOrchestrator};
use gantry_server::api::{self, AppState};
use gantry_store::CatalogStore;
use gantry_store_memory::MemoryStore;

const GATEWAY: GatewayId = GatewayId(1);
const PROD: StageId = StageId(1);

fn resource_spec(backend_id: i64) -> ResourceSpec {
    ResourceSpec {
        id: ResourceId(10),
        name: "list_users".into(),
        method: "GET".into(),
        path: "/users".into(),
        match_subpath: false,
        backend_id: BackendId(backend_id),
        backend_path: "/{env.prefix}/users".into(),
        backend_method: None,
        timeout_secs: None,
        auth: AuthRequirement::default(),
    }
}

struct TestApp {
    store: Arc<MemoryStore>,
    orchestrator: ReleaseOrchestrator,
    version: ResourceVersionId,
}

async fn build_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    store.insert_gateway(Gateway::new(GATEWAY, "shop").unwrap());
    store.insert_stage(
        Stage::new(PROD, GATEWAY, "prod")
            .unwrap()
            .with_var("prefix", "v1"),
    );
    store.insert_backend(Backend {
        id: BackendId(1),
        gateway_id: GATEWAY,
        name: "users".into(),
    });
    store.insert_backend_config(BackendConfig {
        backend_id: BackendId(1),
        stage_id: PROD,
        hosts: vec![BackendHost {
            scheme: Scheme::Http,
            host: "users.internal:8080".into(),
            weight: 100,
        }],
        loadbalance: LoadBalance::RoundRobin,
        timeout_secs: 30,
    });
    let version = store
        .create_resource_version(
            GATEWAY,
            ResourceVersionSpec {
                version: "1.0.0".into(),
                comment: String::new(),
                resources: vec![resource_spec(1)],
            },
            "admin",
            Utc::now(),
        )
        .await
        .unwrap()
        .id;

    let orchestrator = ReleaseOrchestrator::builder()
        .store(store.clone())
        .registry(Arc::new(MemoryRegistry::new()))
        .retry(RetryPolicy::none())
        .config(ReleaseConfig {
            min_release_interval: Duration::from_millis(100),
            ..ReleaseConfig::default()
        })
        .build()
        .unwrap();

    TestApp {
        store,
        orchestrator,
        version,
    }
}

fn build_app(app: &TestApp) -> axum::Router {
    api::router(AppState {
        orchestrator: app.orchestrator.clone(),
    })
}

async fn send(
    router: axum::Router,
    method: http::Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(http::header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = router.oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

// -- Tests ----------------------------------------------------------------

#[tokio::test]
async fn health_returns_200() {
    let app = build_test_app().await;
    let (status, json) = send(build_app(&app), http::Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn create_resource_version_returns_201() {
    let app = build_test_app().await;
    let body = serde_json::json!({
        "version": "1.1.0",
        "comment": "add users",
        "resources": [resource_spec(1)],
        "actor": "alice",
    });
    let (status, json) = send(
        build_app(&app),
        http::Method::POST,
        "/v1/gateways/1/resource-versions",
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["version"], "1.1.0");
    assert_eq!(json["created_by"], "alice");
}

#[tokio::test]
async fn duplicate_resource_version_conflicts() {
    let app = build_test_app().await;
    let body = serde_json::json!({ "version": "1.0.0", "resources": [] });
    let (status, _) = send(
        build_app(&app),
        http::Method::POST,
        "/v1/gateways/1/resource-versions",
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn resource_version_with_foreign_backend_is_rejected() {
    let app = build_test_app().await;
    let body = serde_json::json!({ "version": "2.0.0", "resources": [resource_spec(99)] });
    let (status, json) = send(
        build_app(&app),
        http::Method::POST,
        "/v1/gateways/1/resource-versions",
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json.get("release_history_id").is_none());
}

#[tokio::test]
async fn publish_is_accepted_and_pollable() {
    let app = build_test_app().await;
    let body = serde_json::json!({
        "stage_id": PROD,
        "resource_version_id": app.version,
        "comment": "first release",
    });
    let (status, json) = send(
        build_app(&app),
        http::Method::POST,
        "/v1/gateways/1/releases",
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED, "{json}");
    let id = json["release_history_id"].as_i64().unwrap();

    app.orchestrator.shutdown().await;

    let (status, view) = send(
        build_app(&app),
        http::Method::GET,
        &format!("/v1/release-histories/{id}/events"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["release_history_id"], id);
    assert_eq!(view["steps"].as_array().unwrap().len(), 6);
    // Distribution finished; the data plane has not reported yet.
    assert_eq!(view["status"], "doing");

    let stage = app.store.get_stage(PROD).await.unwrap().unwrap();
    assert_eq!(stage.status, ActivationStatus::Active);
}

#[tokio::test]
async fn publish_to_unknown_stage_is_404() {
    let app = build_test_app().await;
    let body = serde_json::json!({ "stage_id": 42, "resource_version_id": app.version });
    let (status, json) = send(
        build_app(&app),
        http::Method::POST,
        "/v1/gateways/1/releases",
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("stage"));
}

#[tokio::test]
async fn publish_validation_failure_carries_history_id() {
    let app = build_test_app().await;
    app.store.set_stage_var(PROD, "9lives", "x");
    let body = serde_json::json!({ "stage_id": PROD, "resource_version_id": app.version });
    let (status, json) = send(
        build_app(&app),
        http::Method::POST,
        "/v1/gateways/1/releases",
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let id = json["release_history_id"].as_i64().unwrap();

    let (status, view) = send(
        build_app(&app),
        http::Method::GET,
        &format!("/v1/release-histories/{id}/events"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"], "failure");
}

#[tokio::test]
async fn stage_status_reports_pending_then_doing() {
    let app = build_test_app().await;
    let (status, json) = send(
        build_app(&app),
        http::Method::GET,
        "/v1/stages/status?stage_ids=1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["1"]["status"], "pending");
    assert!(json["1"]["publish_id"].is_null());

    let body = serde_json::json!({ "stage_id": PROD, "resource_version_id": app.version });
    send(
        build_app(&app),
        http::Method::POST,
        "/v1/gateways/1/releases",
        Some(body),
    )
    .await;
    app.orchestrator.shutdown().await;

    let (_, json) = send(
        build_app(&app),
        http::Method::GET,
        "/v1/stages/status?stage_ids=1",
        None,
    )
    .await;
    assert_eq!(json["1"]["status"], "doing");
    assert!(json["1"]["publish_id"].is_i64());
}

#[tokio::test]
async fn stage_status_rejects_bad_ids() {
    let app = build_test_app().await;
    let (status, _) = send(
        build_app(&app),
        http::Method::GET,
        "/v1/stages/status?stage_ids=prod",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn data_plane_report_completes_the_publish() {
    let app = build_test_app().await;
    let body = serde_json::json!({ "stage_id": PROD, "resource_version_id": app.version });
    let (_, json) = send(
        build_app(&app),
        http::Method::POST,
        "/v1/gateways/1/releases",
        Some(body),
    )
    .await;
    let id = json["release_history_id"].as_i64().unwrap();
    app.orchestrator.shutdown().await;

    let report = serde_json::json!({
        "step": "load_configuration",
        "status": "success",
        "detail": { "instance": "apisix-0" },
    });
    let (status, event) = send(
        build_app(&app),
        http::Method::POST,
        &format!("/v1/release-histories/{id}/events"),
        Some(report),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{event}");
    assert_eq!(event["step"], "load_configuration");

    let (_, view) = send(
        build_app(&app),
        http::Method::GET,
        &format!("/v1/release-histories/{id}/events"),
        None,
    )
    .await;
    assert_eq!(view["status"], "success");
}

#[tokio::test]
async fn control_plane_steps_cannot_be_reported() {
    let app = build_test_app().await;
    let body = serde_json::json!({ "stage_id": PROD, "resource_version_id": app.version });
    let (_, json) = send(
        build_app(&app),
        http::Method::POST,
        "/v1/gateways/1/releases",
        Some(body),
    )
    .await;
    let id = json["release_history_id"].as_i64().unwrap();

    let report = serde_json::json!({ "step": "distribute_configuration", "status": "success" });
    let (status, _) = send(
        build_app(&app),
        http::Method::POST,
        &format!("/v1/release-histories/{id}/events"),
        Some(report),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn events_of_unknown_history_are_404() {
    let app = build_test_app().await;
    let (status, _) = send(
        build_app(&app),
        http::Method::GET,
        "/v1/release-histories/404/events",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rolling_update_without_releases_schedules_nothing() {
    let app = build_test_app().await;
    let body = serde_json::json!({ "source": "plugin_bind", "actor": "bob" });
    let (status, json) = send(
        build_app(&app),
        http::Method::POST,
        "/v1/gateways/1/rolling-updates",
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED, "{json}");
    assert!(json["scheduled"].as_array().unwrap().is_empty());
    assert!(json["skipped"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn version_publish_is_not_a_rolling_update_source() {
    let app = build_test_app().await;
    let body = serde_json::json!({ "source": "version_publish" });
    let (status, _) = send(
        build_app(&app),
        http::Method::POST,
        "/v1/gateways/1/rolling-updates",
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn marker_follows_publish() {
    let app = build_test_app().await;
    let (status, json) = send(
        build_app(&app),
        http::Method::GET,
        "/v1/gateways/1/stages/1/marker",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.is_null());

    let body = serde_json::json!({ "stage_id": PROD, "resource_version_id": app.version });
    let (_, published) = send(
        build_app(&app),
        http::Method::POST,
        "/v1/gateways/1/releases",
        Some(body),
    )
    .await;
    app.orchestrator.shutdown().await;

    let (_, marker) = send(
        build_app(&app),
        http::Method::GET,
        "/v1/gateways/1/stages/1/marker",
        None,
    )
    .await;
    assert_eq!(marker["publish_id"], published["release_history_id"]);
}
