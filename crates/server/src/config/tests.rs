use std::time::Duration;

use gantry_distributor::InstanceKind;

use super::*;

#[test]
fn empty_file_yields_defaults() {
    let config = GantryConfig::parse("").unwrap();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8090);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.registry.backend, "memory");
    assert_eq!(config.registry.namespace, "gantry");
    assert_eq!(config.registry.schema_version, "v2");
    assert!(config.instances.is_empty());
    assert!(config.chart.base_url.is_none());
    assert!(config.catalog.seed.is_none());
}

#[test]
fn release_defaults_match_orchestrator_defaults() {
    let config = GantryConfig::parse("").unwrap();
    assert_eq!(
        config.release.to_release_config(),
        gantry_release::ReleaseConfig::default()
    );
    let release = config.release.to_release_config();
    assert_eq!(release.wait_cap(), Duration::from_secs(30));
    assert_eq!(release.reducer.grace_period, Duration::from_secs(600));
}

#[test]
fn release_timing_overrides() {
    let config = GantryConfig::parse(
        r#"
        [release]
        min_release_interval_ms = 500
        wait_cap_factor = 4
        event_grace_period_seconds = 60
        default_instance = "edge"
        "#,
    )
    .unwrap();
    let release = config.release.to_release_config();
    assert_eq!(release.wait_cap(), Duration::from_secs(2));
    assert_eq!(release.wait_poll_interval, Duration::from_millis(100));
    assert_eq!(release.reducer.grace_period, Duration::from_secs(60));
    assert_eq!(release.default_instance, "edge");
}

#[test]
fn executor_overrides_keep_other_defaults() {
    let config = GantryConfig::parse(
        r"
        [executor]
        max_concurrent = 4
        ",
    )
    .unwrap();
    let executor = config.executor.to_executor_config();
    assert_eq!(executor.max_concurrent, 4);
    assert_eq!(executor.retry.max_retries, 3);
    assert_eq!(executor.task_timeout, Duration::from_secs(300));
}

#[test]
fn etcd_registry_section() {
    let config = GantryConfig::parse(
        r#"
        [registry]
        backend = "etcd"
        endpoints = ["http://etcd-0:2379", "http://etcd-1:2379"]
        namespace = "apisix"
        request_timeout_ms = 1500
        max_retries = 1
        "#,
    )
    .unwrap();
    assert_eq!(config.registry.endpoints.len(), 2);
    assert_eq!(config.registry.layout().namespace, "apisix");
    assert_eq!(config.registry.layout().schema_version, "v2");
    assert_eq!(config.registry.request_timeout(), Duration::from_millis(1500));
    assert_eq!(config.registry.connect_timeout(), Duration::from_secs(5));
    assert_eq!(config.registry.retry().max_retries, 1);
}

#[test]
fn instances_and_global_plugins() {
    let config = GantryConfig::parse(
        r#"
        [chart]
        base_url = "https://charts.internal"
        token = "secret"

        [[instances]]
        name = "default"
        kind = "shared"

        [[instances]]
        name = "payments"
        kind = "dedicated"
        project = "gateways"
        cluster = "eu-1"
        namespace = "gw-payments"

        [[global_plugin_metadata]]
        name = "prometheus"
        config = { prefer_name = true }
        "#,
    )
    .unwrap();
    assert_eq!(config.instances.len(), 2);
    assert_eq!(config.instances[0].kind, InstanceKind::Shared);
    let InstanceKind::Dedicated(chart) = &config.instances[1].kind else {
        panic!("expected a dedicated instance");
    };
    assert_eq!(chart.namespace, "gw-payments");
    assert_eq!(config.chart.token.as_deref(), Some("secret"));
    assert_eq!(config.chart.request_timeout(), Duration::from_secs(30));
    assert_eq!(config.global_plugin_metadata[0].name, "prometheus");
    assert_eq!(
        config.global_plugin_metadata[0].config["prefer_name"],
        serde_json::json!(true)
    );
}

#[test]
fn unknown_types_are_rejected() {
    let err = GantryConfig::parse(
        r#"
        [server]
        port = "not-a-port"
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, ServerError::Config(_)));
}

#[test]
fn missing_file_yields_defaults() {
    let config = GantryConfig::load("/nonexistent/gantry.toml").unwrap();
    assert_eq!(config.server.port, 8090);
}
