use crate::entry::RegistryEntry;
use crate::error::RegistryError;
use crate::prefix::{RegistryLayout, RegistryPrefix};
use crate::registry::Registry;

fn layout(namespace: &str) -> RegistryLayout {
    RegistryLayout {
        namespace: namespace.to_owned(),
        schema_version: "v2".to_owned(),
    }
}

fn entry(kind: &str, id: &str, value: &str) -> RegistryEntry {
    RegistryEntry::new(kind, id, value)
}

/// Run the registry conformance suite.
///
/// `namespace` isolates the suite's keys from anything else in the backend;
/// pass a fresh value per run.
pub async fn run_registry_conformance_tests(
    registry: &dyn Registry,
    namespace: &str,
) -> Result<(), RegistryError> {
    let layout = layout(namespace);
    test_sync_writes_all_entries(registry, &layout).await?;
    test_sync_replaces_previous_set(registry, &layout).await?;
    test_sync_is_idempotent(registry, &layout).await?;
    test_prefix_isolation(registry, &layout).await?;
    test_delete_removes_prefix(registry, &layout).await?;
    test_empty_sync_clears_prefix(registry, &layout).await?;
    Ok(())
}

async fn scan_keys(
    registry: &dyn Registry,
    prefix: &RegistryPrefix,
) -> Result<Vec<String>, RegistryError> {
    Ok(registry.scan(prefix).await?.into_keys().collect())
}

async fn test_sync_writes_all_entries(
    registry: &dyn Registry,
    layout: &RegistryLayout,
) -> Result<(), RegistryError> {
    let prefix = layout.stage_prefix("default", "gw-write", "prod")?;
    let failed = registry
        .sync(
            &prefix,
            vec![
                entry("service", "gw-write.prod.1", r#"{"id":1}"#),
                entry("route", "gw-write.prod.10", r#"{"id":10}"#),
            ],
        )
        .await?;
    assert!(failed.is_empty(), "no entry should fail: {failed:?}");

    let stored = registry.scan(&prefix).await?;
    assert_eq!(stored.len(), 2);
    assert_eq!(
        stored.get(&prefix.key("service", "gw-write.prod.1")).map(String::as_str),
        Some(r#"{"id":1}"#)
    );
    Ok(())
}

async fn test_sync_replaces_previous_set(
    registry: &dyn Registry,
    layout: &RegistryLayout,
) -> Result<(), RegistryError> {
    let prefix = layout.stage_prefix("default", "gw-replace", "prod")?;
    registry
        .sync(
            &prefix,
            vec![
                entry("route", "a", "1"),
                entry("route", "b", "1"),
            ],
        )
        .await?;
    registry
        .sync(
            &prefix,
            vec![
                entry("route", "b", "2"),
                entry("route", "c", "2"),
            ],
        )
        .await?;

    let stored = registry.scan(&prefix).await?;
    assert_eq!(
        stored.keys().cloned().collect::<Vec<_>>(),
        vec![prefix.key("route", "b"), prefix.key("route", "c")],
        "stale key should be removed"
    );
    assert_eq!(stored.get(&prefix.key("route", "b")).map(String::as_str), Some("2"));
    Ok(())
}

async fn test_sync_is_idempotent(
    registry: &dyn Registry,
    layout: &RegistryLayout,
) -> Result<(), RegistryError> {
    let prefix = layout.stage_prefix("default", "gw-idem", "prod")?;
    let entries = vec![
        entry("service", "s", "{}"),
        entry("route", "r", "{}"),
    ];
    registry.sync(&prefix, entries.clone()).await?;
    let once = registry.scan(&prefix).await?;
    registry.sync(&prefix, entries).await?;
    let twice = registry.scan(&prefix).await?;
    assert_eq!(once, twice, "second sync must not change the stored set");
    Ok(())
}

async fn test_prefix_isolation(
    registry: &dyn Registry,
    layout: &RegistryLayout,
) -> Result<(), RegistryError> {
    let prod = layout.stage_prefix("default", "gw-iso", "prod")?;
    let test = layout.stage_prefix("default", "gw-iso", "test")?;
    let prod_long = layout.stage_prefix("default", "gw-iso", "prodx")?;

    registry.sync(&prod, vec![entry("route", "p", "1")]).await?;
    registry.sync(&test, vec![entry("route", "t", "1")]).await?;
    registry.sync(&prod_long, vec![entry("route", "x", "1")]).await?;

    registry.sync(&prod, vec![]).await?;
    assert_eq!(scan_keys(registry, &test).await?, vec![test.key("route", "t")]);
    assert_eq!(
        scan_keys(registry, &prod_long).await?,
        vec![prod_long.key("route", "x")],
        "a prefix must not match a sibling sharing its leading characters"
    );

    registry.delete(&test).await?;
    assert_eq!(
        scan_keys(registry, &prod_long).await?,
        vec![prod_long.key("route", "x")]
    );
    Ok(())
}

async fn test_delete_removes_prefix(
    registry: &dyn Registry,
    layout: &RegistryLayout,
) -> Result<(), RegistryError> {
    let prefix = layout.stage_prefix("default", "gw-delete", "prod")?;
    registry
        .sync(
            &prefix,
            vec![
                entry("route", "a", "1"),
                entry("service", "b", "1"),
            ],
        )
        .await?;
    let removed = registry.delete(&prefix).await?;
    assert_eq!(removed, 2);
    assert!(registry.scan(&prefix).await?.is_empty());

    let removed = registry.delete(&prefix).await?;
    assert_eq!(removed, 0, "deleting an empty prefix removes nothing");
    Ok(())
}

async fn test_empty_sync_clears_prefix(
    registry: &dyn Registry,
    layout: &RegistryLayout,
) -> Result<(), RegistryError> {
    let prefix = layout.stage_prefix("default", "gw-empty", "prod")?;
    registry.sync(&prefix, vec![entry("route", "a", "1")]).await?;
    let failed = registry.sync(&prefix, vec![]).await?;
    assert!(failed.is_empty());
    assert!(registry.scan(&prefix).await?.is_empty());
    Ok(())
}
