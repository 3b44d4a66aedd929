use chrono::{Duration, Utc};

use gantry_core::{
    ActivationStatus, GatewayId, NewPublishEvent, NewReleaseHistory, PublishSource, PublishStatus,
    PublishStep, Release, ReleaseHistoryId, ResourceVersionId, ResourceVersionSpec, StageId,
};

use crate::catalog::CatalogStore;
use crate::error::StoreError;
use crate::ledger::EventLedger;
use crate::release::ReleaseStore;

fn new_history(stage: StageId, offset_secs: i64) -> NewReleaseHistory {
    NewReleaseHistory {
        gateway_id: GatewayId(1),
        stage_id: stage,
        resource_version_id: ResourceVersionId(1),
        source: PublishSource::VersionPublish,
        comment: String::new(),
        created_by: "conformance".to_owned(),
        created_time: Utc::now() + Duration::seconds(offset_secs),
    }
}

/// Run the [`ReleaseStore`] conformance suite against an empty store.
pub async fn run_release_store_conformance_tests(store: &dyn ReleaseStore) -> Result<(), StoreError> {
    test_release_upsert_overwrites(store).await?;
    test_history_lifecycle(store).await?;
    test_history_ordering(store).await?;
    test_update_missing_history(store).await?;
    Ok(())
}

async fn test_release_upsert_overwrites(store: &dyn ReleaseStore) -> Result<(), StoreError> {
    let gateway = GatewayId(10);
    let stage = StageId(100);
    assert!(store.get_release(gateway, stage).await?.is_none());

    let mut release = Release {
        gateway_id: gateway,
        stage_id: stage,
        resource_version_id: ResourceVersionId(1),
        comment: "first".to_owned(),
        updated_by: "conformance".to_owned(),
        updated_time: Utc::now(),
    };
    store.upsert_release(release.clone()).await?;
    release.resource_version_id = ResourceVersionId(2);
    store.upsert_release(release.clone()).await?;

    assert_eq!(store.get_release(gateway, stage).await?, Some(release));
    assert_eq!(
        store.list_releases(gateway).await?.len(),
        1,
        "one pointer per (gateway, stage)"
    );
    Ok(())
}

async fn test_history_lifecycle(store: &dyn ReleaseStore) -> Result<(), StoreError> {
    let created = store.create_history(new_history(StageId(200), 0)).await?;
    assert_eq!(created.status, PublishStatus::Pending);

    store
        .update_history_status(created.id, PublishStatus::Success)
        .await?;
    let loaded = store.get_history(created.id).await?;
    assert_eq!(loaded.map(|h| h.status), Some(PublishStatus::Success));
    Ok(())
}

async fn test_history_ordering(store: &dyn ReleaseStore) -> Result<(), StoreError> {
    let stage = StageId(300);
    let first = store.create_history(new_history(stage, 0)).await?;
    let second = store.create_history(new_history(stage, 1)).await?;
    store.create_history(new_history(StageId(301), 2)).await?;

    assert!(second.id > first.id, "history ids increase");
    assert_eq!(
        store.latest_history(stage).await?.map(|h| h.id),
        Some(second.id)
    );
    assert_eq!(
        store.previous_history(stage, second.id).await?.map(|h| h.id),
        Some(first.id)
    );
    assert!(store.previous_history(stage, first.id).await?.is_none());
    Ok(())
}

async fn test_update_missing_history(store: &dyn ReleaseStore) -> Result<(), StoreError> {
    let result = store
        .update_history_status(ReleaseHistoryId(i64::MAX), PublishStatus::Failure)
        .await;
    assert!(
        matches!(result, Err(StoreError::NotFound { .. })),
        "updating a missing history should be NotFound"
    );
    Ok(())
}

/// Run the [`EventLedger`] conformance suite against an empty ledger.
pub async fn run_event_ledger_conformance_tests(ledger: &dyn EventLedger) -> Result<(), StoreError> {
    let history = ReleaseHistoryId(1);
    let t0 = Utc::now();

    ledger
        .append(NewPublishEvent::new(
            history,
            PublishStep::DistributeConfiguration,
            PublishStatus::Success,
            t0 + Duration::seconds(3),
        ))
        .await?;
    ledger
        .append(NewPublishEvent::new(
            history,
            PublishStep::ValidateConfiguration,
            PublishStatus::Success,
            t0 + Duration::seconds(1),
        ))
        .await?;
    ledger
        .append(NewPublishEvent::new(
            history,
            PublishStep::ValidateConfiguration,
            PublishStatus::Doing,
            t0,
        ))
        .await?;
    ledger
        .append(NewPublishEvent::new(
            ReleaseHistoryId(2),
            PublishStep::ValidateConfiguration,
            PublishStatus::Doing,
            t0,
        ))
        .await?;

    let events = ledger.list_events(history).await?;
    let order: Vec<_> = events.iter().map(|e| (e.step, e.status)).collect();
    assert_eq!(
        order,
        vec![
            (PublishStep::ValidateConfiguration, PublishStatus::Doing),
            (PublishStep::ValidateConfiguration, PublishStatus::Success),
            (PublishStep::DistributeConfiguration, PublishStatus::Success),
        ],
        "events are ordered by step then status"
    );
    assert!(events.iter().all(|e| !e.id.is_synthetic()));
    assert!(ledger.list_events(ReleaseHistoryId(3)).await?.is_empty());
    Ok(())
}

/// Run the [`CatalogStore`] conformance suite.
///
/// The store must already contain an active gateway `gateway` owning an
/// inactive stage `stage`.
pub async fn run_catalog_conformance_tests(
    store: &dyn CatalogStore,
    gateway: GatewayId,
    stage: StageId,
) -> Result<(), StoreError> {
    let loaded = store
        .get_stage(stage)
        .await?
        .ok_or_else(|| StoreError::not_found("stage", stage))?;
    assert_eq!(loaded.gateway_id, gateway);
    assert!(
        store
            .list_stages(gateway)
            .await?
            .iter()
            .any(|s| s.id == stage)
    );

    store.set_stage_status(stage, ActivationStatus::Active).await?;
    assert!(store.get_stage(stage).await?.is_some_and(|s| s.is_active()));
    store
        .set_stage_status(stage, ActivationStatus::Inactive)
        .await?;

    let spec = ResourceVersionSpec {
        version: "conformance-1".to_owned(),
        comment: "created by conformance".to_owned(),
        resources: Vec::new(),
    };
    let created = store
        .create_resource_version(gateway, spec.clone(), "conformance", Utc::now())
        .await?;
    assert_eq!(created.gateway_id, gateway);
    assert_eq!(
        store.get_resource_version(created.id).await?.map(|v| v.version),
        Some("conformance-1".to_owned())
    );
    assert_eq!(
        store
            .find_resource_version(gateway, "conformance-1")
            .await?
            .map(|v| v.id),
        Some(created.id)
    );
    let duplicate = store
        .create_resource_version(gateway, spec, "conformance", Utc::now())
        .await;
    assert!(
        matches!(duplicate, Err(StoreError::Conflict(_))),
        "version labels are unique per gateway"
    );

    let missing = store
        .set_stage_status(StageId(i64::MAX), ActivationStatus::Active)
        .await;
    assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    Ok(())
}
