use gantry_core::{Gateway, ReleaseSnapshot, ResourceVersion, Stage, StageBackend};
use gantry_store::{CatalogStore, StoreError};

/// Load everything needed to render `version` on `stage`.
///
/// Only backends referenced by the version are included.
pub(crate) async fn load_snapshot(
    catalog: &dyn CatalogStore,
    gateway: Gateway,
    stage: Stage,
    version: ResourceVersion,
) -> Result<ReleaseSnapshot, StoreError> {
    let referenced = version.referenced_backends();
    let mut configs = catalog.backend_configs(stage.id).await?;
    let backends = catalog
        .backends(gateway.id)
        .await?
        .into_iter()
        .filter(|b| referenced.contains(&b.id))
        .filter_map(|backend| {
            let idx = configs.iter().position(|c| c.backend_id == backend.id)?;
            Some(StageBackend {
                backend,
                config: configs.swap_remove(idx),
            })
        })
        .collect();
    let plugins = catalog.plugin_bindings(gateway.id, stage.id).await?;
    let certificates = catalog.certificates(stage.id).await?;
    Ok(ReleaseSnapshot {
        gateway,
        stage,
        version,
        backends,
        plugins,
        certificates,
    })
}
