//! Service wiring

use crate::auth::SessionVerifier;
use crate::state::{AccessState, AppState, UploadState};
use folio_access::{PrincipalResolver, ResourceEnforcer};
use folio_core::Config;
use folio_db::{
    FileRepository, FileStore, FolderRepository, FolderStore, UploadRepository, UploadStore,
};
use folio_processing::{MediaProbe, MetadataExtractor};
use folio_services::{MapService, UploadFinalizer, UploadInitiator, UploadSettings};
use folio_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;

/// Repositories and external adapters the services are built on.
pub struct Backends {
    pub folders: Arc<dyn FolderStore>,
    pub files: Arc<dyn FileStore>,
    pub uploads: Arc<dyn UploadStore>,
    pub storage: Arc<dyn Storage>,
    pub extractor: Arc<dyn MetadataExtractor>,
}

/// Build the Postgres-backed application state.
pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Arc<AppState> {
    let backends = Backends {
        folders: Arc::new(FolderRepository::new(pool.clone())),
        files: Arc::new(FileRepository::new(pool.clone())),
        uploads: Arc::new(UploadRepository::new(pool.clone())),
        storage,
        extractor: Arc::new(MediaProbe::new(config.ffprobe_path.clone())),
    };

    let state = build_state(config, pool, backends);
    tracing::info!("Services initialized");
    state
}

pub fn build_state(config: &Config, pool: PgPool, backends: Backends) -> Arc<AppState> {
    let settings = UploadSettings::from_config(config);
    let resolver = PrincipalResolver::new(backends.folders.clone());
    let enforcer = ResourceEnforcer::new(backends.folders, backends.files.clone());

    let initiator = UploadInitiator::new(
        resolver.clone(),
        enforcer.clone(),
        backends.uploads.clone(),
        backends.storage.clone(),
        settings,
    );
    let finalizer = UploadFinalizer::new(
        resolver.clone(),
        enforcer.clone(),
        backends.uploads,
        backends.files.clone(),
        backends.storage.clone(),
        backends.extractor,
        settings,
    );
    let map = MapService::new(resolver.clone(), enforcer.clone(), backends.files);

    Arc::new(AppState {
        config: config.clone(),
        pool,
        storage: backends.storage,
        sessions: SessionVerifier::new(&config.jwt_secret),
        access: AccessState { resolver, enforcer },
        uploads: UploadState {
            initiator,
            finalizer,
        },
        map,
    })
}
