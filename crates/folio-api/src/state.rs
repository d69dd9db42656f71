//! Application state shared by all handlers.

use folio_access::{PrincipalResolver, ResourceEnforcer};
use folio_core::Config;
use folio_services::{MapService, UploadFinalizer, UploadInitiator};
use folio_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::SessionVerifier;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub storage: Arc<dyn Storage>,
    pub sessions: SessionVerifier,
    pub access: AccessState,
    pub uploads: UploadState,
    pub map: MapService,
}

/// Access engine entry points used by the access-check endpoint.
#[derive(Clone)]
pub struct AccessState {
    pub resolver: PrincipalResolver,
    pub enforcer: ResourceEnforcer,
}

#[derive(Clone)]
pub struct UploadState {
    pub initiator: UploadInitiator,
    pub finalizer: UploadFinalizer,
}
