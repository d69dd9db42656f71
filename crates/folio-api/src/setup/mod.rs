//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use folio_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(&config.log_format)?;

    config
        .validate()
        .context("Configuration validation failed")?;
    tracing::info!(config = ?config, "Configuration loaded and validated");

    let pool = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config).await?;
    let state = services::initialize_services(&config, pool, storage.storage);
    let router = routes::setup_routes(&config, state.clone())?;

    #[cfg(feature = "storage-local")]
    let router = match storage.local {
        Some(local) => routes::mount_local_media(router, &config, local)?,
        None => router,
    };

    Ok((state, router))
}
