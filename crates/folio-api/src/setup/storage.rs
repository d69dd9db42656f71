//! Storage backend initialization

use anyhow::{Context, Result};
use folio_core::Config;
#[cfg(feature = "storage-local")]
use folio_core::StorageBackend;
#[cfg(feature = "storage-local")]
use folio_storage::{create_local_storage, LocalStorage};
use folio_storage::{create_storage, Storage};
use std::sync::Arc;

pub struct StorageSetup {
    pub storage: Arc<dyn Storage>,
    /// Set for the filesystem backend, whose signed URLs this service serves itself.
    #[cfg(feature = "storage-local")]
    pub local: Option<Arc<LocalStorage>>,
}

pub async fn setup_storage(config: &Config) -> Result<StorageSetup> {
    let context = || format!("Failed to initialize {} storage", config.storage_backend);

    #[cfg(feature = "storage-local")]
    let setup = if config.storage_backend == StorageBackend::Local {
        let local = Arc::new(create_local_storage(config).await.with_context(context)?);
        StorageSetup {
            storage: local.clone(),
            local: Some(local),
        }
    } else {
        StorageSetup {
            storage: create_storage(config).await.with_context(context)?,
            local: None,
        }
    };

    #[cfg(not(feature = "storage-local"))]
    let setup = StorageSetup {
        storage: create_storage(config).await.with_context(context)?,
    };

    tracing::info!(
        backend = %setup.storage.backend_type(),
        bucket = ?config.s3_bucket,
        local_path = ?config.local_storage_path,
        "Storage initialized"
    );

    Ok(setup)
}
