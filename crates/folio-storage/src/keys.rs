//! Object key layout shared by every backend.
//!
//! Key format: `{ownerId}/{folderId}/{fileId}`; a video's poster lives next to it at
//! `{ownerId}/{folderId}/{fileId}-thumbnail`.

use folio_core::constants::THUMBNAIL_SUFFIX;
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// Deterministic object path for a file.
pub fn object_path(owner_id: Uuid, folder_id: Uuid, file_id: Uuid) -> String {
    format!("{}/{}/{}", owner_id, folder_id, file_id)
}

/// Poster image path for a video stored at `object_path`.
pub fn thumbnail_path(object_path: &str) -> String {
    format!("{}{}", object_path, THUMBNAIL_SUFFIX)
}

/// Reject keys that could escape a backend's namespace.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty()
        || storage_key.contains("..")
        || storage_key.starts_with('/')
        || storage_key.starts_with('.')
        || storage_key.contains('\\')
    {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
