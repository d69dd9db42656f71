//! Storage abstraction trait
//!
//! This module defines the blob-store interface the upload saga is written against:
//! signed URL issuance, metadata fetch, streamed download and delete.

use crate::StorageBackend;
use async_trait::async_trait;
use folio_core::AppError;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Signed URL rejected: {0}")]
    SignatureInvalid(String),

    #[error("Signed URL expired")]
    SignatureExpired,

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err.to_string())
    }
}

/// What the blob store actually holds for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub size: u64,
    pub content_type: Option<String>,
    /// Lowercase hex MD5 of the content, when the backend can report it without a
    /// download (single-part S3 ETags, local sidecar computation).
    pub content_md5: Option<String>,
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait.
///
/// **Key format:** `{ownerId}/{folderId}/{fileId}`, with `-thumbnail` appended for a
/// video's poster image. See [`crate::keys`].
#[async_trait]
pub trait Storage: Send + Sync {
    /// Generate a presigned PUT URL for a direct upload of one object. The credential
    /// is bound to `content_type`: a PUT with any other `Content-Type` is rejected.
    async fn presigned_put_url(
        &self,
        storage_key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Generate a presigned GET URL for temporary read access.
    async fn presigned_get_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Fetch the stored object's size, content type and (when available) MD5.
    /// Returns `NotFound` when nothing was uploaded under the key.
    async fn head_metadata(&self, storage_key: &str) -> StorageResult<ObjectMetadata>;

    /// Stream an object into `dest`, returning the number of bytes written.
    /// The object is never held in memory as a whole.
    async fn download_to(&self, storage_key: &str, dest: &Path) -> StorageResult<u64>;

    /// Delete a file by its storage key. Deleting a missing key succeeds.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if a file exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
