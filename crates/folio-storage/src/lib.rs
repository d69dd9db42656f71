//! Folio Storage Library
//!
//! This crate provides the blob-store abstraction the upload saga uses and its
//! implementations for S3 (through `aws-sdk-s3`) and the local filesystem.
//!
//! # Storage key format
//!
//! All backends use the same key layout: `{ownerId}/{folderId}/{fileId}`, plus
//! `{ownerId}/{folderId}/{fileId}-thumbnail` for video posters. Keys must not contain
//! `..` or start with `/` or `.`. Key generation lives in the `keys` module.

pub mod digest;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

// Re-export commonly used types
pub use digest::md5_file;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use factory::create_local_storage;
pub use folio_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::{LocalObject, LocalStorage};
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectMetadata, Storage, StorageError, StorageResult};
