//! Folio Database Layer
//!
//! Postgres repositories for folders, capability tokens, files, comments and upload
//! verification tickets, plus the repository traits the access engine and the upload
//! saga are written against.

pub mod db;
pub mod traits;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use db::{FileRepository, FolderRepository, TransactionGuard, UploadRepository};
pub use traits::{FileStore, FolderStore, UploadStore};
