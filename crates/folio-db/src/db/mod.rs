//! Database repositories for data access layer
//!
//! One repository per aggregate: folders with their tokens, files with their comments,
//! and the upload saga's pending rows and tickets.

pub mod file;
pub mod folder;
pub mod transaction;
pub mod upload;

pub use file::FileRepository;
pub use folder::FolderRepository;
pub use transaction::TransactionGuard;
pub use upload::UploadRepository;
