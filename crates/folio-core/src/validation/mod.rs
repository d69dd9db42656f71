//! Validation modules

pub mod upload;

pub use upload::{validate_declared_upload, UploadLimits};
