//! Folio Core Library
//!
//! This crate provides the domain models, error types, configuration, and validation
//! shared by every Folio component: the access engine, the upload saga, the
//! repositories and the HTTP layer.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorCategory, ErrorMetadata, LogLevel};
pub use models::{
    CapabilityToken, Decision, DecisionReason, FilePhase, MediaType, PermissionLevel, PinHash,
    Principal, TokenAudience, TokenCredential,
};
pub use storage_types::StorageBackend;
