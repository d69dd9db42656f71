//! Error types module
//!
//! This module provides the core error type shared by the access engine, the upload
//! saga and the HTTP layer. Every failure a caller can observe is an `AppError`
//! variant, and each variant self-describes its HTTP status and machine code through
//! [`ErrorMetadata`].
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;
use uuid::Uuid;

use crate::models::DecisionReason;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like authorization denials
    Debug,
    /// Warning level - for suspicious but handled conditions like integrity mismatches
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Broad family an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authorization,
    Validation,
    Integrity,
    NotFound,
    TransientStorage,
    Internal,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "file-size-mismatch")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from the client
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    #[error("Access denied: {}", .0.as_str())]
    AccessDenied(DecisionReason),

    #[error("Folder not found: {0}")]
    FolderNotFound(Uuid),

    #[error("Verification ticket not found: {0}")]
    VerificationNotFound(Uuid),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File size mismatch: expected {expected} bytes, stored {actual} bytes")]
    FileSizeMismatch { expected: u64, actual: u64 },

    #[error("File type mismatch: expected {expected}, stored {actual}")]
    FileTypeMismatch { expected: String, actual: String },

    #[error("File integrity check failed: expected md5 {expected}, stored {actual}")]
    IntegrityCheckFailed { expected: String, actual: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "database-error",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            502,
            "storage-error",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "invalid-data",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidFileType(_) => (
            400,
            "invalid-file-type",
            false,
            Some("Only image and video files are accepted"),
            false,
            LogLevel::Debug,
        ),
        AppError::AccessDenied(reason) => access_denied_metadata(*reason),
        AppError::FolderNotFound(_) => (
            404,
            "folder-not-found",
            false,
            Some("Verify the folder ID exists"),
            false,
            LogLevel::Debug,
        ),
        // A finalize that fails to read the object puts its claimed ticket back, so a
        // concurrent caller that lost the claim can succeed on a later attempt.
        AppError::VerificationNotFound(_) => (
            404,
            "verification-not-found",
            false,
            Some(VERIFICATION_NOT_FOUND_ACTION),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "not-found",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::FileSizeMismatch { .. } => (
            422,
            "file-size-mismatch",
            false,
            Some("Upload the exact bytes that were declared"),
            true,
            LogLevel::Warn,
        ),
        AppError::FileTypeMismatch { .. } => (
            422,
            "file-type-mismatch",
            false,
            Some("Upload with the declared content type"),
            true,
            LogLevel::Warn,
        ),
        AppError::IntegrityCheckFailed { .. } => (
            422,
            "file-integrity-check-failed",
            false,
            Some("Upload the exact bytes that were declared"),
            true,
            LogLevel::Warn,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "internal-error",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

const VERIFICATION_NOT_FOUND_ACTION: &str = "Start a new upload. If another finalize of this \
     upload is in progress or just failed with storage-error, retry finalize once it has \
     completed";

fn access_denied_metadata(
    reason: DecisionReason,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    let (status, action) = match reason {
        DecisionReason::NotAuthenticated => (401, "Sign in or supply a valid share token"),
        DecisionReason::InvalidPin => (401, "Supply the PIN for this share link"),
        DecisionReason::Expired => (403, "Ask the folder owner for a new link"),
        DecisionReason::Inactive => (403, "Ask the folder owner to re-enable the link"),
        DecisionReason::Forbidden | DecisionReason::Ok => {
            (403, "Ask the folder owner for write access")
        }
    };
    (status, reason.as_str(), true, Some(action), false, LogLevel::Debug)
}

impl AppError {
    /// Family of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::AccessDenied(_) => ErrorCategory::Authorization,
            AppError::InvalidInput(_) | AppError::InvalidFileType(_) => ErrorCategory::Validation,
            AppError::FileSizeMismatch { .. }
            | AppError::FileTypeMismatch { .. }
            | AppError::IntegrityCheckFailed { .. } => ErrorCategory::Integrity,
            AppError::FolderNotFound(_)
            | AppError::VerificationNotFound(_)
            | AppError::NotFound(_) => ErrorCategory::NotFound,
            AppError::Storage(_) => ErrorCategory::TransientStorage,
            AppError::Database(_) | AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                ErrorCategory::Internal
            }
        }
    }

    /// The authorization reason, when this is an access denial.
    pub fn denial_reason(&self) -> Option<DecisionReason> {
        match self {
            AppError::AccessDenied(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::InvalidFileType(ref msg) => msg.clone(),
            AppError::AccessDenied(reason) => match reason {
                DecisionReason::NotAuthenticated => "Authentication required".to_string(),
                DecisionReason::Forbidden => "Insufficient permission".to_string(),
                DecisionReason::InvalidPin => "A valid PIN is required".to_string(),
                DecisionReason::Expired => "This link has expired".to_string(),
                DecisionReason::Inactive => "This link has been disabled".to_string(),
                DecisionReason::Ok => "Access denied".to_string(),
            },
            AppError::FolderNotFound(_) => "Folder not found".to_string(),
            AppError::VerificationNotFound(_) => "Upload verification not found".to_string(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::FileSizeMismatch { .. } => {
                "Stored file size does not match the declared size".to_string()
            }
            AppError::FileTypeMismatch { .. } => {
                "Stored file type does not match the declared type".to_string()
            }
            AppError::IntegrityCheckFailed { .. } => {
                "Stored file content does not match the declared hash".to_string()
            }
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}
