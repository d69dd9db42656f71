use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::FileResponse;

/// The contract a client must honor between initiate and finalize: the bytes found at
/// `object_path` must match the declared size, MIME type and MD5.
///
/// A ticket is live until finalize claims it; claiming deletes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UploadVerificationTicket {
    pub id: Uuid,
    pub file_id: Uuid,
    pub object_path: String,
    pub expected_mime: String,
    pub expected_size: i64,
    /// Lowercase hex digest.
    pub expected_md5: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Expected values captured when a ticket is issued.
#[derive(Debug, Clone)]
pub struct NewUploadTicket {
    pub id: Uuid,
    pub expected_mime: String,
    pub expected_size: i64,
    pub expected_md5: String,
    pub expires_at: DateTime<Utc>,
}

/// Declared metadata for a file about to be uploaded.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct InitiateUploadRequest {
    /// Original filename
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub name: String,
    /// File size in bytes
    #[validate(range(min = 1, message = "File size must be at least 1 byte"))]
    pub size: u64,
    /// Content type (MIME type)
    #[validate(length(
        min = 3,
        max = 255,
        message = "Content type must be between 3 and 255 characters"
    ))]
    pub content_type: String,
    /// Hex-encoded MD5 of the bytes that will be uploaded
    #[validate(length(equal = 32, message = "MD5 must be 32 hexadecimal characters"))]
    pub md5: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InitiateUploadResponse {
    /// Signed PUT URL for the raw transfer
    pub upload_url: String,
    /// Ticket to present to finalize
    pub verification_ticket_id: Uuid,
    pub file_id: Uuid,
    /// When the upload URL and the ticket stop being valid
    pub expires_at: DateTime<Utc>,
    /// Signed PUT URL for a video poster (`image/jpeg`), videos only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_upload_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FinalizeUploadResponse {
    pub file: FileResponse,
    pub signed_read_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_read_url: Option<String>,
}
