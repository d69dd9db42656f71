use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

/// Media family of a file. Only images and videos are accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_type", rename_all = "lowercase")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// Family from a MIME type's top-level part (`image/*`, `video/*`).
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let top = content_type.split('/').next()?.trim().to_ascii_lowercase();
        match top.as_str() {
            "image" => Some(MediaType::Image),
            "video" => Some(MediaType::Video),
            _ => None,
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaType::Image => write!(f, "image"),
            MediaType::Video => write!(f, "video"),
        }
    }
}

/// Upload phase of a file row.
///
/// `Pending` rows exist between initiate and finalize; their bytes are unconfirmed and
/// they are never served. `Committed` rows passed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "file_phase", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum FilePhase {
    Pending,
    Committed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct FileRecord {
    pub id: Uuid,
    pub folder_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub media_type: MediaType,
    pub content_type: String,
    pub size_bytes: i64,
    pub object_path: String,
    pub phase: FilePhase,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_secs: Option<f64>,
    pub codec: Option<String>,
    pub orientation: Option<i16>,
    pub taken_at: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn is_committed(&self) -> bool {
        self.phase == FilePhase::Committed
    }
}

/// Values needed to reserve a pending file row.
#[derive(Debug, Clone)]
pub struct NewPendingFile {
    pub id: Uuid,
    pub folder_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub media_type: MediaType,
    pub content_type: String,
    pub size_bytes: i64,
    pub object_path: String,
}

/// Fields filled in from the stored bytes when a file is committed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileEnrichment {
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_secs: Option<f64>,
    pub codec: Option<String>,
    pub orientation: Option<i16>,
    pub taken_at: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FileResponse {
    pub id: Uuid,
    pub folder_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub content_type: String,
    pub size_bytes: i64,
    pub phase: FilePhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<FileRecord> for FileResponse {
    fn from(file: FileRecord) -> Self {
        FileResponse {
            id: file.id,
            folder_id: file.folder_id,
            name: file.name,
            media_type: file.media_type,
            content_type: file.content_type,
            size_bytes: file.size_bytes,
            phase: file.phase,
            width: file.width,
            height: file.height,
            duration_secs: file.duration_secs,
            taken_at: file.taken_at,
            created_at: file.created_at,
        }
    }
}

/// A geotagged file as shown on the map view.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MapPoint {
    pub file_id: Uuid,
    pub folder_id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub taken_at: Option<DateTime<Utc>>,
}
