use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CapabilityToken;

/// A folder owns files and, through them, comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Folder {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A folder together with every capability token issued on it, share links and
/// person invitations alike.
#[derive(Debug, Clone)]
pub struct FolderAccess {
    pub folder: Folder,
    pub tokens: Vec<CapabilityToken>,
}
