use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A comment on a file. Guests commenting through a share link have no account,
/// so `author_id` is optional and `author_email` records who they claimed to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Comment {
    pub id: Uuid,
    pub file_id: Uuid,
    pub author_id: Option<Uuid>,
    pub author_email: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
