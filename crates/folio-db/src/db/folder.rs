use chrono::{DateTime, Utc};
use folio_core::models::{
    CapabilityToken, Folder, FolderAccess, PermissionLevel, PinHash, TokenAudience,
};
use folio_core::AppError;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct ShareTokenRow {
    token: String,
    folder_id: Uuid,
    permission: PermissionLevel,
    pin_hash: Option<String>,
    expires_at: DateTime<Utc>,
    is_active: bool,
    email: Option<String>,
}

impl From<ShareTokenRow> for CapabilityToken {
    fn from(row: ShareTokenRow) -> Self {
        CapabilityToken {
            token: row.token,
            folder_id: row.folder_id,
            permission: row.permission,
            pin_hash: row.pin_hash.map(PinHash::new),
            expires_at: row.expires_at,
            is_active: row.is_active,
            audience: TokenAudience::Shared { email: row.email },
        }
    }
}

#[derive(Debug, FromRow)]
struct PersonTokenRow {
    token: String,
    folder_id: Uuid,
    permission: PermissionLevel,
    pin_hash: Option<String>,
    expires_at: DateTime<Utc>,
    is_active: bool,
    target_email: String,
}

impl From<PersonTokenRow> for CapabilityToken {
    fn from(row: PersonTokenRow) -> Self {
        CapabilityToken {
            token: row.token,
            folder_id: row.folder_id,
            permission: row.permission,
            pin_hash: row.pin_hash.map(PinHash::new),
            expires_at: row.expires_at,
            is_active: row.is_active,
            audience: TokenAudience::Person {
                target_email: row.target_email,
            },
        }
    }
}

const SHARE_TOKEN_COLUMNS: &str =
    "token, folder_id, permission, pin_hash, expires_at, is_active, email";
const PERSON_TOKEN_COLUMNS: &str =
    "token, folder_id, permission, pin_hash, expires_at, is_active, target_email";

/// Repository for folders and the capability tokens issued on them
#[derive(Clone)]
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_folder(&self, folder_id: Uuid) -> Result<Option<Folder>, AppError> {
        let folder = sqlx::query_as::<_, Folder>(
            r#"
            SELECT id, owner_id, name, created_at, updated_at
            FROM folders
            WHERE id = $1
            "#,
        )
        .bind(folder_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(folder)
    }

    /// Load a folder with all of its share and person tokens, active or not.
    ///
    /// Inactive and expired tokens are returned too: the evaluator needs them to
    /// report `inactive` / `expired` instead of `not-authenticated`.
    pub async fn get_folder_access(
        &self,
        folder_id: Uuid,
    ) -> Result<Option<FolderAccess>, AppError> {
        let Some(folder) = self.get_folder(folder_id).await? else {
            return Ok(None);
        };

        let share_tokens = sqlx::query_as::<_, ShareTokenRow>(&format!(
            "SELECT {} FROM share_tokens WHERE folder_id = $1",
            SHARE_TOKEN_COLUMNS
        ))
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await?;

        let person_tokens = sqlx::query_as::<_, PersonTokenRow>(&format!(
            "SELECT {} FROM person_tokens WHERE folder_id = $1",
            PERSON_TOKEN_COLUMNS
        ))
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await?;

        let tokens = share_tokens
            .into_iter()
            .map(CapabilityToken::from)
            .chain(person_tokens.into_iter().map(CapabilityToken::from))
            .collect();

        Ok(Some(FolderAccess { folder, tokens }))
    }

    pub async fn find_share_token(
        &self,
        token: &str,
    ) -> Result<Option<CapabilityToken>, AppError> {
        let row = sqlx::query_as::<_, ShareTokenRow>(&format!(
            "SELECT {} FROM share_tokens WHERE token = $1",
            SHARE_TOKEN_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CapabilityToken::from))
    }

    pub async fn find_person_token(
        &self,
        token: &str,
    ) -> Result<Option<CapabilityToken>, AppError> {
        let row = sqlx::query_as::<_, PersonTokenRow>(&format!(
            "SELECT {} FROM person_tokens WHERE token = $1",
            PERSON_TOKEN_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CapabilityToken::from))
    }
}
