use chrono::{DateTime, Utc};
use folio_core::models::{
    FileEnrichment, FilePhase, FileRecord, NewPendingFile, NewUploadTicket,
    UploadVerificationTicket,
};
use folio_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

use super::file::FILE_COLUMNS;
use super::transaction::TransactionGuard;

const TICKET_COLUMNS: &str =
    "id, file_id, object_path, expected_mime, expected_size, expected_md5, created_at, expires_at";

/// Repository for the upload saga: pending file rows and their verification tickets
#[derive(Clone)]
pub struct UploadRepository {
    pool: PgPool,
}

impl UploadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reserve a pending file and issue its ticket in a single transaction, so a ticket
    /// never exists without its file and a pending file never exists without a ticket.
    pub async fn create_pending_with_ticket(
        &self,
        file: NewPendingFile,
        ticket: NewUploadTicket,
    ) -> Result<UploadVerificationTicket, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        sqlx::query(
            r#"
            INSERT INTO files (
                id, folder_id, owner_id, name, media_type, content_type,
                size_bytes, object_path, phase
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(file.id)
        .bind(file.folder_id)
        .bind(file.owner_id)
        .bind(&file.name)
        .bind(file.media_type)
        .bind(&file.content_type)
        .bind(file.size_bytes)
        .bind(&file.object_path)
        .bind(FilePhase::Pending)
        .execute(tx.conn()?)
        .await?;

        let created = sqlx::query_as::<_, UploadVerificationTicket>(&format!(
            r#"
            INSERT INTO upload_verification_tickets (
                id, file_id, object_path, expected_mime, expected_size, expected_md5, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(ticket.id)
        .bind(file.id)
        .bind(&file.object_path)
        .bind(&ticket.expected_mime)
        .bind(ticket.expected_size)
        .bind(&ticket.expected_md5)
        .bind(ticket.expires_at)
        .fetch_one(tx.conn()?)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    pub async fn get_ticket(
        &self,
        ticket_id: Uuid,
    ) -> Result<Option<UploadVerificationTicket>, AppError> {
        let ticket = sqlx::query_as::<_, UploadVerificationTicket>(&format!(
            "SELECT {} FROM upload_verification_tickets WHERE id = $1",
            TICKET_COLUMNS
        ))
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }

    /// Atomically consume a ticket. The row lock taken by `DELETE` means only one of
    /// several concurrent callers gets the row back.
    pub async fn claim_ticket(
        &self,
        ticket_id: Uuid,
    ) -> Result<Option<UploadVerificationTicket>, AppError> {
        let ticket = sqlx::query_as::<_, UploadVerificationTicket>(&format!(
            "DELETE FROM upload_verification_tickets WHERE id = $1 RETURNING {}",
            TICKET_COLUMNS
        ))
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }

    pub async fn restore_ticket(&self, ticket: &UploadVerificationTicket) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO upload_verification_tickets (
                id, file_id, object_path, expected_mime, expected_size, expected_md5,
                created_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.file_id)
        .bind(&ticket.object_path)
        .bind(&ticket.expected_mime)
        .bind(ticket.expected_size)
        .bind(&ticket.expected_md5)
        .bind(ticket.created_at)
        .bind(ticket.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn commit_file(
        &self,
        file_id: Uuid,
        enrichment: &FileEnrichment,
    ) -> Result<Option<FileRecord>, AppError> {
        let file = sqlx::query_as::<_, FileRecord>(&format!(
            r#"
            UPDATE files
            SET phase = 'committed',
                width = $2,
                height = $3,
                duration_secs = $4,
                codec = $5,
                orientation = $6,
                taken_at = $7,
                latitude = $8,
                longitude = $9,
                updated_at = NOW()
            WHERE id = $1 AND phase = 'pending'
            RETURNING {}
            "#,
            FILE_COLUMNS
        ))
        .bind(file_id)
        .bind(enrichment.width)
        .bind(enrichment.height)
        .bind(enrichment.duration_secs)
        .bind(&enrichment.codec)
        .bind(enrichment.orientation)
        .bind(enrichment.taken_at)
        .bind(enrichment.latitude)
        .bind(enrichment.longitude)
        .fetch_optional(&self.pool)
        .await?;

        Ok(file)
    }

    pub async fn delete_file(&self, file_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(file_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn discard_pending(&self, file_id: Uuid) -> Result<(), AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        sqlx::query("DELETE FROM upload_verification_tickets WHERE file_id = $1")
            .bind(file_id)
            .execute(tx.conn()?)
            .await?;

        sqlx::query("DELETE FROM files WHERE id = $1 AND phase = 'pending'")
            .bind(file_id)
            .execute(tx.conn()?)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    pub async fn list_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<FileRecord>, AppError> {
        let files = sqlx::query_as::<_, FileRecord>(&format!(
            r#"
            SELECT {}
            FROM files f
            WHERE f.phase = 'pending'
              AND f.created_at < $1
              AND NOT EXISTS (
                  SELECT 1 FROM upload_verification_tickets t
                  WHERE t.file_id = f.id AND t.expires_at > $1
              )
            ORDER BY f.created_at
            "#,
            FILE_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }
}
