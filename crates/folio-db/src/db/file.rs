use folio_core::models::{Comment, FileRecord, MapPoint};
use folio_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

pub(crate) const FILE_COLUMNS: &str = "id, folder_id, owner_id, name, media_type, content_type, \
     size_bytes, object_path, phase, width, height, duration_secs, codec, orientation, \
     taken_at, latitude, longitude, created_at, updated_at";

/// Repository for file rows, their comments and the map view
#[derive(Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_file(&self, file_id: Uuid) -> Result<Option<FileRecord>, AppError> {
        let file = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {} FROM files WHERE id = $1",
            FILE_COLUMNS
        ))
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(file)
    }

    pub async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, file_id, author_id, author_email, body, created_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    pub async fn list_geotagged_owned(&self, owner_id: Uuid) -> Result<Vec<MapPoint>, AppError> {
        let points = sqlx::query_as::<_, MapPoint>(
            r#"
            SELECT f.id AS file_id, f.folder_id, f.name, f.latitude, f.longitude, f.taken_at
            FROM files f
            JOIN folders d ON d.id = f.folder_id
            WHERE d.owner_id = $1
              AND f.phase = 'committed'
              AND f.latitude IS NOT NULL
              AND f.longitude IS NOT NULL
            ORDER BY f.taken_at DESC NULLS LAST, f.created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(points)
    }

    pub async fn list_geotagged_in_folder(
        &self,
        folder_id: Uuid,
    ) -> Result<Vec<MapPoint>, AppError> {
        let points = sqlx::query_as::<_, MapPoint>(
            r#"
            SELECT id AS file_id, folder_id, name, latitude, longitude, taken_at
            FROM files
            WHERE folder_id = $1
              AND phase = 'committed'
              AND latitude IS NOT NULL
              AND longitude IS NOT NULL
            ORDER BY taken_at DESC NULLS LAST, created_at DESC
            "#,
        )
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(points)
    }
}
