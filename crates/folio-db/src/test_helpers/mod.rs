//! Mock repository implementations for testing
//!
//! `MockDatabase` keeps every table in memory behind one shared handle and implements
//! all repository traits, so rows written through `UploadStore` are visible through
//! `FileStore` the way they would be in Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use folio_core::models::{
    CapabilityToken, Comment, FileEnrichment, FilePhase, FileRecord, Folder, FolderAccess,
    MapPoint, MediaType, NewPendingFile, NewUploadTicket, TokenAudience, UploadVerificationTicket,
};
use folio_core::AppError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::traits::{FileStore, FolderStore, UploadStore};

#[derive(Default)]
struct Tables {
    folders: HashMap<Uuid, Folder>,
    tokens: Vec<CapabilityToken>,
    files: HashMap<Uuid, FileRecord>,
    comments: HashMap<Uuid, Comment>,
    tickets: HashMap<Uuid, UploadVerificationTicket>,
    failing_file_deletes: u32,
}

/// In-memory database for tests
#[derive(Clone, Default)]
pub struct MockDatabase {
    tables: Arc<Mutex<Tables>>,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_folder(&self, folder: Folder) {
        self.tables
            .lock()
            .unwrap()
            .folders
            .insert(folder.id, folder);
    }

    /// Add a share or person token; the audience decides which table it lands in.
    pub fn add_token(&self, token: CapabilityToken) {
        self.tables.lock().unwrap().tokens.push(token);
    }

    pub fn add_file(&self, file: FileRecord) {
        self.tables.lock().unwrap().files.insert(file.id, file);
    }

    pub fn add_comment(&self, comment: Comment) {
        self.tables
            .lock()
            .unwrap()
            .comments
            .insert(comment.id, comment);
    }

    /// Make the next `count` file deletes fail with a database error.
    pub fn fail_next_file_deletes(&self, count: u32) {
        self.tables.lock().unwrap().failing_file_deletes = count;
    }

    /// Get a file row (for test assertions)
    pub fn file(&self, file_id: Uuid) -> Option<FileRecord> {
        self.tables.lock().unwrap().files.get(&file_id).cloned()
    }

    /// Get a ticket (for test assertions)
    pub fn ticket(&self, ticket_id: Uuid) -> Option<UploadVerificationTicket> {
        self.tables.lock().unwrap().tickets.get(&ticket_id).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.tables.lock().unwrap().files.len()
    }

    pub fn ticket_count(&self) -> usize {
        self.tables.lock().unwrap().tickets.len()
    }

    /// Backdate a ticket, e.g. to make it look abandoned.
    pub fn set_ticket_expiry(&self, ticket_id: Uuid, expires_at: DateTime<Utc>) {
        if let Some(ticket) = self.tables.lock().unwrap().tickets.get_mut(&ticket_id) {
            ticket.expires_at = expires_at;
        }
    }

    fn find_token(&self, token: &str, person: bool) -> Option<CapabilityToken> {
        self.tables
            .lock()
            .unwrap()
            .tokens
            .iter()
            .find(|t| {
                t.token == token && matches!(t.audience, TokenAudience::Person { .. }) == person
            })
            .cloned()
    }

    fn geotagged(&self, include: impl Fn(&FileRecord, &Tables) -> bool) -> Vec<MapPoint> {
        let tables = self.tables.lock().unwrap();
        tables
            .files
            .values()
            .filter(|f| f.is_committed() && include(f, &tables))
            .filter_map(|f| {
                Some(MapPoint {
                    file_id: f.id,
                    folder_id: f.folder_id,
                    name: f.name.clone(),
                    latitude: f.latitude?,
                    longitude: f.longitude?,
                    taken_at: f.taken_at,
                })
            })
            .collect()
    }
}

#[async_trait]
impl FolderStore for MockDatabase {
    async fn get_folder(&self, folder_id: Uuid) -> Result<Option<Folder>, AppError> {
        Ok(self.tables.lock().unwrap().folders.get(&folder_id).cloned())
    }

    async fn get_folder_access(&self, folder_id: Uuid) -> Result<Option<FolderAccess>, AppError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.folders.get(&folder_id).map(|folder| FolderAccess {
            folder: folder.clone(),
            tokens: tables
                .tokens
                .iter()
                .filter(|t| t.folder_id == folder_id)
                .cloned()
                .collect(),
        }))
    }

    async fn find_share_token(&self, token: &str) -> Result<Option<CapabilityToken>, AppError> {
        Ok(self.find_token(token, false))
    }

    async fn find_person_token(&self, token: &str) -> Result<Option<CapabilityToken>, AppError> {
        Ok(self.find_token(token, true))
    }
}

#[async_trait]
impl FileStore for MockDatabase {
    async fn get_file(&self, file_id: Uuid) -> Result<Option<FileRecord>, AppError> {
        Ok(self.file(file_id))
    }

    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>, AppError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .comments
            .get(&comment_id)
            .cloned())
    }

    async fn list_geotagged_owned(&self, owner_id: Uuid) -> Result<Vec<MapPoint>, AppError> {
        Ok(self.geotagged(|file, tables| {
            tables
                .folders
                .get(&file.folder_id)
                .is_some_and(|folder| folder.owner_id == owner_id)
        }))
    }

    async fn list_geotagged_in_folder(&self, folder_id: Uuid) -> Result<Vec<MapPoint>, AppError> {
        Ok(self.geotagged(|file, _| file.folder_id == folder_id))
    }
}

#[async_trait]
impl UploadStore for MockDatabase {
    async fn create_pending_with_ticket(
        &self,
        file: NewPendingFile,
        ticket: NewUploadTicket,
    ) -> Result<UploadVerificationTicket, AppError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.files.contains_key(&file.id) || tables.tickets.contains_key(&ticket.id) {
            return Err(AppError::Internal("duplicate key".to_string()));
        }

        let now = Utc::now();
        let created = UploadVerificationTicket {
            id: ticket.id,
            file_id: file.id,
            object_path: file.object_path.clone(),
            expected_mime: ticket.expected_mime,
            expected_size: ticket.expected_size,
            expected_md5: ticket.expected_md5,
            created_at: now,
            expires_at: ticket.expires_at,
        };
        tables.files.insert(
            file.id,
            FileRecord {
                id: file.id,
                folder_id: file.folder_id,
                owner_id: file.owner_id,
                name: file.name,
                media_type: file.media_type,
                content_type: file.content_type,
                size_bytes: file.size_bytes,
                object_path: file.object_path,
                phase: FilePhase::Pending,
                width: None,
                height: None,
                duration_secs: None,
                codec: None,
                orientation: None,
                taken_at: None,
                latitude: None,
                longitude: None,
                created_at: now,
                updated_at: now,
            },
        );
        tables.tickets.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_ticket(
        &self,
        ticket_id: Uuid,
    ) -> Result<Option<UploadVerificationTicket>, AppError> {
        Ok(self.ticket(ticket_id))
    }

    async fn claim_ticket(
        &self,
        ticket_id: Uuid,
    ) -> Result<Option<UploadVerificationTicket>, AppError> {
        Ok(self.tables.lock().unwrap().tickets.remove(&ticket_id))
    }

    async fn restore_ticket(&self, ticket: &UploadVerificationTicket) -> Result<(), AppError> {
        self.tables
            .lock()
            .unwrap()
            .tickets
            .entry(ticket.id)
            .or_insert_with(|| ticket.clone());
        Ok(())
    }

    async fn commit_file(
        &self,
        file_id: Uuid,
        enrichment: &FileEnrichment,
    ) -> Result<Option<FileRecord>, AppError> {
        let mut tables = self.tables.lock().unwrap();
        let Some(file) = tables.files.get_mut(&file_id) else {
            return Ok(None);
        };
        if file.phase != FilePhase::Pending {
            return Ok(None);
        }
        file.phase = FilePhase::Committed;
        file.width = enrichment.width;
        file.height = enrichment.height;
        file.duration_secs = enrichment.duration_secs;
        file.codec = enrichment.codec.clone();
        file.orientation = enrichment.orientation;
        file.taken_at = enrichment.taken_at;
        file.latitude = enrichment.latitude;
        file.longitude = enrichment.longitude;
        file.updated_at = Utc::now();
        Ok(Some(file.clone()))
    }

    async fn delete_file(&self, file_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.failing_file_deletes > 0 {
            tables.failing_file_deletes -= 1;
            return Err(AppError::Internal("simulated database failure".to_string()));
        }
        let removed = tables.files.remove(&file_id).is_some();
        tables.tickets.retain(|_, t| t.file_id != file_id);
        tables.comments.retain(|_, c| c.file_id != file_id);
        Ok(removed)
    }

    async fn discard_pending(&self, file_id: Uuid) -> Result<(), AppError> {
        let mut tables = self.tables.lock().unwrap();
        tables.tickets.retain(|_, t| t.file_id != file_id);
        if tables
            .files
            .get(&file_id)
            .is_some_and(|f| f.phase == FilePhase::Pending)
        {
            tables.files.remove(&file_id);
        }
        Ok(())
    }

    async fn list_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<FileRecord>, AppError> {
        let tables = self.tables.lock().unwrap();
        let mut stale: Vec<FileRecord> = tables
            .files
            .values()
            .filter(|f| f.phase == FilePhase::Pending && f.created_at < cutoff)
            .filter(|f| {
                !tables
                    .tickets
                    .values()
                    .any(|t| t.file_id == f.id && t.expires_at > cutoff)
            })
            .cloned()
            .collect();
        stale.sort_by_key(|f| f.created_at);
        Ok(stale)
    }
}

/// A folder owned by `owner_id`, ready for [`MockDatabase::add_folder`].
pub fn folder_fixture(owner_id: Uuid, name: &str) -> Folder {
    let now = Utc::now();
    Folder {
        id: Uuid::new_v4(),
        owner_id,
        name: name.to_string(),
        created_at: now,
        updated_at: now,
    }
}

/// A committed image file uploaded by the folder owner.
pub fn committed_file_fixture(folder: &Folder, name: &str) -> FileRecord {
    let now = Utc::now();
    let id = Uuid::new_v4();
    FileRecord {
        id,
        folder_id: folder.id,
        owner_id: folder.owner_id,
        name: name.to_string(),
        media_type: MediaType::Image,
        content_type: "image/jpeg".to_string(),
        size_bytes: 1024,
        object_path: format!("{}/{}/{}", folder.owner_id, folder.id, id),
        phase: FilePhase::Committed,
        width: None,
        height: None,
        duration_secs: None,
        codec: None,
        orientation: None,
        taken_at: None,
        latitude: None,
        longitude: None,
        created_at: now,
        updated_at: now,
    }
}
