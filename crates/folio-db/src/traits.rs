//! Repository trait abstractions
//!
//! These traits define the interface the access engine and the upload saga need from
//! persistence, so both can be exercised against in-memory stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use folio_core::models::{
    CapabilityToken, Comment, FileEnrichment, FileRecord, Folder, FolderAccess, MapPoint,
    NewPendingFile, NewUploadTicket, UploadVerificationTicket,
};
use folio_core::AppError;
use uuid::Uuid;

use crate::db::{FileRepository, FolderRepository, UploadRepository};

/// Folders and the capability tokens issued on them.
#[async_trait]
pub trait FolderStore: Send + Sync {
    async fn get_folder(&self, folder_id: Uuid) -> Result<Option<Folder>, AppError>;

    /// Folder plus every share and person token on it.
    async fn get_folder_access(&self, folder_id: Uuid) -> Result<Option<FolderAccess>, AppError>;

    async fn find_share_token(&self, token: &str) -> Result<Option<CapabilityToken>, AppError>;

    async fn find_person_token(&self, token: &str) -> Result<Option<CapabilityToken>, AppError>;
}

/// Read access to files, comments and map points.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn get_file(&self, file_id: Uuid) -> Result<Option<FileRecord>, AppError>;

    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>, AppError>;

    /// Committed geotagged files in folders owned by `owner_id`.
    async fn list_geotagged_owned(&self, owner_id: Uuid) -> Result<Vec<MapPoint>, AppError>;

    /// Committed geotagged files in one folder.
    async fn list_geotagged_in_folder(&self, folder_id: Uuid) -> Result<Vec<MapPoint>, AppError>;
}

/// Writes performed by the upload saga.
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Insert the pending file row and its ticket atomically.
    async fn create_pending_with_ticket(
        &self,
        file: NewPendingFile,
        ticket: NewUploadTicket,
    ) -> Result<UploadVerificationTicket, AppError>;

    async fn get_ticket(&self, ticket_id: Uuid)
        -> Result<Option<UploadVerificationTicket>, AppError>;

    /// Delete the ticket and return it. Of several concurrent callers at most one
    /// receives `Some`.
    async fn claim_ticket(
        &self,
        ticket_id: Uuid,
    ) -> Result<Option<UploadVerificationTicket>, AppError>;

    /// Put a claimed ticket back after a transient failure.
    async fn restore_ticket(&self, ticket: &UploadVerificationTicket) -> Result<(), AppError>;

    /// Move a pending file to committed, storing extracted metadata. `None` when the
    /// file is gone or no longer pending.
    async fn commit_file(
        &self,
        file_id: Uuid,
        enrichment: &FileEnrichment,
    ) -> Result<Option<FileRecord>, AppError>;

    /// Returns whether a row was deleted.
    async fn delete_file(&self, file_id: Uuid) -> Result<bool, AppError>;

    /// Remove a pending file and its ticket in one transaction.
    async fn discard_pending(&self, file_id: Uuid) -> Result<(), AppError>;

    /// Pending files created before `cutoff` with no ticket valid past it.
    async fn list_stale_pending(&self, cutoff: DateTime<Utc>)
        -> Result<Vec<FileRecord>, AppError>;
}

#[async_trait]
impl FolderStore for FolderRepository {
    async fn get_folder(&self, folder_id: Uuid) -> Result<Option<Folder>, AppError> {
        self.get_folder(folder_id).await
    }

    async fn get_folder_access(&self, folder_id: Uuid) -> Result<Option<FolderAccess>, AppError> {
        self.get_folder_access(folder_id).await
    }

    async fn find_share_token(&self, token: &str) -> Result<Option<CapabilityToken>, AppError> {
        self.find_share_token(token).await
    }

    async fn find_person_token(&self, token: &str) -> Result<Option<CapabilityToken>, AppError> {
        self.find_person_token(token).await
    }
}

#[async_trait]
impl FileStore for FileRepository {
    async fn get_file(&self, file_id: Uuid) -> Result<Option<FileRecord>, AppError> {
        self.get_file(file_id).await
    }

    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>, AppError> {
        self.get_comment(comment_id).await
    }

    async fn list_geotagged_owned(&self, owner_id: Uuid) -> Result<Vec<MapPoint>, AppError> {
        self.list_geotagged_owned(owner_id).await
    }

    async fn list_geotagged_in_folder(&self, folder_id: Uuid) -> Result<Vec<MapPoint>, AppError> {
        self.list_geotagged_in_folder(folder_id).await
    }
}

#[async_trait]
impl UploadStore for UploadRepository {
    async fn create_pending_with_ticket(
        &self,
        file: NewPendingFile,
        ticket: NewUploadTicket,
    ) -> Result<UploadVerificationTicket, AppError> {
        self.create_pending_with_ticket(file, ticket).await
    }

    async fn get_ticket(
        &self,
        ticket_id: Uuid,
    ) -> Result<Option<UploadVerificationTicket>, AppError> {
        self.get_ticket(ticket_id).await
    }

    async fn claim_ticket(
        &self,
        ticket_id: Uuid,
    ) -> Result<Option<UploadVerificationTicket>, AppError> {
        self.claim_ticket(ticket_id).await
    }

    async fn restore_ticket(&self, ticket: &UploadVerificationTicket) -> Result<(), AppError> {
        self.restore_ticket(ticket).await
    }

    async fn commit_file(
        &self,
        file_id: Uuid,
        enrichment: &FileEnrichment,
    ) -> Result<Option<FileRecord>, AppError> {
        self.commit_file(file_id, enrichment).await
    }

    async fn delete_file(&self, file_id: Uuid) -> Result<bool, AppError> {
        self.delete_file(file_id).await
    }

    async fn discard_pending(&self, file_id: Uuid) -> Result<(), AppError> {
        self.discard_pending(file_id).await
    }

    async fn list_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<FileRecord>, AppError> {
        self.list_stale_pending(cutoff).await
    }
}
