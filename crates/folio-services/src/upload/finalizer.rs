use folio_access::{Caller, PrincipalResolver, ResourceEnforcer};
use folio_core::models::{
    FileEnrichment, FileRecord, FinalizeUploadResponse, UploadVerificationTicket,
};
use folio_core::{AppError, MediaType, PermissionLevel};
use folio_db::traits::{FileStore, UploadStore};
use folio_processing::MetadataExtractor;
use folio_storage::keys::thumbnail_path;
use folio_storage::{md5_file, ObjectMetadata, Storage};
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;
use uuid::Uuid;

use super::mime_essence;
use crate::retry::retry_with_backoff;
use crate::settings::UploadSettings;

/// Phase two of the upload saga.
///
/// Claiming the ticket is the first write and the commit point: of two concurrent
/// finalize calls exactly one gets past it. Before the claim nothing is changed; after
/// it the upload either commits or is compensated (object and row deleted).
#[derive(Clone)]
pub struct UploadFinalizer {
    resolver: PrincipalResolver,
    enforcer: ResourceEnforcer,
    uploads: Arc<dyn UploadStore>,
    files: Arc<dyn FileStore>,
    storage: Arc<dyn Storage>,
    extractor: Arc<dyn MetadataExtractor>,
    settings: UploadSettings,
}

impl UploadFinalizer {
    pub fn new(
        resolver: PrincipalResolver,
        enforcer: ResourceEnforcer,
        uploads: Arc<dyn UploadStore>,
        files: Arc<dyn FileStore>,
        storage: Arc<dyn Storage>,
        extractor: Arc<dyn MetadataExtractor>,
        settings: UploadSettings,
    ) -> Self {
        Self {
            resolver,
            enforcer,
            uploads,
            files,
            storage,
            extractor,
            settings,
        }
    }

    #[tracing::instrument(skip(self, caller), fields(ticket_id = %ticket_id, folder_id = %folder_id))]
    pub async fn finalize_upload(
        &self,
        ticket_id: Uuid,
        folder_id: Uuid,
        caller: &Caller,
    ) -> Result<FinalizeUploadResponse, AppError> {
        let start = Instant::now();

        let folder = self.enforcer.folder_access(folder_id).await?;
        let principal = self.resolver.resolve(caller).await?;
        self.enforcer
            .enforce_folder(&folder, &principal, PermissionLevel::Write)
            .await?
            .into_result()?;

        let file = self.load_ticket_file(ticket_id, folder_id).await?;

        let ticket = self
            .uploads
            .claim_ticket(ticket_id)
            .await?
            .ok_or(AppError::VerificationNotFound(ticket_id))?;

        let actual = match self.storage.head_metadata(&ticket.object_path).await {
            Ok(actual) => actual,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    object_path = %ticket.object_path,
                    file_id = %ticket.file_id,
                    "Could not read stored object metadata, releasing ticket for retry"
                );
                self.release_ticket(&ticket).await;
                return Err(e.into());
            }
        };

        let copy = match self.verify(&ticket, &actual).await {
            Ok(copy) => copy,
            Err(Verification::Mismatch(err)) => {
                tracing::warn!(
                    error = %err,
                    object_path = %ticket.object_path,
                    file_id = %ticket.file_id,
                    "Uploaded object does not match its ticket, compensating"
                );
                self.compensate(&ticket, file.media_type).await;
                return Err(err);
            }
            Err(Verification::Unavailable(err)) => {
                tracing::error!(
                    error = %err,
                    object_path = %ticket.object_path,
                    file_id = %ticket.file_id,
                    "Could not read stored object for hashing, releasing ticket for retry"
                );
                self.release_ticket(&ticket).await;
                return Err(err);
            }
        };

        let enrichment = self.extract(&ticket, file.media_type, copy).await;

        let committed = self
            .uploads
            .commit_file(ticket.file_id, &enrichment)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Pending file {} no longer exists", ticket.file_id))
            })?;

        let signed_read_url = self
            .storage
            .presigned_get_url(&committed.object_path, self.settings.read_url_ttl)
            .await?;
        let thumbnail_read_url = self.thumbnail_read_url(&committed).await;

        tracing::info!(
            file_id = %committed.id,
            object_path = %committed.object_path,
            size_bytes = committed.size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload finalized"
        );

        Ok(FinalizeUploadResponse {
            file: committed.into(),
            signed_read_url,
            thumbnail_read_url,
        })
    }

    /// The ticket's pending file, provided it lives in `folder_id`. Anything else is
    /// reported as a missing ticket so other folders' tickets stay invisible.
    async fn load_ticket_file(
        &self,
        ticket_id: Uuid,
        folder_id: Uuid,
    ) -> Result<FileRecord, AppError> {
        let ticket = self
            .uploads
            .get_ticket(ticket_id)
            .await?
            .ok_or(AppError::VerificationNotFound(ticket_id))?;

        match self.files.get_file(ticket.file_id).await? {
            Some(file) if file.folder_id == folder_id => Ok(file),
            Some(_) => {
                tracing::debug!(file_id = %ticket.file_id, "Ticket belongs to another folder");
                Err(AppError::VerificationNotFound(ticket_id))
            }
            None => Err(AppError::VerificationNotFound(ticket_id)),
        }
    }

    /// Stream the object into a temp file that is removed on drop.
    async fn download_copy(&self, object_path: &str) -> Result<NamedTempFile, AppError> {
        let copy = NamedTempFile::new()
            .map_err(|e| AppError::Internal(format!("Could not create temp file: {}", e)))?;
        let size = self.storage.download_to(object_path, copy.path()).await?;
        tracing::debug!(object_path = %object_path, size_bytes = size, "Object downloaded");
        Ok(copy)
    }

    /// Size, then MIME type, then MD5. Returns the downloaded copy when hashing needed
    /// one, so extraction can reuse it.
    async fn verify(
        &self,
        ticket: &UploadVerificationTicket,
        actual: &ObjectMetadata,
    ) -> Result<Option<NamedTempFile>, Verification> {
        let expected_size = u64::try_from(ticket.expected_size).unwrap_or(0);
        if actual.size != expected_size {
            return Err(Verification::Mismatch(AppError::FileSizeMismatch {
                expected: expected_size,
                actual: actual.size,
            }));
        }

        let actual_mime = actual
            .content_type
            .as_deref()
            .map(mime_essence)
            .unwrap_or_default();
        if actual_mime != mime_essence(&ticket.expected_mime) {
            return Err(Verification::Mismatch(AppError::FileTypeMismatch {
                expected: ticket.expected_mime.clone(),
                actual: actual_mime,
            }));
        }

        let (actual_md5, copy) = match &actual.content_md5 {
            Some(md5) => (md5.to_ascii_lowercase(), None),
            None => {
                let copy = self
                    .download_copy(&ticket.object_path)
                    .await
                    .map_err(Verification::Unavailable)?;
                let md5 = md5_file(copy.path())
                    .await
                    .map_err(|e| Verification::Unavailable(e.into()))?;
                (md5, Some(copy))
            }
        };
        if !actual_md5.eq_ignore_ascii_case(&ticket.expected_md5) {
            return Err(Verification::Mismatch(AppError::IntegrityCheckFailed {
                expected: ticket.expected_md5.clone(),
                actual: actual_md5,
            }));
        }

        Ok(copy)
    }

    /// Enrichment never fails the upload.
    async fn extract(
        &self,
        ticket: &UploadVerificationTicket,
        media_type: MediaType,
        copy: Option<NamedTempFile>,
    ) -> FileEnrichment {
        let copy = match copy {
            Some(copy) => copy,
            None => match self.download_copy(&ticket.object_path).await {
                Ok(copy) => copy,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        object_path = %ticket.object_path,
                        file_id = %ticket.file_id,
                        "Could not download object for metadata extraction, committing without it"
                    );
                    return FileEnrichment::default();
                }
            },
        };

        match self.extractor.extract(media_type, copy.path()).await {
            Ok(metadata) => metadata.into(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    file_id = %ticket.file_id,
                    media_type = %media_type,
                    "Metadata extraction failed, committing without it"
                );
                FileEnrichment::default()
            }
        }
    }

    async fn thumbnail_read_url(&self, file: &FileRecord) -> Option<String> {
        if file.media_type != MediaType::Video {
            return None;
        }
        let key = thumbnail_path(&file.object_path);
        match self.storage.exists(&key).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                tracing::warn!(error = %e, object_path = %key, "Could not check video poster");
                return None;
            }
        }
        match self
            .storage
            .presigned_get_url(&key, self.settings.read_url_ttl)
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(error = %e, object_path = %key, "Could not sign video poster URL");
                None
            }
        }
    }

    async fn release_ticket(&self, ticket: &UploadVerificationTicket) {
        if let Err(e) = self.uploads.restore_ticket(ticket).await {
            tracing::error!(
                error = %e,
                ticket_id = %ticket.id,
                file_id = %ticket.file_id,
                "Failed to restore claimed ticket; pending file left for reconciliation"
            );
        }
    }

    /// Delete the object (and video poster) and the file row. The ticket is already
    /// consumed by the claim. Whatever survives the retries is logged for the
    /// reconciliation sweep.
    async fn compensate(&self, ticket: &UploadVerificationTicket, media_type: MediaType) {
        let policy = &self.settings.compensation_retry;

        let mut keys = vec![ticket.object_path.clone()];
        if media_type == MediaType::Video {
            keys.push(thumbnail_path(&ticket.object_path));
        }

        for key in &keys {
            let result = retry_with_backoff(policy, "delete object", || async {
                self.storage.delete(key).await
            })
            .await;
            if let Err(e) = result {
                tracing::error!(
                    error = %e,
                    object_path = %key,
                    file_id = %ticket.file_id,
                    "Orphaned object left in storage after failed upload"
                );
            }
        }

        let result = retry_with_backoff(policy, "delete file row", || async {
            self.uploads.delete_file(ticket.file_id).await
        })
        .await;
        if let Err(e) = result {
            tracing::error!(
                error = %e,
                object_path = %ticket.object_path,
                file_id = %ticket.file_id,
                "Orphaned pending file row left after failed upload"
            );
        }
    }
}

enum Verification {
    /// Bytes differ from the declaration; compensate.
    Mismatch(AppError),
    /// Bytes could not be read; release the ticket.
    Unavailable(AppError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{md5_hex, Harness};
    use folio_core::models::FilePhase;
    use folio_core::DecisionReason;
    use folio_processing::test_helpers::MockExtractor;
    use folio_processing::{GeoPoint, ImageMetadata, MediaMetadata};

    fn jpeg_bytes(len: usize, fill: u8) -> Vec<u8> {
        let mut data = vec![fill; len];
        data[0] = 0xFF;
        data[1] = 0xD8;
        data
    }

    #[tokio::test]
    async fn test_owner_upload_commits() {
        let h = Harness::new();
        let data = jpeg_bytes(500_000, 0xAB);
        let init = h
            .initiate(&h.owner_caller(), "beach.jpg", &data, "image/jpeg")
            .await;
        h.client_put(&init, &data, "image/jpeg");

        let done = h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap();

        assert_eq!(done.file.id, init.file_id);
        assert_eq!(done.file.media_type, MediaType::Image);
        assert_eq!(done.file.phase, FilePhase::Committed);
        assert!(!done.signed_read_url.is_empty());
        assert!(done.signed_read_url.contains("method=GET"));
        assert!(done.thumbnail_read_url.is_none());

        assert!(h.db.file(init.file_id).unwrap().is_committed());
        assert!(h.db.ticket(init.verification_ticket_id).is_none());
        assert_eq!(h.extractor.calls(), vec![MediaType::Image]);
    }

    #[tokio::test]
    async fn test_extracted_metadata_is_stored() {
        let h = Harness::with_extractor(MockExtractor::returning(MediaMetadata::Image(
            ImageMetadata {
                width: 640,
                height: 480,
                format: "Jpeg".to_string(),
                exif_orientation: Some(6),
                taken_at: None,
                location: GeoPoint::new(45.0, 7.5),
            },
        )));
        let data = jpeg_bytes(1000, 1);
        let init = h
            .initiate(&h.owner_caller(), "a.jpg", &data, "image/jpeg")
            .await;
        h.client_put(&init, &data, "image/jpeg");

        h.finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap();

        let file = h.db.file(init.file_id).unwrap();
        assert_eq!(file.width, Some(640));
        assert_eq!(file.orientation, Some(6));
        assert_eq!(file.latitude, Some(45.0));
        assert_eq!(file.longitude, Some(7.5));
    }

    #[tokio::test]
    async fn test_hash_mismatch_compensates() {
        let h = Harness::new();
        let declared = jpeg_bytes(500_000, 0xAB);
        let init = h
            .initiate(&h.owner_caller(), "beach.jpg", &declared, "image/jpeg")
            .await;
        let path = h.db.file(init.file_id).unwrap().object_path;
        h.client_put(&init, &jpeg_bytes(500_000, 0xCD), "image/jpeg");

        let err = h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::IntegrityCheckFailed { .. }));
        assert!(!h.storage.has_object(&path));
        assert!(h.db.file(init.file_id).is_none());
        assert!(h.db.ticket(init.verification_ticket_id).is_none());
    }

    #[tokio::test]
    async fn test_size_checked_before_type_and_hash() {
        let h = Harness::new();
        let declared = jpeg_bytes(100, 1);
        let init = h
            .initiate(&h.owner_caller(), "a.jpg", &declared, "image/jpeg")
            .await;
        // Wrong size, wrong type and wrong hash at once
        h.client_put(&init, &jpeg_bytes(101, 2), "image/png");

        let err = h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::FileSizeMismatch {
                expected: 100,
                actual: 101
            }
        ));
        assert!(h.db.file(init.file_id).is_none());
    }

    #[tokio::test]
    async fn test_type_mismatch_compensates() {
        let h = Harness::new();
        let data = jpeg_bytes(100, 1);
        let init = h
            .initiate(&h.owner_caller(), "a.jpg", &data, "image/jpeg")
            .await;
        h.client_put(&init, &data, "image/png");

        let err = h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::FileTypeMismatch { .. }));
        assert!(h.db.file(init.file_id).is_none());
    }

    #[tokio::test]
    async fn test_content_type_parameters_and_case_are_ignored() {
        let h = Harness::new();
        let data = jpeg_bytes(100, 1);
        let init = h
            .initiate(&h.owner_caller(), "a.jpg", &data, "image/jpeg")
            .await;
        h.client_put(&init, &data, "Image/JPEG; charset=binary");

        assert!(h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_hash_computed_when_store_reports_none() {
        let h = Harness::new();
        h.storage.hide_md5();

        let good = jpeg_bytes(300, 7);
        let init = h
            .initiate(&h.owner_caller(), "good.jpg", &good, "image/jpeg")
            .await;
        h.client_put(&init, &good, "image/jpeg");
        assert!(h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .is_ok());

        let init = h
            .initiate(&h.owner_caller(), "bad.jpg", &good, "image/jpeg")
            .await;
        h.client_put(&init, &jpeg_bytes(300, 8), "image/jpeg");
        let err = h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::IntegrityCheckFailed { .. }));
    }

    #[tokio::test]
    async fn test_extractor_reads_a_downloaded_copy() {
        let h = Harness::new();
        let data = jpeg_bytes(4096, 5);
        let init = h
            .initiate(&h.owner_caller(), "a.jpg", &data, "image/jpeg")
            .await;
        h.client_put(&init, &data, "image/jpeg");

        h.finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap();

        let inputs = h.extractor.inputs();
        assert_eq!(inputs.len(), 1);
        let (path, contents) = &inputs[0];
        assert_eq!(contents, &data);
        // The copy is gone once finalize returns
        assert!(!path.exists());
        assert_eq!(h.storage.download_calls(), 1);
    }

    #[tokio::test]
    async fn test_hashing_copy_is_reused_for_extraction() {
        let h = Harness::new();
        h.storage.hide_md5();
        let data = jpeg_bytes(200_000, 4);
        let init = h
            .initiate(&h.owner_caller(), "a.jpg", &data, "image/jpeg")
            .await;
        h.client_put(&init, &data, "image/jpeg");

        h.finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap();

        assert_eq!(h.storage.download_calls(), 1);
        let inputs = h.extractor.inputs();
        assert_eq!(inputs[0].1, data);
        assert!(!inputs[0].0.exists());
    }

    #[tokio::test]
    async fn test_second_finalize_is_not_found() {
        let h = Harness::new();
        let data = jpeg_bytes(100, 1);
        let init = h
            .initiate(&h.owner_caller(), "a.jpg", &data, "image/jpeg")
            .await;
        h.client_put(&init, &data, "image/jpeg");

        h.finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap();
        let err = h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::VerificationNotFound(id) if id == init.verification_ticket_id));
    }

    #[tokio::test]
    async fn test_finalize_after_failed_integrity_is_not_found() {
        let h = Harness::new();
        let data = jpeg_bytes(100, 1);
        let init = h
            .initiate(&h.owner_caller(), "a.jpg", &data, "image/jpeg")
            .await;
        h.client_put(&init, &jpeg_bytes(100, 2), "image/jpeg");

        let _ = h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await;
        let err = h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::VerificationNotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_finalize_succeeds_once() {
        let h = Harness::new();
        let data = jpeg_bytes(2048, 9);
        let init = h
            .initiate(&h.owner_caller(), "a.jpg", &data, "image/jpeg")
            .await;
        h.client_put(&init, &data, "image/jpeg");

        let caller = h.owner_caller();
        let (first, second) = tokio::join!(
            h.finalizer
                .finalize_upload(init.verification_ticket_id, h.folder.id, &caller),
            h.finalizer
                .finalize_upload(init.verification_ticket_id, h.folder.id, &caller),
        );

        let results = [first, second];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let not_found = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::VerificationNotFound(_))))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(not_found, 1);
        assert!(h.db.file(init.file_id).unwrap().is_committed());
    }

    #[tokio::test]
    async fn test_pin_protected_token_round_trip() {
        let h = Harness::new();
        let token = h.add_share_token(PermissionLevel::Write, Some("1234"));
        let good_key = Caller::token(&token, Some("1234".to_string()));
        let bad_key = Caller::token(&token, Some("9999".to_string()));

        let data = jpeg_bytes(100, 1);
        let init = h.initiate(&good_key, "a.jpg", &data, "image/jpeg").await;
        h.client_put(&init, &data, "image/jpeg");

        let err = h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &bad_key)
            .await
            .unwrap_err();
        assert_eq!(err.denial_reason(), Some(DecisionReason::InvalidPin));
        // Denied before any side effect
        assert!(h.db.ticket(init.verification_ticket_id).is_some());

        assert!(h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &good_key)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_ticket_from_other_folder_is_not_found() {
        let h = Harness::new();
        let other = folio_db::test_helpers::folder_fixture(h.owner, "Other");
        h.db.add_folder(other.clone());

        let data = jpeg_bytes(100, 1);
        let init = h
            .initiate(&h.owner_caller(), "a.jpg", &data, "image/jpeg")
            .await;
        h.client_put(&init, &data, "image/jpeg");

        let err = h
            .finalizer
            .finalize_upload(init.verification_ticket_id, other.id, &h.owner_caller())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::VerificationNotFound(_)));
        assert!(h.db.ticket(init.verification_ticket_id).is_some());
    }

    #[tokio::test]
    async fn test_transient_metadata_failure_releases_ticket() {
        let h = Harness::new();
        let data = jpeg_bytes(100, 1);
        let init = h
            .initiate(&h.owner_caller(), "a.jpg", &data, "image/jpeg")
            .await;
        h.client_put(&init, &data, "image/jpeg");
        h.storage.fail_next_heads(1);

        let err = h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(h.db.ticket(init.verification_ticket_id).is_some());
        assert!(!h.db.file(init.file_id).unwrap().is_committed());

        assert!(h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_loser_of_released_claim_can_retry() {
        use folio_core::ErrorMetadata;
        use folio_db::traits::UploadStore;

        let h = Harness::new();
        let data = jpeg_bytes(100, 1);
        let init = h
            .initiate(&h.owner_caller(), "a.jpg", &data, "image/jpeg")
            .await;
        h.client_put(&init, &data, "image/jpeg");

        // Another finalize holds the claim
        let claimed = h
            .db
            .claim_ticket(init.verification_ticket_id)
            .await
            .unwrap()
            .unwrap();
        let err = h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::VerificationNotFound(_)));
        assert!(err.suggested_action().unwrap().contains("retry finalize"));

        // ...and gives it back after a storage failure
        h.db.restore_ticket(&claimed).await.unwrap();
        assert!(h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_missing_object_releases_ticket() {
        let h = Harness::new();
        let data = jpeg_bytes(100, 1);
        let init = h
            .initiate(&h.owner_caller(), "a.jpg", &data, "image/jpeg")
            .await;

        let err = h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(h.db.ticket(init.verification_ticket_id).is_some());
        assert!(h.db.file(init.file_id).is_some());
    }

    #[tokio::test]
    async fn test_compensation_retries_deletes() {
        let h = Harness::new();
        let data = jpeg_bytes(100, 1);
        let init = h
            .initiate(&h.owner_caller(), "a.jpg", &data, "image/jpeg")
            .await;
        let path = h.db.file(init.file_id).unwrap().object_path;
        h.client_put(&init, &jpeg_bytes(100, 2), "image/jpeg");
        h.storage.fail_next_deletes(2);
        h.db.fail_next_file_deletes(2);

        let err = h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::IntegrityCheckFailed { .. }));
        assert_eq!(h.storage.delete_calls(), 3);
        assert!(!h.storage.has_object(&path));
        assert!(h.db.file(init.file_id).is_none());
    }

    #[tokio::test]
    async fn test_exhausted_compensation_still_reports_mismatch() {
        let h = Harness::new();
        let data = jpeg_bytes(100, 1);
        let init = h
            .initiate(&h.owner_caller(), "a.jpg", &data, "image/jpeg")
            .await;
        let path = h.db.file(init.file_id).unwrap().object_path;
        h.client_put(&init, &jpeg_bytes(100, 2), "image/jpeg");
        h.storage.fail_next_deletes(10);

        let err = h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::IntegrityCheckFailed { .. }));
        // Object is orphaned; the row is still removed
        assert!(h.storage.has_object(&path));
        assert!(h.db.file(init.file_id).is_none());
    }

    #[tokio::test]
    async fn test_video_poster_url_and_cleanup() {
        let h = Harness::new();
        let data = vec![0u8; 4096];

        let init = h
            .initiate(&h.owner_caller(), "clip.mp4", &data, "video/mp4")
            .await;
        let path = h.db.file(init.file_id).unwrap().object_path;
        h.client_put(&init, &data, "video/mp4");
        h.storage
            .set_object(&thumbnail_path(&path), vec![1, 2, 3], "image/jpeg");

        let done = h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap();
        assert_eq!(done.file.media_type, MediaType::Video);
        assert!(done.thumbnail_read_url.unwrap().contains("-thumbnail"));

        let init = h
            .initiate(&h.owner_caller(), "bad.mp4", &data, "video/mp4")
            .await;
        let path = h.db.file(init.file_id).unwrap().object_path;
        h.client_put(&init, &vec![1u8; 4096], "video/mp4");
        h.storage
            .set_object(&thumbnail_path(&path), vec![1, 2, 3], "image/jpeg");

        let err = h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::IntegrityCheckFailed { .. }));
        assert!(!h.storage.has_object(&path));
        assert!(!h.storage.has_object(&thumbnail_path(&path)));
    }

    #[tokio::test]
    async fn test_declared_hash_case_is_ignored() {
        let h = Harness::new();
        let data = jpeg_bytes(64, 3);
        let init = h
            .initiator
            .initiate_upload(
                crate::testing::declared(
                    "a.jpg",
                    64,
                    "image/jpeg",
                    &md5_hex(&data).to_ascii_uppercase(),
                ),
                h.folder.id,
                &h.owner_caller(),
            )
            .await
            .unwrap();
        h.client_put(&init, &data, "image/jpeg");

        assert!(h
            .finalizer
            .finalize_upload(init.verification_ticket_id, h.folder.id, &h.owner_caller())
            .await
            .is_ok());
    }
}
