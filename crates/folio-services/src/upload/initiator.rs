use chrono::{Duration as ChronoDuration, Utc};
use folio_access::{Caller, PrincipalResolver, ResourceEnforcer};
use folio_core::constants::THUMBNAIL_CONTENT_TYPE;
use folio_core::models::{
    InitiateUploadRequest, InitiateUploadResponse, NewPendingFile, NewUploadTicket,
};
use folio_core::validation::validate_declared_upload;
use folio_core::{AppError, MediaType, PermissionLevel};
use folio_db::traits::UploadStore;
use folio_storage::keys::{object_path, thumbnail_path};
use folio_storage::{Storage, StorageResult};
use std::sync::Arc;
use uuid::Uuid;

use super::mime_essence;
use crate::settings::UploadSettings;

/// Phase one of the upload saga.
///
/// `requested -> validated -> authorized -> reserved -> credential-issued`. Nothing is
/// written before authorization; a failure after reservation discards the reservation.
#[derive(Clone)]
pub struct UploadInitiator {
    resolver: PrincipalResolver,
    enforcer: ResourceEnforcer,
    uploads: Arc<dyn UploadStore>,
    storage: Arc<dyn Storage>,
    settings: UploadSettings,
}

struct IssuedUrls {
    upload_url: String,
    thumbnail_upload_url: Option<String>,
}

impl UploadInitiator {
    pub fn new(
        resolver: PrincipalResolver,
        enforcer: ResourceEnforcer,
        uploads: Arc<dyn UploadStore>,
        storage: Arc<dyn Storage>,
        settings: UploadSettings,
    ) -> Self {
        Self {
            resolver,
            enforcer,
            uploads,
            storage,
            settings,
        }
    }

    #[tracing::instrument(
        skip(self, declared, caller),
        fields(folder_id = %folder_id, content_type = %declared.content_type, size = declared.size)
    )]
    pub async fn initiate_upload(
        &self,
        declared: InitiateUploadRequest,
        folder_id: Uuid,
        caller: &Caller,
    ) -> Result<InitiateUploadResponse, AppError> {
        let media_type = validate_declared_upload(&declared, &self.settings.limits)?;

        let folder = self.enforcer.folder_access(folder_id).await?;
        let principal = self.resolver.resolve(caller).await?;
        let principal = self
            .enforcer
            .enforce_folder(&folder, &principal, PermissionLevel::Write)
            .await?
            .into_result()?;

        let file_id = Uuid::new_v4();
        let path = object_path(folder.folder.owner_id, folder_id, file_id);
        let content_type = mime_essence(&declared.content_type);
        let expires_at = Utc::now()
            + ChronoDuration::from_std(self.settings.upload_url_ttl)
                .map_err(|e| AppError::Internal(format!("Invalid upload URL TTL: {}", e)))?;
        let size_bytes = i64::try_from(declared.size)
            .map_err(|_| AppError::InvalidInput("File size is out of range".to_string()))?;

        let pending = NewPendingFile {
            id: file_id,
            folder_id,
            owner_id: principal.user_id().unwrap_or(folder.folder.owner_id),
            name: declared.name,
            media_type,
            content_type: content_type.clone(),
            size_bytes,
            object_path: path.clone(),
        };
        let ticket = NewUploadTicket {
            id: Uuid::new_v4(),
            expected_mime: content_type.clone(),
            expected_size: size_bytes,
            expected_md5: declared.md5.to_ascii_lowercase(),
            expires_at,
        };

        let ticket = self
            .uploads
            .create_pending_with_ticket(pending, ticket)
            .await?;

        let urls = match self.issue_urls(&path, &content_type, media_type).await {
            Ok(urls) => urls,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    file_id = %file_id,
                    ticket_id = %ticket.id,
                    object_path = %path,
                    "Signed upload URL could not be issued, discarding reservation"
                );
                if let Err(discard_err) = self.uploads.discard_pending(file_id).await {
                    tracing::error!(
                        error = %discard_err,
                        file_id = %file_id,
                        "Failed to discard pending file after signing failure"
                    );
                }
                return Err(e.into());
            }
        };

        tracing::info!(
            file_id = %file_id,
            ticket_id = %ticket.id,
            object_path = %path,
            media_type = %media_type,
            principal = principal.kind(),
            "Upload initiated"
        );

        Ok(InitiateUploadResponse {
            upload_url: urls.upload_url,
            verification_ticket_id: ticket.id,
            file_id,
            expires_at: ticket.expires_at,
            thumbnail_upload_url: urls.thumbnail_upload_url,
        })
    }

    async fn issue_urls(
        &self,
        path: &str,
        content_type: &str,
        media_type: MediaType,
    ) -> StorageResult<IssuedUrls> {
        let ttl = self.settings.upload_url_ttl;
        let upload_url = self
            .storage
            .presigned_put_url(path, content_type, ttl)
            .await?;

        let thumbnail_upload_url = match media_type {
            MediaType::Video => Some(
                self.storage
                    .presigned_put_url(&thumbnail_path(path), THUMBNAIL_CONTENT_TYPE, ttl)
                    .await?,
            ),
            MediaType::Image => None,
        };

        Ok(IssuedUrls {
            upload_url,
            thumbnail_upload_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{declared, Harness};
    use folio_core::models::FilePhase;
    use folio_core::DecisionReason;

    #[tokio::test]
    async fn test_owner_initiates_image_upload() {
        let h = Harness::new();
        let response = h
            .initiator
            .initiate_upload(
                declared("beach.jpg", 500_000, "image/jpeg", &"a".repeat(32)),
                h.folder.id,
                &h.owner_caller(),
            )
            .await
            .unwrap();

        assert!(response.upload_url.contains("method=PUT"));
        assert!(response.thumbnail_upload_url.is_none());

        let file = h.db.file(response.file_id).unwrap();
        assert_eq!(file.phase, FilePhase::Pending);
        assert_eq!(file.media_type, MediaType::Image);
        assert_eq!(
            file.object_path,
            format!("{}/{}/{}", h.owner, h.folder.id, response.file_id)
        );

        let ticket = h.db.ticket(response.verification_ticket_id).unwrap();
        assert_eq!(ticket.file_id, response.file_id);
        assert_eq!(ticket.expected_size, 500_000);
        assert_eq!(ticket.expected_mime, "image/jpeg");
        assert_eq!(ticket.object_path, file.object_path);
        assert_eq!(ticket.expires_at, response.expires_at);
    }

    #[tokio::test]
    async fn test_video_gets_thumbnail_url() {
        let h = Harness::new();
        let response = h
            .initiator
            .initiate_upload(
                declared("clip.mp4", 10_000, "video/mp4", &"b".repeat(32)),
                h.folder.id,
                &h.owner_caller(),
            )
            .await
            .unwrap();

        let thumbnail = response.thumbnail_upload_url.unwrap();
        assert!(thumbnail.contains(&format!("{}-thumbnail", response.file_id)));

        let file = h.db.file(response.file_id).unwrap();
        assert_eq!(
            h.storage.put_binding(&thumbnail_path(&file.object_path)).as_deref(),
            Some(THUMBNAIL_CONTENT_TYPE)
        );
    }

    #[tokio::test]
    async fn test_upload_url_refuses_other_content_type() {
        let h = Harness::new();
        let response = h
            .initiator
            .initiate_upload(
                declared("beach.jpg", 6, "image/jpeg", &"a".repeat(32)),
                h.folder.id,
                &h.owner_caller(),
            )
            .await
            .unwrap();
        let path = h.db.file(response.file_id).unwrap().object_path;

        assert_eq!(h.storage.put_binding(&path).as_deref(), Some("image/jpeg"));
        assert!(h
            .storage
            .client_put(&path, b"frames".to_vec(), "video/mp4")
            .is_err());
        assert!(!h.storage.has_object(&path));

        h.storage
            .client_put(&path, b"pixels".to_vec(), "image/jpeg")
            .unwrap();
        assert!(h.storage.has_object(&path));
    }

    #[tokio::test]
    async fn test_rejected_declaration_writes_nothing() {
        let h = Harness::new();
        let cases = [
            declared("doc.pdf", 10, "application/pdf", &"a".repeat(32)),
            declared("x.jpg", 10, "image/jpeg", "not-hex-not-hex-not-hex-not-hex!"),
            declared("../x.jpg", 10, "image/jpeg", &"a".repeat(32)),
            declared("x.jpg", 0, "image/jpeg", &"a".repeat(32)),
            declared("big.jpg", 51 * 1024 * 1024, "image/jpeg", &"a".repeat(32)),
        ];

        for request in cases {
            let result = h
                .initiator
                .initiate_upload(request, h.folder.id, &h.owner_caller())
                .await;
            let err = result.unwrap_err();
            assert!(
                matches!(err, AppError::InvalidInput(_) | AppError::InvalidFileType(_)),
                "unexpected error {:?}",
                err
            );
        }
        assert_eq!(h.db.file_count(), 0);
        assert_eq!(h.db.ticket_count(), 0);
    }

    #[tokio::test]
    async fn test_denied_caller_writes_nothing() {
        let h = Harness::new();
        let read_only = h.add_share_token(PermissionLevel::Read, None);

        for caller in [
            Caller::anonymous(),
            Caller::user(Uuid::new_v4()),
            Caller::token(&read_only, None),
        ] {
            let err = h
                .initiator
                .initiate_upload(
                    declared("a.jpg", 10, "image/jpeg", &"a".repeat(32)),
                    h.folder.id,
                    &caller,
                )
                .await
                .unwrap_err();
            assert!(err.denial_reason().is_some(), "unexpected error {:?}", err);
        }
        assert_eq!(h.db.file_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_folder() {
        let h = Harness::new();
        let missing = Uuid::new_v4();
        let err = h
            .initiator
            .initiate_upload(
                declared("a.jpg", 10, "image/jpeg", &"a".repeat(32)),
                missing,
                &h.owner_caller(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FolderNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_pin_protected_write_token() {
        let h = Harness::new();
        let token = h.add_share_token(PermissionLevel::Write, Some("1234"));

        let ok = h
            .initiator
            .initiate_upload(
                declared("a.jpg", 10, "image/jpeg", &"a".repeat(32)),
                h.folder.id,
                &Caller::token(&token, Some("1234".to_string())),
            )
            .await
            .unwrap();
        // Token uploads are owned by the folder owner
        assert_eq!(h.db.file(ok.file_id).unwrap().owner_id, h.owner);

        let err = h
            .initiator
            .initiate_upload(
                declared("b.jpg", 10, "image/jpeg", &"a".repeat(32)),
                h.folder.id,
                &Caller::token(&token, Some("9999".to_string())),
            )
            .await
            .unwrap_err();
        assert_eq!(err.denial_reason(), Some(DecisionReason::InvalidPin));
        assert_eq!(h.db.file_count(), 1);
    }

    #[tokio::test]
    async fn test_signing_failure_discards_reservation() {
        let h = Harness::new();
        h.storage.fail_signing(true);

        let err = h
            .initiator
            .initiate_upload(
                declared("a.jpg", 10, "image/jpeg", &"a".repeat(32)),
                h.folder.id,
                &h.owner_caller(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(h.db.file_count(), 0);
        assert_eq!(h.db.ticket_count(), 0);
    }
}
