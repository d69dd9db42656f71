//! Shared fixture for upload saga tests: in-memory database, blob store and extractor
//! wired into real services.

use chrono::{Duration as ChronoDuration, Utc};
use folio_access::{Caller, PrincipalResolver, ResourceEnforcer};
use folio_core::models::{Folder, InitiateUploadRequest, InitiateUploadResponse};
use folio_core::validation::UploadLimits;
use folio_core::{CapabilityToken, PermissionLevel, PinHash, TokenAudience};
use folio_db::test_helpers::{folder_fixture, MockDatabase};
use folio_processing::test_helpers::MockExtractor;
use folio_storage::test_helpers::MockStorage;
use md5::{Digest, Md5};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::map::MapService;
use crate::retry::RetryPolicy;
use crate::settings::UploadSettings;
use crate::upload::{UploadFinalizer, UploadInitiator};

pub(crate) fn declared(
    name: &str,
    size: u64,
    content_type: &str,
    md5: &str,
) -> InitiateUploadRequest {
    InitiateUploadRequest {
        name: name.to_string(),
        size,
        content_type: content_type.to_string(),
        md5: md5.to_string(),
    }
}

pub(crate) fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

pub(crate) fn settings() -> UploadSettings {
    UploadSettings {
        upload_url_ttl: Duration::from_secs(900),
        read_url_ttl: Duration::from_secs(3600),
        limits: UploadLimits {
            max_image_bytes: 50 * 1024 * 1024,
            max_video_bytes: 2048 * 1024 * 1024,
        },
        compensation_retry: RetryPolicy::immediate(3),
    }
}

pub(crate) struct Harness {
    pub db: MockDatabase,
    pub storage: MockStorage,
    pub extractor: MockExtractor,
    pub initiator: UploadInitiator,
    pub finalizer: UploadFinalizer,
    pub map: MapService,
    pub owner: Uuid,
    pub folder: Folder,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_extractor(MockExtractor::failing())
    }

    pub fn with_extractor(extractor: MockExtractor) -> Self {
        let db = MockDatabase::new();
        let storage = MockStorage::new();
        let owner = Uuid::new_v4();
        let folder = folder_fixture(owner, "Holidays");
        db.add_folder(folder.clone());

        let shared = Arc::new(db.clone());
        let resolver = PrincipalResolver::new(shared.clone());
        let enforcer = ResourceEnforcer::new(shared.clone(), shared.clone());
        let blob_store = Arc::new(storage.clone());

        let initiator = UploadInitiator::new(
            resolver.clone(),
            enforcer.clone(),
            shared.clone(),
            blob_store.clone(),
            settings(),
        );
        let finalizer = UploadFinalizer::new(
            resolver.clone(),
            enforcer.clone(),
            shared.clone(),
            shared.clone(),
            blob_store,
            Arc::new(extractor.clone()),
            settings(),
        );
        let map = MapService::new(resolver, enforcer, shared);

        Self {
            db,
            storage,
            extractor,
            initiator,
            finalizer,
            map,
            owner,
            folder,
        }
    }

    pub fn owner_caller(&self) -> Caller {
        Caller::user(self.owner)
    }

    /// Add an active share token on the harness folder and return its token string.
    pub fn add_share_token(&self, permission: PermissionLevel, pin: Option<&str>) -> String {
        let token = format!("share-{}", Uuid::new_v4());
        self.db.add_token(CapabilityToken {
            token: token.clone(),
            folder_id: self.folder.id,
            permission,
            pin_hash: pin.map(|p| PinHash::new(bcrypt::hash(p, 4).unwrap())),
            expires_at: Utc::now() + ChronoDuration::days(1),
            is_active: true,
            audience: TokenAudience::Shared { email: None },
        });
        token
    }

    /// Initiate an upload declaring `data`'s real size and hash.
    pub async fn initiate(
        &self,
        caller: &Caller,
        name: &str,
        data: &[u8],
        content_type: &str,
    ) -> InitiateUploadResponse {
        self.initiator
            .initiate_upload(
                declared(name, data.len() as u64, content_type, &md5_hex(data)),
                self.folder.id,
                caller,
            )
            .await
            .unwrap()
    }

    /// Place the object as if the client had PUT it. The content type is stored as
    /// given, so finalize's own type check can be exercised.
    pub fn client_put(&self, response: &InitiateUploadResponse, data: &[u8], content_type: &str) {
        let file = self.db.file(response.file_id).unwrap();
        self.storage
            .set_object(&file.object_path, data.to_vec(), content_type);
    }
}
