//! Per-resource adapters in front of the evaluator.
//!
//! Each enforcer loads what its resource kind needs (owners and the folder's tokens),
//! builds a [`ProtectedResource`] and hands it to [`PermissionEvaluator`].

use folio_core::models::{Comment, FileRecord, FolderAccess};
use folio_core::{AppError, Decision, DecisionReason, PermissionLevel, Principal};
use folio_db::traits::{FileStore, FolderStore};
use std::sync::Arc;
use uuid::Uuid;

use crate::evaluator::PermissionEvaluator;
use crate::resource::{ProtectedResource, ResourceKind, ResourceRef};

#[derive(Clone)]
pub struct ResourceEnforcer {
    folders: Arc<dyn FolderStore>,
    files: Arc<dyn FileStore>,
    evaluator: PermissionEvaluator,
}

impl ResourceEnforcer {
    pub fn new(folders: Arc<dyn FolderStore>, files: Arc<dyn FileStore>) -> Self {
        Self {
            folders,
            files,
            evaluator: PermissionEvaluator,
        }
    }

    /// Folder with its tokens, or `FolderNotFound`.
    pub async fn folder_access(&self, folder_id: Uuid) -> Result<FolderAccess, AppError> {
        self.folders
            .get_folder_access(folder_id)
            .await?
            .ok_or(AppError::FolderNotFound(folder_id))
    }

    pub async fn enforce_folder(
        &self,
        folder: &FolderAccess,
        principal: &Principal,
        required: PermissionLevel,
    ) -> Result<Decision, AppError> {
        let resource = ProtectedResource {
            kind: ResourceKind::Folder,
            id: folder.folder.id,
            owners: vec![folder.folder.owner_id],
            tokens: folder.tokens.clone(),
        };
        self.decide(principal, resource, required).await
    }

    /// Files inherit the folder's tokens; both the uploader and the folder owner own them.
    pub async fn enforce_file(
        &self,
        file: &FileRecord,
        principal: &Principal,
        required: PermissionLevel,
    ) -> Result<Decision, AppError> {
        let folder = self.folder_access(file.folder_id).await?;
        let resource = ProtectedResource {
            kind: ResourceKind::File,
            id: file.id,
            owners: vec![file.owner_id, folder.folder.owner_id],
            tokens: folder.tokens,
        };
        self.decide(principal, resource, required).await
    }

    /// Comments resolve through their file to the folder's tokens. Guest comments have
    /// no author account, leaving the folder owner as the only owner.
    pub async fn enforce_comment(
        &self,
        comment: &Comment,
        principal: &Principal,
        required: PermissionLevel,
    ) -> Result<Decision, AppError> {
        let file = self
            .files
            .get_file(comment.file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", comment.file_id)))?;
        let folder = self.folder_access(file.folder_id).await?;

        let mut owners: Vec<Uuid> = comment.author_id.into_iter().collect();
        owners.push(folder.folder.owner_id);

        let resource = ProtectedResource {
            kind: ResourceKind::Comment,
            id: comment.id,
            owners,
            tokens: folder.tokens,
        };
        self.decide(principal, resource, required).await
    }

    /// Sessions see the map of their own folders without a resource check. Token
    /// holders need READ on the token's folder.
    pub async fn enforce_map_access(&self, principal: &Principal) -> Result<Decision, AppError> {
        let credential = match principal {
            Principal::AuthenticatedUser { .. } => return Ok(Decision::allow(principal.clone())),
            Principal::Anonymous => return Ok(Decision::deny(DecisionReason::NotAuthenticated)),
            Principal::ShareToken { credential, .. } | Principal::PersonToken { credential, .. } => {
                credential
            }
        };

        match self.folders.get_folder_access(credential.folder_id).await? {
            Some(folder) => {
                self.enforce_folder(&folder, principal, PermissionLevel::Read)
                    .await
            }
            None => {
                tracing::debug!(
                    folder_id = %credential.folder_id,
                    "Token points at a folder that no longer exists"
                );
                Ok(Decision::deny(DecisionReason::NotAuthenticated))
            }
        }
    }

    /// Load a resource by kind and id and evaluate it.
    #[tracing::instrument(skip(self, principal), fields(principal = principal.kind()))]
    pub async fn enforce(
        &self,
        resource: ResourceRef,
        principal: &Principal,
        required: PermissionLevel,
    ) -> Result<Decision, AppError> {
        match resource.kind {
            ResourceKind::Folder => {
                let folder = self.folder_access(resource.id).await?;
                self.enforce_folder(&folder, principal, required).await
            }
            ResourceKind::File => {
                let file = self
                    .files
                    .get_file(resource.id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("File {} not found", resource.id)))?;
                self.enforce_file(&file, principal, required).await
            }
            ResourceKind::Comment => {
                let comment = self.files.get_comment(resource.id).await?.ok_or_else(|| {
                    AppError::NotFound(format!("Comment {} not found", resource.id))
                })?;
                self.enforce_comment(&comment, principal, required).await
            }
        }
    }

    async fn decide(
        &self,
        principal: &Principal,
        resource: ProtectedResource,
        required: PermissionLevel,
    ) -> Result<Decision, AppError> {
        let kind = resource.kind;
        let id = resource.id;
        let needs_pin = principal
            .credential()
            .is_some_and(|c| resource.needs_pin_check(&c.token));

        let decision = if needs_pin {
            // Hash comparison is CPU-bound
            let evaluator = self.evaluator;
            let principal = principal.clone();
            tokio::task::spawn_blocking(move || evaluator.evaluate(&principal, &resource, required))
                .await
                .map_err(|e| AppError::Internal(format!("Access evaluation task failed: {}", e)))?
        } else {
            self.evaluator.evaluate(principal, &resource, required)
        };

        if decision.allowed {
            tracing::debug!(
                resource_kind = ?kind,
                resource_id = %id,
                principal = principal.kind(),
                required = ?required,
                "Access granted"
            );
        } else {
            tracing::debug!(
                resource_kind = ?kind,
                resource_id = %id,
                principal = principal.kind(),
                required = ?required,
                reason = decision.reason.as_str(),
                "Access denied"
            );
        }

        Ok(decision)
    }
}
