use folio_access::{Caller, PrincipalResolver, ResourceEnforcer};
use folio_core::models::MapPoint;
use folio_core::{AppError, DecisionReason, Principal};
use folio_db::traits::FileStore;
use std::sync::Arc;

/// Geotagged files visible to a caller, for the map view.
#[derive(Clone)]
pub struct MapService {
    resolver: PrincipalResolver,
    enforcer: ResourceEnforcer,
    files: Arc<dyn FileStore>,
}

impl MapService {
    pub fn new(
        resolver: PrincipalResolver,
        enforcer: ResourceEnforcer,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            resolver,
            enforcer,
            files,
        }
    }

    /// Sessions see every folder they own; token holders see the token's folder.
    #[tracing::instrument(skip(self, caller))]
    pub async fn list_map_points(&self, caller: &Caller) -> Result<Vec<MapPoint>, AppError> {
        let principal = self.resolver.resolve(caller).await?;
        let principal = self
            .enforcer
            .enforce_map_access(&principal)
            .await?
            .into_result()?;

        let points = match &principal {
            Principal::AuthenticatedUser { id } => self.files.list_geotagged_owned(*id).await?,
            Principal::ShareToken { credential, .. } | Principal::PersonToken { credential, .. } => {
                self.files
                    .list_geotagged_in_folder(credential.folder_id)
                    .await?
            }
            Principal::Anonymous => {
                return Err(AppError::AccessDenied(DecisionReason::NotAuthenticated))
            }
        };

        tracing::debug!(
            principal = principal.kind(),
            count = points.len(),
            "Map points listed"
        );
        Ok(points)
    }
}
