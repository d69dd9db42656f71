use folio_core::{AppError, Principal};
use folio_db::traits::FolderStore;
use std::sync::Arc;

use crate::caller::Caller;

/// Turns request identity inputs into exactly one [`Principal`].
///
/// Nothing is cached: every call reads the token tables again.
#[derive(Clone)]
pub struct PrincipalResolver {
    folders: Arc<dyn FolderStore>,
}

impl PrincipalResolver {
    pub fn new(folders: Arc<dyn FolderStore>) -> Self {
        Self { folders }
    }

    /// A session always wins. Otherwise the share-token table is consulted before the
    /// person-token table; an unknown or inactive token resolves to `Anonymous`.
    /// Expiry and PIN are left to the evaluator.
    pub async fn resolve(&self, caller: &Caller) -> Result<Principal, AppError> {
        if let Some(id) = caller.user_id {
            return Ok(Principal::AuthenticatedUser { id });
        }

        let Some(token) = caller.share_token.as_deref().filter(|t| !t.is_empty()) else {
            return Ok(Principal::Anonymous);
        };

        let found = match self.folders.find_share_token(token).await? {
            Some(found) => Some(found),
            None => self.folders.find_person_token(token).await?,
        };

        match found {
            Some(found) if found.is_active => {
                Ok(Principal::from_token(found, caller.share_key.clone()))
            }
            Some(_) => {
                tracing::debug!("Inactive capability token presented");
                Ok(Principal::Anonymous)
            }
            None => {
                tracing::debug!("Unknown capability token presented");
                Ok(Principal::Anonymous)
            }
        }
    }
}
