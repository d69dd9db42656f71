use folio_core::CapabilityToken;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Folder,
    File,
    Comment,
}

/// Evaluator input: who owns the resource and which tokens grant access to it.
///
/// Files and comments carry their folder's tokens; they have none of their own.
#[derive(Debug, Clone)]
pub struct ProtectedResource {
    pub kind: ResourceKind,
    pub id: Uuid,
    pub owners: Vec<Uuid>,
    pub tokens: Vec<CapabilityToken>,
}

impl ProtectedResource {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owners.contains(&user_id)
    }

    pub fn token(&self, token: &str) -> Option<&CapabilityToken> {
        self.tokens.iter().find(|t| t.token == token)
    }

    /// Whether evaluating `token` here may need a PIN hash comparison.
    pub fn needs_pin_check(&self, token: &str) -> bool {
        self.token(token).is_some_and(CapabilityToken::is_pin_locked)
    }
}

/// A resource addressed by kind and id, as received from a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: Uuid,
}
