use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{CapabilityToken, PermissionLevel, PinHash, TokenAudience};

/// The capability a token principal presented, plus the PIN key it supplied.
///
/// The key is carried unevaluated: whether it matters depends on the level the
/// operation requires and on the token found on the resource.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenCredential {
    pub token: String,
    pub folder_id: Uuid,
    pub permission: PermissionLevel,
    pub pin_hash: Option<PinHash>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub key: Option<String>,
}

impl fmt::Debug for TokenCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCredential")
            .field("folder_id", &self.folder_id)
            .field("permission", &self.permission)
            .field("pin_locked", &self.pin_hash.is_some())
            .field("expires_at", &self.expires_at)
            .field("is_active", &self.is_active)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Resolved identity of a caller for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    AuthenticatedUser {
        id: Uuid,
    },
    ShareToken {
        credential: TokenCredential,
        email: Option<String>,
    },
    PersonToken {
        credential: TokenCredential,
        target_email: String,
    },
    Anonymous,
}

impl Principal {
    /// Wrap a looked-up token as the principal matching its audience.
    pub fn from_token(token: CapabilityToken, key: Option<String>) -> Self {
        let credential = TokenCredential {
            token: token.token,
            folder_id: token.folder_id,
            permission: token.permission,
            pin_hash: token.pin_hash,
            expires_at: token.expires_at,
            is_active: token.is_active,
            key,
        };

        match token.audience {
            TokenAudience::Shared { email } => Principal::ShareToken { credential, email },
            TokenAudience::Person { target_email } => Principal::PersonToken {
                credential,
                target_email,
            },
        }
    }

    pub fn credential(&self) -> Option<&TokenCredential> {
        match self {
            Principal::ShareToken { credential, .. } | Principal::PersonToken { credential, .. } => {
                Some(credential)
            }
            Principal::AuthenticatedUser { .. } | Principal::Anonymous => None,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Principal::AuthenticatedUser { id } => Some(*id),
            _ => None,
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Principal::AuthenticatedUser { .. } => "user",
            Principal::ShareToken { .. } => "share_token",
            Principal::PersonToken { .. } => "person_token",
            Principal::Anonymous => "anonymous",
        }
    }

    /// Client-safe view: no token strings, hashes or keys.
    pub fn summary(&self) -> PrincipalSummary {
        match self {
            Principal::AuthenticatedUser { id } => PrincipalSummary {
                kind: self.kind(),
                user_id: Some(*id),
                permission: None,
                email: None,
            },
            Principal::ShareToken { credential, email } => PrincipalSummary {
                kind: self.kind(),
                user_id: None,
                permission: Some(credential.permission),
                email: email.clone(),
            },
            Principal::PersonToken {
                credential,
                target_email,
            } => PrincipalSummary {
                kind: self.kind(),
                user_id: None,
                permission: Some(credential.permission),
                email: Some(target_email.clone()),
            },
            Principal::Anonymous => PrincipalSummary {
                kind: self.kind(),
                user_id: None,
                permission: None,
                email: None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PrincipalSummary {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<PermissionLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}
