use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::PermissionLevel;

/// A stored one-way PIN hash (argon2 PHC string or bcrypt).
///
/// Kept distinct from plain strings so a supplied PIN and a stored hash can never be
/// passed in each other's position.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinHash(String);

impl PinHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PinHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PinHash(<redacted>)")
    }
}

/// Who a capability token was issued to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenAudience {
    /// Folder share link; `email` is recorded when the link was sent to someone.
    Shared { email: Option<String> },
    /// Per-person invitation bound to one address.
    Person { target_email: String },
}

/// A bearer capability granting a fixed permission on one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityToken {
    pub token: String,
    pub folder_id: Uuid,
    pub permission: PermissionLevel,
    pub pin_hash: Option<PinHash>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub audience: TokenAudience,
}

impl CapabilityToken {
    /// Expiry is inclusive: a token whose `expires_at` equals `now` is expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_pin_locked(&self) -> bool {
        self.pin_hash.is_some()
    }
}
