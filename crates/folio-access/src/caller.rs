use std::fmt;
use uuid::Uuid;

/// Raw per-request identity inputs, before resolution.
///
/// `user_id` comes from a verified session; `share_token` and `share_key` are taken
/// from the request as-is.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<Uuid>,
    pub share_token: Option<String>,
    pub share_key: Option<String>,
}

impl Caller {
    pub fn user(id: Uuid) -> Self {
        Self {
            user_id: Some(id),
            ..Default::default()
        }
    }

    pub fn token(token: impl Into<String>, key: Option<String>) -> Self {
        Self {
            user_id: None,
            share_token: Some(token.into()),
            share_key: key,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl fmt::Debug for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caller")
            .field("user_id", &self.user_id)
            .field("share_token", &self.share_token.as_ref().map(|_| "<redacted>"))
            .field("share_key", &self.share_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
