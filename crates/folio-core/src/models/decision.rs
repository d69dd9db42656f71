use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Principal;
use crate::error::AppError;

/// Why an access decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionReason {
    Ok,
    NotAuthenticated,
    Forbidden,
    InvalidPin,
    Expired,
    Inactive,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::Ok => "ok",
            DecisionReason::NotAuthenticated => "not-authenticated",
            DecisionReason::Forbidden => "forbidden",
            DecisionReason::InvalidPin => "invalid-pin",
            DecisionReason::Expired => "expired",
            DecisionReason::Inactive => "inactive",
        }
    }
}

/// Outcome of one access check.
///
/// Built only through [`Decision::allow`] and [`Decision::deny`], so a denial always
/// carries a reason other than `Ok` and an allowance always carries its principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub reason: DecisionReason,
    pub principal: Option<Principal>,
}

impl Decision {
    pub fn allow(principal: Principal) -> Self {
        Self {
            allowed: true,
            reason: DecisionReason::Ok,
            principal: Some(principal),
        }
    }

    pub fn deny(reason: DecisionReason) -> Self {
        debug_assert!(reason != DecisionReason::Ok, "denial requires a reason");
        Self {
            allowed: false,
            reason,
            principal: None,
        }
    }

    /// Turn the decision into the principal to act as, or the matching authorization error.
    pub fn into_result(self) -> Result<Principal, AppError> {
        match self {
            Decision {
                allowed: true,
                principal: Some(principal),
                ..
            } => Ok(principal),
            Decision { allowed: true, .. } => Err(AppError::Internal(
                "Access allowed without a principal".to_string(),
            )),
            Decision { reason, .. } => Err(AppError::AccessDenied(reason)),
        }
    }
}
