//! The single access decision procedure.
//!
//! Every enforcer shapes its resource into a [`ProtectedResource`] and calls
//! [`PermissionEvaluator::evaluate`]; no other code branches on token state.

use chrono::{DateTime, Utc};
use folio_core::{Decision, DecisionReason, PermissionLevel, Principal};

use crate::pin::PasswordHashGate;
use crate::resource::ProtectedResource;

#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionEvaluator;

impl PermissionEvaluator {
    pub fn evaluate(
        &self,
        principal: &Principal,
        resource: &ProtectedResource,
        required: PermissionLevel,
    ) -> Decision {
        self.evaluate_at(principal, resource, required, Utc::now())
    }

    /// Checks run in a fixed order: ownership, authentication, token lookup, expiry,
    /// active flag, PIN, permission strength.
    pub fn evaluate_at(
        &self,
        principal: &Principal,
        resource: &ProtectedResource,
        required: PermissionLevel,
        now: DateTime<Utc>,
    ) -> Decision {
        let credential = match principal {
            Principal::AuthenticatedUser { id } if resource.is_owned_by(*id) => {
                return Decision::allow(principal.clone());
            }
            Principal::AuthenticatedUser { .. } => {
                return Decision::deny(DecisionReason::Forbidden);
            }
            Principal::Anonymous => return Decision::deny(DecisionReason::NotAuthenticated),
            Principal::ShareToken { credential, .. } | Principal::PersonToken { credential, .. } => {
                credential
            }
        };

        // State comes from the token as stored on the resource; the principal only
        // names it and carries the caller's key.
        let Some(token) = resource.token(&credential.token) else {
            return Decision::deny(DecisionReason::NotAuthenticated);
        };

        if token.is_expired_at(now) {
            return Decision::deny(DecisionReason::Expired);
        }

        if !token.is_active {
            return Decision::deny(DecisionReason::Inactive);
        }

        if let Some(stored) = &token.pin_hash {
            let pin_ok = credential
                .key
                .as_deref()
                .is_some_and(|key| PasswordHashGate::verify(key, stored));
            if !pin_ok {
                return Decision::deny(DecisionReason::InvalidPin);
            }
        }

        if !token.permission.satisfies(required) {
            return Decision::deny(DecisionReason::Forbidden);
        }

        Decision::allow(principal.clone())
    }
}
