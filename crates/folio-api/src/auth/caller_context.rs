use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use folio_access::Caller;
use folio_core::{AppError, DecisionReason};
use std::sync::Arc;

use super::SessionVerifier;
use crate::error::HttpAppError;
use crate::state::AppState;

pub use folio_core::constants::{SHARE_KEY_HEADER, SHARE_TOKEN_HEADER};

/// The caller as presented by the request headers.
#[derive(Debug, Clone)]
pub struct CallerContext(pub Caller);

impl CallerContext {
    pub fn from_headers(headers: &HeaderMap, sessions: &SessionVerifier) -> Result<Self, AppError> {
        let user_id = match headers.get(AUTHORIZATION) {
            Some(value) => {
                let token = value
                    .to_str()
                    .ok()
                    .and_then(|v| v.strip_prefix("Bearer "))
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or(AppError::AccessDenied(DecisionReason::NotAuthenticated))?;
                Some(sessions.verify(token)?)
            }
            None => None,
        };

        Ok(CallerContext(Caller {
            user_id,
            share_token: header_string(headers, SHARE_TOKEN_HEADER),
            share_key: header_string(headers, SHARE_KEY_HEADER),
        }))
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl FromRequestParts<Arc<AppState>> for CallerContext {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers, &state.sessions).map_err(HttpAppError::from)
    }
}
