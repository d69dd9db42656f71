use crate::auth::CallerContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, Json};
use folio_access::ResourceRef;
use folio_core::models::PrincipalSummary;
use folio_core::{Decision, DecisionReason, PermissionLevel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AccessCheckRequest {
    pub resource: ResourceRef,
    pub required: PermissionLevel,
}

/// A decision as shown to the caller: token strings, hashes and keys are never echoed.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccessCheckResponse {
    pub allowed: bool,
    pub reason: DecisionReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<PrincipalSummary>,
}

impl From<Decision> for AccessCheckResponse {
    fn from(decision: Decision) -> Self {
        AccessCheckResponse {
            allowed: decision.allowed,
            reason: decision.reason,
            principal: decision.principal.as_ref().map(|p| p.summary()),
        }
    }
}

/// Ask whether the caller holds a permission on a folder, file or comment
///
/// A denial is a normal answer here (200 with `allowed: false`); only unknown resources
/// and infrastructure failures are errors.
#[utoipa::path(
    post,
    path = "/api/v0/access/check",
    tag = "access",
    request_body = AccessCheckRequest,
    responses(
        (status = 200, description = "Access decision", body = AccessCheckResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Resource not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, caller, request), fields(kind = ?request.resource.kind, resource_id = %request.resource.id))]
pub async fn check_access(
    State(state): State<Arc<AppState>>,
    CallerContext(caller): CallerContext,
    ValidatedJson(request): ValidatedJson<AccessCheckRequest>,
) -> Result<Json<AccessCheckResponse>, HttpAppError> {
    let principal = state.access.resolver.resolve(&caller).await?;
    let decision = state
        .access
        .enforcer
        .enforce(request.resource, &principal, request.required)
        .await?;

    Ok(Json(decision.into()))
}
