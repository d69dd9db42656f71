use crate::auth::CallerContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use folio_core::models::{FinalizeUploadResponse, InitiateUploadRequest, InitiateUploadResponse};
use std::sync::Arc;
use uuid::Uuid;

/// Reserve a file in a folder and get a signed URL to PUT its bytes to
#[utoipa::path(
    post,
    path = "/api/v0/folders/{folder_id}/uploads",
    tag = "uploads",
    params(("folder_id" = Uuid, Path, description = "Target folder")),
    request_body = InitiateUploadRequest,
    responses(
        (status = 201, description = "Upload reserved", body = InitiateUploadResponse),
        (status = 400, description = "Invalid declaration", body = ErrorResponse),
        (status = 401, description = "Not authenticated or invalid PIN", body = ErrorResponse),
        (status = 403, description = "Insufficient permission", body = ErrorResponse),
        (status = 404, description = "Folder not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, caller, request), fields(folder_id = %folder_id))]
pub async fn initiate_upload(
    State(state): State<Arc<AppState>>,
    Path(folder_id): Path<Uuid>,
    CallerContext(caller): CallerContext,
    ValidatedJson(request): ValidatedJson<InitiateUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = state
        .uploads
        .initiator
        .initiate_upload(request, folder_id, &caller)
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Verify the uploaded bytes against the declaration and commit the file
#[utoipa::path(
    post,
    path = "/api/v0/folders/{folder_id}/uploads/{ticket_id}/finalize",
    tag = "uploads",
    params(
        ("folder_id" = Uuid, Path, description = "Folder the upload was initiated in"),
        ("ticket_id" = Uuid, Path, description = "Verification ticket from initiate")
    ),
    responses(
        (status = 200, description = "File committed", body = FinalizeUploadResponse),
        (status = 401, description = "Not authenticated or invalid PIN", body = ErrorResponse),
        (status = 403, description = "Insufficient permission", body = ErrorResponse),
        (status = 404, description = "Ticket or folder not found", body = ErrorResponse),
        (status = 422, description = "Stored object does not match the declaration", body = ErrorResponse),
        (status = 502, description = "Storage unavailable, retry", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, caller), fields(folder_id = %folder_id, ticket_id = %ticket_id))]
pub async fn finalize_upload(
    State(state): State<Arc<AppState>>,
    Path((folder_id, ticket_id)): Path<(Uuid, Uuid)>,
    CallerContext(caller): CallerContext,
) -> Result<Json<FinalizeUploadResponse>, HttpAppError> {
    let response = state
        .uploads
        .finalizer
        .finalize_upload(ticket_id, folder_id, &caller)
        .await?;

    Ok(Json(response))
}
