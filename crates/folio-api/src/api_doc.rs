//! OpenAPI documentation, served at `/api-docs/openapi.json`.

use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::handlers;
use folio_access::{ResourceKind, ResourceRef};
use folio_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Folio API",
        version = "0.1.0",
        description = "Folder-based photo and video sharing (v0). Uploads go straight to object storage through signed URLs and are verified before they are committed. Access is granted by ownership or by capability tokens, optionally PIN-protected."
    ),
    paths(
        handlers::uploads::initiate_upload,
        handlers::uploads::finalize_upload,
        handlers::access::check_access,
        handlers::map::list_map_points,
    ),
    components(
        schemas(
            ErrorResponse,
            models::InitiateUploadRequest,
            models::InitiateUploadResponse,
            models::FinalizeUploadResponse,
            models::FileResponse,
            models::MediaType,
            models::FilePhase,
            models::MapPoint,
            models::PermissionLevel,
            models::DecisionReason,
            models::PrincipalSummary,
            ResourceKind,
            ResourceRef,
            handlers::access::AccessCheckRequest,
            handlers::access::AccessCheckResponse,
        )
    ),
    tags(
        (name = "uploads", description = "Two-phase direct-to-storage uploads"),
        (name = "access", description = "Capability-based access checks"),
        (name = "map", description = "Geotagged media")
    )
)]
pub struct ApiDoc;
