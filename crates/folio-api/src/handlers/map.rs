use crate::auth::CallerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, Json};
use folio_core::models::MapPoint;
use std::sync::Arc;

/// List geotagged files visible to the caller
#[utoipa::path(
    get,
    path = "/api/v0/map/points",
    tag = "map",
    responses(
        (status = 200, description = "Geotagged files", body = Vec<MapPoint>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Token cannot read its folder", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, caller))]
pub async fn list_map_points(
    State(state): State<Arc<AppState>>,
    CallerContext(caller): CallerContext,
) -> Result<Json<Vec<MapPoint>>, HttpAppError> {
    let points = state.map.list_map_points(&caller).await?;
    tracing::debug!(count = points.len(), "Map points listed");
    Ok(Json(points))
}
