//! Route configuration and setup.

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use folio_core::constants::API_PREFIX;
use folio_core::Config;
#[cfg(feature = "storage-local")]
use folio_storage::LocalStorage;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::auth::{SHARE_KEY_HEADER, SHARE_TOKEN_HEADER};

/// Bytes never pass through the API; only small JSON bodies do.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config, &[Method::GET, Method::POST, Method::OPTIONS])?;

    let app = Router::new()
        .nest(API_PREFIX, api_routes())
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/folders/{folder_id}/uploads",
            post(handlers::uploads::initiate_upload),
        )
        .route(
            "/folders/{folder_id}/uploads/{ticket_id}/finalize",
            post(handlers::uploads::finalize_upload),
        )
        .route("/access/check", post(handlers::access::check_access))
        .route("/map/points", get(handlers::map::list_map_points))
}

/// Serve the local backend's signed URLs under the path of `LOCAL_STORAGE_BASE_URL`.
///
/// These routes carry object bytes, so they sit outside the JSON body limit and
/// take the largest per-type upload size instead.
#[cfg(feature = "storage-local")]
pub fn mount_local_media(
    app: Router<()>,
    config: &Config,
    storage: Arc<LocalStorage>,
) -> Result<Router<()>, anyhow::Error> {
    let base_url = config
        .local_storage_base_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("LOCAL_STORAGE_BASE_URL not configured"))?;
    let path = handlers::media::mount_path(base_url);
    let max_object_bytes = config
        .max_image_size_bytes
        .max(config.max_video_size_bytes);

    let media = Router::new()
        .route(
            "/{*key}",
            get(handlers::media::get_object).put(handlers::media::put_object),
        )
        .layer(RequestBodyLimitLayer::new(
            usize::try_from(max_object_bytes).unwrap_or(usize::MAX),
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(setup_cors(config, &[Method::GET, Method::PUT, Method::OPTIONS])?)
        .layer(TraceLayer::new_for_http())
        .with_state(storage);

    tracing::info!(path = %path, "Serving local storage signed URLs");

    Ok(if path == "/" {
        app.merge(media)
    } else {
        app.nest(&path, media)
    })
}

fn setup_cors(config: &Config, methods: &[Method]) -> Result<CorsLayer, anyhow::Error> {
    let headers = [
        axum::http::header::AUTHORIZATION,
        axum::http::header::CONTENT_TYPE,
        HeaderName::from_static(SHARE_TOKEN_HEADER),
        HeaderName::from_static(SHARE_KEY_HEADER),
    ];

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods.to_vec())
            .allow_headers(headers)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods.to_vec())
            .allow_headers(headers)
    };
    Ok(cors)
}
