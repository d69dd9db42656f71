//! Signed object transfer for the local filesystem backend.
//!
//! With S3 the client talks to the bucket directly. With local storage the signed URLs
//! point back at this service, which checks the HMAC, expiry and bound content type
//! before streaming bytes to or from disk.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use folio_core::{AppError, DecisionReason};
use folio_storage::{LocalStorage, StorageError};
use futures::TryStreamExt;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::error::HttpAppError;

/// Query string of a signed local URL. `method` and `content_type` are informative;
/// the handler signs what the request actually is.
#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub signature: String,
}

fn rejection(err: StorageError) -> HttpAppError {
    match err {
        StorageError::SignatureExpired => AppError::AccessDenied(DecisionReason::Expired).into(),
        StorageError::SignatureInvalid(_) | StorageError::InvalidKey(_) => {
            AppError::AccessDenied(DecisionReason::Forbidden).into()
        }
        StorageError::NotFound(key) => AppError::NotFound(key).into(),
        other => AppError::from(other).into(),
    }
}

/// Path segment the signed URLs are served under, taken from the configured base URL
/// (`http://host:3000/media` gives `/media`).
pub fn mount_path(base_url: &str) -> String {
    let without_scheme = base_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(base_url);
    let path = without_scheme
        .find('/')
        .map(|i| &without_scheme[i..])
        .unwrap_or("/")
        .trim_end_matches('/');
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

#[tracing::instrument(skip(storage, query, headers, body), fields(key = %key))]
pub async fn put_object(
    State(storage): State<Arc<LocalStorage>>,
    Path(key): Path<String>,
    Query(query): Query<SignedQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<StatusCode, HttpAppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    storage
        .verify_signed(
            "PUT",
            &key,
            Some(content_type),
            query.expires,
            &query.signature,
        )
        .map_err(rejection)?;

    let reader = StreamReader::new(body.into_data_stream().map_err(std::io::Error::other));
    let size = storage
        .write_stream(&key, content_type, reader)
        .await
        .map_err(rejection)?;

    tracing::debug!(size_bytes = size, "Object stored");
    Ok(StatusCode::OK)
}

#[tracing::instrument(skip(storage, query), fields(key = %key))]
pub async fn get_object(
    State(storage): State<Arc<LocalStorage>>,
    Path(key): Path<String>,
    Query(query): Query<SignedQuery>,
) -> Result<Response, HttpAppError> {
    storage
        .verify_signed("GET", &key, None, query.expires, &query.signature)
        .map_err(rejection)?;

    let object = storage.open(&key).await.map_err(rejection)?;
    let content_type = object
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, object.size.to_string()),
        ],
        Body::from_stream(ReaderStream::new(object.file)),
    )
        .into_response())
}
