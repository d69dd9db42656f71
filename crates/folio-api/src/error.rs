//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`; anything that converts into
//! `AppError` turns into an `HttpAppError` through `?` and renders with the status and
//! machine code from [`ErrorMetadata`].

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use folio_core::{AppError, ErrorMetadata, LogLevel};
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Machine-readable error code (e.g. `invalid-pin`, `file-size-mismatch`)
    pub code: String,
    /// Whether retrying the same request can succeed
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper so `IntoResponse` can be implemented for the core error type.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// JSON body extractor that answers malformed bodies with our `ErrorResponse` shape.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(error = %error, code, "Request failed"),
        LogLevel::Warn => tracing::warn!(error = %error, code, "Request failed"),
        LogLevel::Error => tracing::error!(error = %error, code, "Request failed"),
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .map(|env| matches!(env.to_lowercase().as_str(), "production" | "prod"))
        .unwrap_or(false)
}

impl HttpAppError {
    fn render(&self, hide_details: bool) -> (StatusCode, ErrorResponse) {
        let error = &self.0;
        let status = StatusCode::from_u16(error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let details = if hide_details || error.is_sensitive() {
            None
        } else {
            Some(error.detailed_message())
        };

        (
            status,
            ErrorResponse {
                error: error.client_message(),
                details,
                code: error.error_code().to_string(),
                recoverable: error.is_recoverable(),
                suggested_action: error.suggested_action().map(String::from),
            },
        )
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        log_error(&self.0);
        let (status, body) = self.render(is_production_env());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::DecisionReason;
    use uuid::Uuid;

    #[test]
    fn test_access_denials_map_to_auth_statuses() {
        let (status, body) =
            HttpAppError(AppError::AccessDenied(DecisionReason::InvalidPin)).render(false);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.code, "invalid-pin");

        let (status, body) =
            HttpAppError(AppError::AccessDenied(DecisionReason::Forbidden)).render(false);
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.code, "forbidden");
    }

    #[test]
    fn test_integrity_errors_hide_details() {
        let (status, body) = HttpAppError(AppError::IntegrityCheckFailed {
            expected: "a".repeat(32),
            actual: "b".repeat(32),
        })
        .render(false);

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.code, "file-integrity-check-failed");
        assert!(body.details.is_none());
    }

    #[test]
    fn test_production_hides_details() {
        let error = HttpAppError(AppError::VerificationNotFound(Uuid::new_v4()));

        let (status, body) = error.render(false);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "verification-not-found");
        assert!(body.details.is_some());

        let (_, body) = error.render(true);
        assert!(body.details.is_none());
    }
}
