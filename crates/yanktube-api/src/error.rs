//! HTTP error response conversion
//!
//! This module renders `AppError` as the relay's JSON error envelope.
//!
//! **Handler pattern:** Return `Result<Response, HttpAppError>` and convert domain errors
//! with `?` or `.map_err(Into::into)` so every failure renders the same way (status, body,
//! logging).

use axum::{
    extract::rejection::QueryRejection,
    extract::{FromRequestParts, Query},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use yanktube_core::{AppError, ErrorMetadata, FieldErrors, LogLevel};
use yanktube_upstream::UpstreamError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Short, operation-specific summary (e.g. "Failed to download video")
    pub error: String,
    /// Field errors for validation failures, the upstream detail for upstream failures,
    /// a generic sentence otherwise
    #[schema(value_type = Object)]
    pub details: Value,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    /// Suggested action for the client (e.g., "Retry after a short delay")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    pub fn from_app_error(err: &AppError) -> Self {
        Self {
            error: err.client_message(),
            details: err.client_details(),
            code: err.error_code().to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action().map(String::from),
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from yanktube-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<FieldErrors> for HttpAppError {
    fn from(errors: FieldErrors) -> Self {
        HttpAppError(AppError::Validation(errors))
    }
}

impl From<UpstreamError> for HttpAppError {
    fn from(err: UpstreamError) -> Self {
        HttpAppError(AppError::from(err))
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

/// A query string that cannot be decoded at all becomes a 422 on the `query` field.
impl From<QueryRejection> for HttpAppError {
    fn from(rejection: QueryRejection) -> Self {
        HttpAppError(AppError::Validation(FieldErrors::single(
            "query",
            format!("The query string is invalid: {}", rejection.body_text()),
        )))
    }
}

/// Query extractor that renders decoding failures in the relay's error envelope.
/// Use this instead of `Query<T>` on relay routes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(inner) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedQuery(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    let operation = error.operation().map(|op| op.name()).unwrap_or("none");
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type, operation, "Request rejected");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type, operation, "Upstream reported a failure");
        }
        LogLevel::Error => {
            tracing::error!(
                error = %error.detailed_message(),
                error_type,
                operation,
                "Relay operation failed"
            );
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        (status, Json(ErrorResponse::from_app_error(app_error))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::json;
    use yanktube_core::OperationKind;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = HttpAppError(err).into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_validation_envelope() {
        let (status, body) = render(AppError::Validation(FieldErrors::single(
            "url",
            "The url field is required.",
        )))
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Invalid parameters");
        assert_eq!(body["details"], json!({ "url": ["The url field is required."] }));
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["recoverable"], false);
    }

    #[tokio::test]
    async fn test_upstream_status_is_mirrored() {
        let (status, body) = render(AppError::Upstream {
            operation: OperationKind::CollectionVideo,
            status: 503,
            detail: json!("rate limited"),
        })
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Failed to download playlist videos");
        assert_eq!(body["details"], "rate limited");
    }

    #[tokio::test]
    async fn test_out_of_range_upstream_status_falls_back_to_500() {
        let (status, _) = render(AppError::Upstream {
            operation: OperationKind::Metadata,
            status: 1000,
            detail: json!("odd"),
        })
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_internal_error_is_generic() {
        let (status, body) =
            render(AppError::from(anyhow::anyhow!("invalid header value at byte 3"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Download failed");
        assert!(!body.to_string().contains("byte 3"));
        assert!(body.get("suggested_action").is_some());
    }
}
