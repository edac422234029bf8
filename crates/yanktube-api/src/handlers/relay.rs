//! The relay path shared by all five operations.

use crate::error::HttpAppError;
use crate::middleware::RequestId;
use crate::relay::{translate_headers, RelayStream};
use crate::state::AppState;
use axum::{
    body::Body,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use yanktube_core::{AppError, DownloadQuery, DownloadRequest, OperationKind};
use yanktube_upstream::UpstreamBody;

/// Validate, call the backend, then hand back either the translated response or the
/// error envelope. Nothing is sent to the client before the upstream answered.
///
/// Valid requests wait for a relay slot first. Streamed downloads keep their slot until the
/// body is done; every other outcome frees it when this returns.
pub(crate) async fn relay(
    state: &AppState,
    operation: OperationKind,
    query: DownloadQuery,
    request_id: RequestId,
) -> Result<Response, HttpAppError> {
    let request = DownloadRequest::from_query(operation, query)?;

    tracing::info!(
        resource_url = %request.resource_url(),
        quality = request.quality().map(|q| q.as_str()).unwrap_or("-"),
        "Relaying to processing backend"
    );

    let permit = state.admit_relay().await?;

    let upstream = state
        .upstream
        .fetch(&request, Some(request_id.as_str()))
        .await?;

    tracing::debug!(
        status = upstream.status.as_u16(),
        content_length = ?upstream.metadata.content_length,
        "Processing backend answered"
    );

    let headers = translate_headers(operation, &upstream.metadata);

    let body = match upstream.body {
        UpstreamBody::Json(document) => return Ok(Json(document).into_response()),
        UpstreamBody::Buffered(archive) => Body::from(archive),
        UpstreamBody::Stream(stream) => Body::from_stream(
            RelayStream::new(stream, operation, Some(request_id.0)).holding(permit),
        ),
    };

    build_response(headers, body)
}

fn build_response(headers: HeaderMap, body: Body) -> Result<Response, HttpAppError> {
    let mut builder = Response::builder().status(StatusCode::OK);
    if let Some(response_headers) = builder.headers_mut() {
        response_headers.extend(headers);
    }

    builder
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::time::Duration;
    use url::Url;
    use yanktube_core::{BaseConfig, Config, UpstreamConfig};

    fn state_for(upstream_url: &str, limit: usize) -> AppState {
        AppState::new(Config {
            base: BaseConfig {
                server_port: 8000,
                cors_origins: vec![],
                environment: "test".to_string(),
                http_concurrency_limit: limit,
            },
            upstream: UpstreamConfig::new(Url::parse(upstream_url).unwrap()),
        })
        .unwrap()
    }

    fn query(url: Option<&str>) -> DownloadQuery {
        DownloadQuery {
            url: url.map(String::from),
            quality: None,
        }
    }

    fn request_id() -> RequestId {
        RequestId("req-slot".to_string())
    }

    #[tokio::test]
    async fn test_streaming_download_keeps_its_slot_until_the_body_is_gone() {
        let mut upstream = mockito::Server::new_async().await;
        upstream
            .mock("GET", "/download/video")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "video/mp4")
            .with_body(vec![3u8; 32 * 1024])
            .create_async()
            .await;
        let state = state_for(&upstream.url(), 1);

        let first = relay(
            &state,
            OperationKind::SingleVideo,
            query(Some("https://example.com/v")),
            request_id(),
        )
        .await
        .unwrap();
        assert_eq!(state.available_relays(), 0);

        let second = tokio::time::timeout(
            Duration::from_millis(200),
            relay(
                &state,
                OperationKind::SingleVideo,
                query(Some("https://example.com/v")),
                request_id(),
            ),
        )
        .await;
        assert!(second.is_err(), "second download admitted while the first streams");

        let body = axum::body::to_bytes(first.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body.len(), 32 * 1024);
        assert_eq!(state.available_relays(), 1);
    }

    #[tokio::test]
    async fn test_slot_is_freed_when_relay_fails() {
        let mut upstream = mockito::Server::new_async().await;
        upstream
            .mock("GET", "/download/audio")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body(r#"{"detail":"busy"}"#)
            .create_async()
            .await;
        let state = state_for(&upstream.url(), 1);

        let result = relay(
            &state,
            OperationKind::SingleAudio,
            query(Some("https://example.com/v")),
            request_id(),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(state.available_relays(), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_does_not_wait_for_a_slot() {
        let state = state_for("http://127.0.0.1:9", 1);
        let _held = state.admit_relay().await.unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            relay(&state, OperationKind::Metadata, query(None), request_id()),
        )
        .await
        .expect("validation should not queue behind busy slots");
        assert!(result.is_err());
    }
}
