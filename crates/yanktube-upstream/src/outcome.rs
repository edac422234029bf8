//! Result of one call to the processing backend.
//!
//! A call never escapes as an untyped fault: it is either an [`UpstreamResponse`] or an
//! [`UpstreamError`] that knows its status code and the operation it belongs to.

use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE,
};
use reqwest::StatusCode;
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::time::Duration;
use yanktube_core::{AppError, OperationKind};

/// Lazily-read upstream body. Dropping it closes the upstream connection.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

pub type UpstreamOutcome = Result<UpstreamResponse, UpstreamError>;

/// The subset of upstream response headers the relay forwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
    pub content_type: Option<HeaderValue>,
    /// Kept as the raw header value so it reaches the client byte for byte
    pub content_disposition: Option<HeaderValue>,
    pub content_length: Option<u64>,
}

impl ResponseMetadata {
    /// Empty header values are treated the same as missing ones.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let non_empty = |name: HeaderName| {
            headers
                .get(name)
                .filter(|v: &&HeaderValue| !v.as_bytes().iter().all(u8::is_ascii_whitespace))
                .cloned()
        };

        Self {
            content_type: non_empty(CONTENT_TYPE),
            content_disposition: non_empty(CONTENT_DISPOSITION),
            content_length: headers
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok()),
        }
    }
}

pub enum UpstreamBody {
    /// Metadata document
    Json(Value),
    /// Complete archive, read before anything is sent to the client
    Buffered(Bytes),
    /// Media payload still being produced by the backend
    Stream(ByteStream),
}

impl fmt::Debug for UpstreamBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamBody::Json(value) => f.debug_tuple("Json").field(value).finish(),
            UpstreamBody::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            UpstreamBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

#[derive(Debug)]
pub struct UpstreamResponse {
    pub operation: OperationKind,
    pub status: StatusCode,
    pub metadata: ResponseMetadata,
    pub body: UpstreamBody,
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream returned {status} for {operation}")]
    Status {
        operation: OperationKind,
        status: StatusCode,
        detail: Value,
    },

    #[error("upstream did not complete {operation} within {}s", timeout.as_secs())]
    Timeout {
        operation: OperationKind,
        timeout: Duration,
    },

    #[error("could not reach upstream for {operation}")]
    Transport {
        operation: OperationKind,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream response for {operation} could not be decoded")]
    Decode {
        operation: OperationKind,
        #[source]
        source: reqwest::Error,
    },
}

impl UpstreamError {
    /// Classifies a reqwest failure by kind. Timeouts win over every other classification.
    pub(crate) fn from_reqwest(
        operation: OperationKind,
        timeout: Duration,
        err: reqwest::Error,
    ) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout { operation, timeout }
        } else if err.is_decode() {
            UpstreamError::Decode {
                operation,
                source: err,
            }
        } else {
            UpstreamError::Transport {
                operation,
                source: err,
            }
        }
    }

    pub fn operation(&self) -> OperationKind {
        match self {
            UpstreamError::Status { operation, .. }
            | UpstreamError::Timeout { operation, .. }
            | UpstreamError::Transport { operation, .. }
            | UpstreamError::Decode { operation, .. } => *operation,
        }
    }

    /// Upstream status verbatim, or a synthesized gateway status for transport failures.
    pub fn status_code(&self) -> StatusCode {
        match self {
            UpstreamError::Status { status, .. } => *status,
            UpstreamError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            UpstreamError::Transport { .. } | UpstreamError::Decode { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Timeout { .. })
    }
}

/// Full cause chain of an error on one line, for logs only.
pub(crate) fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Status {
                operation,
                status,
                detail,
            } => AppError::Upstream {
                operation,
                status: status.as_u16(),
                detail,
            },
            UpstreamError::Timeout { operation, timeout } => AppError::UpstreamTimeout {
                operation,
                timeout_secs: timeout.as_secs(),
            },
            UpstreamError::Transport { operation, source } => AppError::UpstreamUnavailable {
                operation,
                message: error_chain(&source),
            },
            UpstreamError::Decode { operation, source } => AppError::UpstreamBadResponse {
                operation,
                message: error_chain(&source),
            },
        }
    }
}

/// Error detail of a failed upstream response: the JSON `detail` field when present,
/// otherwise the whole JSON document, otherwise the raw text.
pub(crate) fn error_detail(body: &str) -> Value {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(mut map)) => match map.remove("detail") {
            Some(detail) => detail,
            None => Value::Object(map),
        },
        Ok(other) => other,
        Err(_) => Value::String(body.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_detail_prefers_detail_field() {
        assert_eq!(error_detail(r#"{"detail":"rate limited"}"#), json!("rate limited"));
    }

    #[test]
    fn test_error_detail_keeps_structured_detail() {
        assert_eq!(
            error_detail(r#"{"detail":[{"loc":["query","url"],"msg":"field required"}]}"#),
            json!([{"loc": ["query", "url"], "msg": "field required"}])
        );
    }

    #[test]
    fn test_error_detail_falls_back_to_json_then_text() {
        assert_eq!(error_detail(r#"{"message":"nope"}"#), json!({"message": "nope"}));
        assert_eq!(
            error_detail("Internal Server Error"),
            json!("Internal Server Error")
        );
        assert_eq!(error_detail(""), json!(""));
    }

    #[test]
    fn test_metadata_treats_blank_values_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("video/mp4"));
        headers.insert(CONTENT_DISPOSITION, HeaderValue::from_static(""));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("1024"));
        let metadata = ResponseMetadata::from_headers(&headers);
        assert_eq!(
            metadata.content_type,
            Some(HeaderValue::from_static("video/mp4"))
        );
        assert_eq!(metadata.content_disposition, None);
        assert_eq!(metadata.content_length, Some(1024));
    }

    #[test]
    fn test_metadata_ignores_unparseable_length() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("lots"));
        assert_eq!(ResponseMetadata::from_headers(&headers).content_length, None);
    }

    #[test]
    fn test_status_codes() {
        let err = UpstreamError::Status {
            operation: OperationKind::SingleVideo,
            status: StatusCode::TOO_MANY_REQUESTS,
            detail: json!("slow down"),
        };
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);

        let err = UpstreamError::Timeout {
            operation: OperationKind::CollectionVideo,
            timeout: Duration::from_secs(600),
        };
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert!(err.is_timeout());
        assert!(matches!(
            AppError::from(err),
            AppError::UpstreamTimeout {
                timeout_secs: 600,
                ..
            }
        ));
    }
}
