use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderValue};
use axum::{extract::Request, middleware::Next, response::Response};
use std::convert::Infallible;
use std::fmt;
use uuid::Uuid;
use yanktube_upstream::REQUEST_ID_HEADER;

/// Correlation id of one relay operation, also forwarded to the processing backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn incoming_request_id(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(String::from)
}

/// Request ID middleware
/// Reuses the caller's X-Request-ID when it is usable, otherwise generates one, and exposes
/// it to handlers (request extensions) and to the caller (response header).
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id =
        incoming_request_id(request.headers()).unwrap_or_else(|| Uuid::new_v4().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER, header_value);
    }

    response
}

/// Never rejects: falls back to the incoming header, then to a fresh id, when the
/// middleware did not run (e.g. a router built without it).
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<RequestId>() {
            return Ok(id.clone());
        }
        Ok(RequestId(
            incoming_request_id(&parts.headers).unwrap_or_else(|| Uuid::new_v4().to_string()),
        ))
    }
}
