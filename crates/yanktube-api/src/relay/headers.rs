//! Outbound headers for a successful relay operation.

use axum::http::{
    header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, PRAGMA},
    HeaderMap, HeaderValue,
};
use yanktube_core::OperationKind;
use yanktube_upstream::ResponseMetadata;

const NO_STORE: &str = "no-store, no-cache";
const NO_CACHE: &str = "no-cache";

/// Builds the exact header set for a download response.
///
/// Upstream values win and are copied byte for byte. Missing values fall back to the
/// operation's defaults, except `Content-Length`, which is only ever forwarded. Metadata
/// responses get no content headers here; the JSON body sets its own type.
pub fn translate_headers(operation: OperationKind, metadata: &ResponseMetadata) -> HeaderMap {
    let profile = operation.profile();
    let mut headers = HeaderMap::new();

    if !operation.is_download() {
        return headers;
    }

    let content_type = metadata
        .content_type
        .clone()
        .or_else(|| profile.default_content_type.map(HeaderValue::from_static));
    if let Some(value) = content_type {
        headers.insert(CONTENT_TYPE, value);
    }

    let disposition = metadata
        .content_disposition
        .clone()
        .or_else(|| profile.default_disposition.map(HeaderValue::from_static));
    if let Some(value) = disposition {
        headers.insert(CONTENT_DISPOSITION, value);
    }

    if let Some(length) = metadata.content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }

    headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    headers.insert(PRAGMA, HeaderValue::from_static(NO_CACHE));

    headers
}
