//! HTTP client for the Yanktube processing backend.
//!
//! One [`UpstreamClient`] is built at startup from [`UpstreamConfig`] and shared by every
//! relay operation. Each call picks its route and timeout tier from the operation table and
//! returns a typed [`UpstreamOutcome`]; transport problems never surface as panics or
//! untyped errors.

mod outcome;

pub use outcome::{
    ByteStream, ResponseMetadata, UpstreamBody, UpstreamError, UpstreamOutcome,
    UpstreamResponse,
};

use anyhow::{Context, Result};
use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use reqwest::Client;
use serde_json::Value;
use std::io;
use std::time::Duration;
use yanktube_core::{DownloadRequest, OperationKind, TransferMode, UpstreamConfig};

/// Header used to correlate one relay operation across the relay and the backend.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Most of a failed upstream response that is kept as error detail.
const ERROR_BODY_LIMIT: usize = 64 * 1024;

/// Error detail used when a failed upstream response has no readable body.
pub const UNREADABLE_ERROR_BODY: &str = "Upstream error response could not be read";

#[derive(Clone, Debug)]
pub struct UpstreamClient {
    client: Client,
    config: UpstreamConfig,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        if !config.verify_tls {
            tracing::warn!(
                base_url = %config.base_url,
                "TLS certificate verification towards the processing backend is disabled"
            );
        }

        // Per-request timeouts are applied per operation tier in `fetch`.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .user_agent(concat!("yanktube-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = config.base_url.as_str().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Absolute upstream URL for an operation. Keeps any path prefix of the base URL.
    pub fn build_url(&self, operation: OperationKind) -> String {
        format!("{}{}", self.base_url, operation.upstream_path())
    }

    pub fn timeout_for(&self, operation: OperationKind) -> Duration {
        self.config.timeout_for(operation.tier())
    }

    fn query_pairs(request: &DownloadRequest) -> Vec<(&'static str, String)> {
        let mut query = vec![("url", request.resource_url().as_str().to_string())];
        if let Some(quality) = request.quality() {
            query.push(("quality", quality.as_str().to_string()));
        }
        query
    }

    /// Calls the backend for one relay operation.
    ///
    /// Metadata is decoded as JSON and collections are read in full, both within the tier's
    /// timeout. Single items return as soon as headers arrive, which must happen within the
    /// tier's timeout; their body has no total deadline, but each read may wait at most that
    /// long for the next bytes.
    pub async fn fetch(
        &self,
        request: &DownloadRequest,
        request_id: Option<&str>,
    ) -> UpstreamOutcome {
        let operation = request.operation();
        let timeout = self.timeout_for(operation);
        let url = self.build_url(operation);
        let streamed = operation.transfer() == TransferMode::Streamed;

        let mut builder = self.client.get(&url).query(&Self::query_pairs(request));
        if !streamed {
            builder = builder.timeout(timeout);
        }
        if let Some(request_id) = request_id {
            builder = builder.header(REQUEST_ID_HEADER, request_id);
        }

        tracing::debug!(
            operation = %operation,
            upstream_url = %url,
            timeout_secs = timeout.as_secs(),
            "Calling processing backend"
        );

        let response = tokio::time::timeout(timeout, builder.send())
            .await
            .map_err(|_| UpstreamError::Timeout { operation, timeout })?
            .map_err(|e| UpstreamError::from_reqwest(operation, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = match tokio::time::timeout(timeout, read_error_body(response)).await {
                Ok(Ok(body)) => outcome::error_detail(&body),
                Ok(Err(e)) => {
                    tracing::warn!(
                        operation = %operation,
                        status = status.as_u16(),
                        error = %outcome::error_chain(&e),
                        "Failed to read upstream error body"
                    );
                    Value::String(UNREADABLE_ERROR_BODY.to_string())
                }
                Err(_) => {
                    tracing::warn!(
                        operation = %operation,
                        status = status.as_u16(),
                        timeout_secs = timeout.as_secs(),
                        "Timed out reading upstream error body"
                    );
                    Value::String(UNREADABLE_ERROR_BODY.to_string())
                }
            };
            return Err(UpstreamError::Status {
                operation,
                status,
                detail,
            });
        }

        let metadata = ResponseMetadata::from_headers(response.headers());

        let body = match operation.transfer() {
            TransferMode::Json => UpstreamBody::Json(
                response
                    .json()
                    .await
                    .map_err(|e| UpstreamError::from_reqwest(operation, timeout, e))?,
            ),
            TransferMode::Buffered => UpstreamBody::Buffered(
                response
                    .bytes()
                    .await
                    .map_err(|e| UpstreamError::from_reqwest(operation, timeout, e))?,
            ),
            TransferMode::Streamed => {
                UpstreamBody::Stream(idle_guarded(response.bytes_stream(), timeout))
            }
        };

        Ok(UpstreamResponse {
            operation,
            status,
            metadata,
            body,
        })
    }

    /// Reachability check for readiness probes. Any HTTP answer counts as reachable.
    pub async fn probe(&self, timeout: Duration) -> Result<(), UpstreamError> {
        self.client
            .get(&self.base_url)
            .timeout(timeout)
            .send()
            .await
            .map(drop)
            .map_err(|e| UpstreamError::from_reqwest(OperationKind::Metadata, timeout, e))
    }
}

/// Reads at most [`ERROR_BODY_LIMIT`] bytes of a failed response.
async fn read_error_body(mut response: reqwest::Response) -> Result<String, reqwest::Error> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = ERROR_BODY_LIMIT - body.len();
        body.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if body.len() >= ERROR_BODY_LIMIT {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Maps a streamed body to io errors and fails it once no bytes arrived for `idle`.
///
/// The stream ends after the first error.
fn idle_guarded<S>(body: S, idle: Duration) -> ByteStream
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
    stream::unfold(Some(Box::pin(body)), move |state| async move {
        let mut body = state?;
        match tokio::time::timeout(idle, body.next()).await {
            Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(body))),
            Ok(Some(Err(e))) => {
                let kind = if e.is_timeout() {
                    io::ErrorKind::TimedOut
                } else {
                    io::ErrorKind::Other
                };
                Some((Err(io::Error::new(kind, outcome::error_chain(&e))), None))
            }
            Ok(None) => None,
            Err(_) => Some((
                Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no data from upstream for {}s", idle.as_secs_f32()),
                )),
                None,
            )),
        }
    })
    .boxed()
}
