use crate::error::{ErrorResponse, HttpAppError, ValidatedQuery};
use crate::middleware::RequestId;
use crate::state::AppState;
use axum::{extract::State, response::Response};
use std::sync::Arc;
use yanktube_core::{DownloadQuery, OperationKind};

use super::relay::relay;

/// Look up a video or playlist without downloading it.
#[utoipa::path(
    get,
    path = "/metadata",
    tag = "metadata",
    params(DownloadQuery),
    responses(
        (status = 200, description = "Metadata document as returned by the processing backend", body = serde_json::Value),
        (status = 422, description = "Invalid parameters", body = ErrorResponse),
        (status = 502, description = "Processing backend unreachable", body = ErrorResponse),
        (status = 504, description = "Processing backend timed out", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query, request_id), fields(operation = "metadata", request_id = %request_id))]
pub async fn get_metadata(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    ValidatedQuery(query): ValidatedQuery<DownloadQuery>,
) -> Result<Response, HttpAppError> {
    relay(&state, OperationKind::Metadata, query, request_id).await
}
