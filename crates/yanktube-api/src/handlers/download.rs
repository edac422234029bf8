//! Download routes. Single items are streamed, collections are buffered archives.

use crate::error::{ErrorResponse, HttpAppError, ValidatedQuery};
use crate::middleware::RequestId;
use crate::state::AppState;
use axum::{extract::State, response::Response};
use std::sync::Arc;
use yanktube_core::{DownloadQuery, OperationKind};

use super::relay::relay;

#[utoipa::path(
    get,
    path = "/download/video",
    tag = "downloads",
    params(DownloadQuery),
    responses(
        (status = 200, description = "Video file, streamed in chunks", content_type = "video/mp4"),
        (status = 422, description = "Missing or invalid url or quality", body = ErrorResponse),
        (status = 502, description = "Processing backend unreachable", body = ErrorResponse),
        (status = 504, description = "Processing backend timed out", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query, request_id), fields(operation = "download_video", request_id = %request_id))]
pub async fn download_video(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    ValidatedQuery(query): ValidatedQuery<DownloadQuery>,
) -> Result<Response, HttpAppError> {
    relay(&state, OperationKind::SingleVideo, query, request_id).await
}

#[utoipa::path(
    get,
    path = "/download/audio",
    tag = "downloads",
    params(DownloadQuery),
    responses(
        (status = 200, description = "Audio file, streamed in chunks", content_type = "audio/mpeg"),
        (status = 422, description = "Missing or invalid url", body = ErrorResponse),
        (status = 502, description = "Processing backend unreachable", body = ErrorResponse),
        (status = 504, description = "Processing backend timed out", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query, request_id), fields(operation = "download_audio", request_id = %request_id))]
pub async fn download_audio(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    ValidatedQuery(query): ValidatedQuery<DownloadQuery>,
) -> Result<Response, HttpAppError> {
    relay(&state, OperationKind::SingleAudio, query, request_id).await
}

#[utoipa::path(
    get,
    path = "/download/collection/video",
    tag = "downloads",
    params(DownloadQuery),
    responses(
        (status = 200, description = "Zip archive with every video of the playlist", content_type = "application/zip"),
        (status = 422, description = "Missing or invalid url or quality", body = ErrorResponse),
        (status = 502, description = "Processing backend unreachable", body = ErrorResponse),
        (status = 504, description = "Processing backend timed out", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, query, request_id),
    fields(operation = "download_collection_video", request_id = %request_id)
)]
pub async fn download_collection_video(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    ValidatedQuery(query): ValidatedQuery<DownloadQuery>,
) -> Result<Response, HttpAppError> {
    relay(&state, OperationKind::CollectionVideo, query, request_id).await
}

#[utoipa::path(
    get,
    path = "/download/collection/audio",
    tag = "downloads",
    params(DownloadQuery),
    responses(
        (status = 200, description = "Zip archive with the audio of every playlist entry", content_type = "application/zip"),
        (status = 422, description = "Missing or invalid url", body = ErrorResponse),
        (status = 502, description = "Processing backend unreachable", body = ErrorResponse),
        (status = 504, description = "Processing backend timed out", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, query, request_id),
    fields(operation = "download_collection_audio", request_id = %request_id)
)]
pub async fn download_collection_audio(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    ValidatedQuery(query): ValidatedQuery<DownloadQuery>,
) -> Result<Response, HttpAppError> {
    relay(&state, OperationKind::CollectionAudio, query, request_id).await
}
