//! OpenAPI documentation.
//!
//! Served at `/openapi.json` and rendered by RapiDoc at `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;

/// Returns the OpenAPI document of the relay routes.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Yanktube Relay API",
        version = "0.1.0",
        description = "Validates download requests, forwards them to the processing backend and relays its answers. Single items are streamed, playlists arrive as zip archives."
    ),
    paths(
        handlers::metadata::get_metadata,
        handlers::download::download_video,
        handlers::download::download_audio,
        handlers::download::download_collection_video,
        handlers::download::download_collection_audio,
    ),
    components(
        schemas(
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "metadata", description = "Video and playlist information"),
        (name = "downloads", description = "Single-item and playlist downloads")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_relay_route_is_documented() {
        let spec = get_openapi_spec();
        for kind in yanktube_core::OperationKind::ALL {
            assert!(
                spec.paths.paths.contains_key(kind.route()),
                "{} missing from OpenAPI",
                kind.route()
            );
        }
    }
}
