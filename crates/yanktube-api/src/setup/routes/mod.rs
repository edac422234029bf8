//! Route configuration and setup.
//!
//! Relay routes come from the operation table; health checks live in [health](health).

mod health;

use crate::handlers;
use crate::middleware::{
    request_id_middleware, security_headers_middleware, SecurityHeadersConfig,
};
use crate::state::AppState;
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use yanktube_core::{Config, OperationKind};

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let security_headers_config = Arc::new(SecurityHeadersConfig::new(config.is_production()));

    tracing::info!(
        http_concurrency_limit = config.http_concurrency_limit(),
        "Relay operations limited until their body is done"
    );

    let app = relay_routes()
        .merge(operational_routes())
        .merge(utoipa_rapidoc::RapiDoc::new("/openapi.json").path("/docs"))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn_with_state(
            security_headers_config,
            security_headers_middleware,
        ))
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    // Browser clients read the filename and size of downloads.
    let exposed = [
        header::CONTENT_DISPOSITION,
        header::CONTENT_LENGTH,
        HeaderName::from_static("x-request-id"),
    ];

    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new().allow_origin(origins)
    };

    Ok(cors
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([HeaderName::from_static("x-request-id")])
        .expose_headers(exposed))
}

fn relay_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            OperationKind::Metadata.route(),
            get(handlers::metadata::get_metadata),
        )
        .route(
            OperationKind::SingleVideo.route(),
            get(handlers::download::download_video),
        )
        .route(
            OperationKind::SingleAudio.route(),
            get(handlers::download::download_audio),
        )
        .route(
            OperationKind::CollectionVideo.route(),
            get(handlers::download::download_collection_video),
        )
        .route(
            OperationKind::CollectionAudio.route(),
            get(handlers::download::download_collection_audio),
        )
}

fn operational_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::liveness_check))
        .route("/ready", get(health::readiness_check))
        .route(
            "/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
}
