//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod routes;
pub mod server;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use yanktube_core::Config;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.environment())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        upstream = %config.upstream().base_url,
        verify_tls = config.upstream().verify_tls,
        "Configuration loaded and validated successfully"
    );

    let state = Arc::new(AppState::new(config.clone()).context("Failed to create upstream client")?);

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
