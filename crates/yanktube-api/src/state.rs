//! Application state shared by every request.
//!
//! Built once at startup: the validated configuration, the pooled upstream client and the
//! admission gate for relay operations.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use yanktube_core::{AppError, Config};
use yanktube_upstream::UpstreamClient;

pub struct AppState {
    pub config: Config,
    pub upstream: UpstreamClient,
    relays: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let upstream = UpstreamClient::new(config.upstream().clone())?;
        let relays = Arc::new(Semaphore::new(config.http_concurrency_limit().max(1)));
        Ok(Self {
            config,
            upstream,
            relays,
        })
    }

    /// Waits for a relay slot. The slot is held until the returned permit is dropped, which
    /// for streamed downloads is when the body finished or the client went away.
    pub async fn admit_relay(&self) -> Result<OwnedSemaphorePermit, AppError> {
        self.relays
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::Internal(format!("Relay admission closed: {}", e)))
    }

    /// Relay slots currently free.
    pub fn available_relays(&self) -> usize {
        self.relays.available_permits()
    }
}
