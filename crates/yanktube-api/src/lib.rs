//! Yanktube API Library
//!
//! This crate provides the relay handlers, middleware, and application setup.

mod api_doc;
mod handlers;
mod middleware;
pub mod relay;
pub mod setup;
mod telemetry;

pub mod error;
pub mod state;

pub use error::ErrorResponse;
pub use middleware::RequestId;
pub use relay::RELAY_CHUNK_SIZE;
