//! Yanktube Core Library
//!
//! This crate provides the operation table, request validation, configuration and error
//! types shared by the upstream client and the HTTP relay.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{BaseConfig, Config, UpstreamConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    DownloadQuery, DownloadRequest, FieldErrors, OperationKind, OperationProfile, Quality,
    TimeoutTier, TransferMode,
};
