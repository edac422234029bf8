//! Data models for relay operations
//!
//! `operation` holds the closed set of relay operations and the table that drives them,
//! `quality` the video quality selector, `request` the validated input of one operation.

mod operation;
mod quality;
mod request;

pub use operation::{OperationKind, OperationProfile, TimeoutTier, TransferMode};
pub use quality::{Quality, UnknownQuality};
pub use request::{DownloadQuery, DownloadRequest, FieldErrors};
