//! Error types module
//!
//! All failures of a relay operation are unified under `AppError`. Each variant knows how it
//! is presented to the client through [`ErrorMetadata`]; the HTTP layer only renders it.

use crate::models::{FieldErrors, OperationKind};
use serde_json::Value;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for failures reported by the upstream backend
    Warn,
    /// Error level - for transport and unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "UPSTREAM_TIMEOUT")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// `error` field of the envelope
    fn client_message(&self) -> String;

    /// `details` field of the envelope. Never carries internal diagnostics.
    fn client_details(&self) -> Value;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid parameters: {0}")]
    Validation(FieldErrors),

    /// The backend answered with a non-success status
    #[error("Upstream returned status {status} for {operation}")]
    Upstream {
        operation: OperationKind,
        status: u16,
        detail: Value,
    },

    #[error("Upstream did not complete {operation} within {timeout_secs}s")]
    UpstreamTimeout {
        operation: OperationKind,
        timeout_secs: u64,
    },

    /// The backend could not be reached or dropped the connection before answering
    #[error("Upstream unavailable for {operation}: {message}")]
    UpstreamUnavailable {
        operation: OperationKind,
        message: String,
    },

    #[error("Upstream response for {operation} could not be read: {message}")]
    UpstreamBadResponse {
        operation: OperationKind,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
/// Status codes and client messages stay per-variant since some of them are dynamic.
fn app_error_static_metadata(
    err: &AppError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        AppError::Validation(_) => (
            "VALIDATION_ERROR",
            false,
            Some("Check request parameters and try again"),
            LogLevel::Debug,
        ),
        AppError::Upstream { status, .. } => (
            "UPSTREAM_ERROR",
            *status >= 500 || *status == 429,
            None,
            LogLevel::Warn,
        ),
        AppError::UpstreamTimeout { .. } => (
            "UPSTREAM_TIMEOUT",
            true,
            Some("Retry later; large playlists can take several minutes"),
            LogLevel::Error,
        ),
        AppError::UpstreamUnavailable { .. } => (
            "UPSTREAM_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        AppError::UpstreamBadResponse { .. } => (
            "UPSTREAM_BAD_RESPONSE",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for log fields
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Validation(_) => "Validation",
            AppError::Upstream { .. } => "Upstream",
            AppError::UpstreamTimeout { .. } => "UpstreamTimeout",
            AppError::UpstreamUnavailable { .. } => "UpstreamUnavailable",
            AppError::UpstreamBadResponse { .. } => "UpstreamBadResponse",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// The relay operation the error belongs to, when it came from the upstream call
    pub fn operation(&self) -> Option<OperationKind> {
        match self {
            AppError::Upstream { operation, .. }
            | AppError::UpstreamTimeout { operation, .. }
            | AppError::UpstreamUnavailable { operation, .. }
            | AppError::UpstreamBadResponse { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        // Add source error chain
        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) => 422,
            AppError::Upstream { status, .. } => *status,
            AppError::UpstreamTimeout { .. } => 504,
            AppError::UpstreamUnavailable { .. } | AppError::UpstreamBadResponse { .. } => 502,
            AppError::Internal(_) | AppError::InternalWithSource { .. } => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(_) => "Invalid parameters".to_string(),
            AppError::Upstream { operation, .. }
            | AppError::UpstreamTimeout { operation, .. }
            | AppError::UpstreamUnavailable { operation, .. }
            | AppError::UpstreamBadResponse { operation, .. } => {
                operation.failure_message().to_string()
            }
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Download failed".to_string()
            }
        }
    }

    fn client_details(&self) -> Value {
        match self {
            AppError::Validation(errors) => {
                serde_json::to_value(errors).unwrap_or_else(|_| Value::Object(Default::default()))
            }
            AppError::Upstream { detail, .. } => detail.clone(),
            AppError::UpstreamTimeout { timeout_secs, .. } => Value::String(format!(
                "The processing service did not respond within {} seconds",
                timeout_secs
            )),
            AppError::UpstreamUnavailable { .. } => {
                Value::String("The processing service is unavailable".to_string())
            }
            AppError::UpstreamBadResponse { .. } => {
                Value::String("The processing service returned an unreadable response".to_string())
            }
            AppError::Internal(_) | AppError::InternalWithSource { .. } => Value::String(
                "An unexpected error occurred while preparing the response".to_string(),
            ),
        }
    }
}
