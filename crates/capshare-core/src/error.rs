//! Error types module
//!
//! All request-level failures are unified under `AppError`. Each variant
//! describes how it should be presented over HTTP through `ErrorMetadata`,
//! so the api crate can render them without matching on every case.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like rejected grants
    Debug,
    /// Warning level - for contention and client mistakes worth noticing
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "STORAGE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether the client may retry the same request
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Any access-validation failure. The reason is for logs only.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource busy: {0}")]
    ResourceBusy(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

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

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::Forbidden(_) => (403, "FORBIDDEN", false, LogLevel::Debug),
        AppError::ResourceBusy(_) => (409, "RESOURCE_BUSY", true, LogLevel::Warn),
        AppError::Storage(_) => (500, "STORAGE_ERROR", false, LogLevel::Error),
        AppError::Metadata(_) => (500, "METADATA_ERROR", false, LogLevel::Error),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        AppError::PayloadTooLarge(_) => (413, "PAYLOAD_TOO_LARGE", false, LogLevel::Debug),
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, LogLevel::Debug),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => {
            (500, "INTERNAL_ERROR", false, LogLevel::Error)
        }
    }
}

impl AppError {
    /// Get the error type name for logs
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Forbidden(_) => "Forbidden",
            AppError::ResourceBusy(_) => "ResourceBusy",
            AppError::Storage(_) => "Storage",
            AppError::Metadata(_) => "Metadata",
            AppError::NotFound(_) => "NotFound",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

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
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Forbidden(_) => "forbidden".to_string(),
            AppError::ResourceBusy(ref msg) => msg.clone(),
            // Storage and metadata variants already carry a client-safe summary;
            // the underlying cause is logged where it happened.
            AppError::Storage(ref msg) => msg.clone(),
            AppError::Metadata(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_hides_reason() {
        let err = AppError::Forbidden("unknown user".to_string());
        assert_eq!(err.http_status_code(), 403);
        assert_eq!(err.client_message(), "forbidden");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_busy_is_recoverable() {
        let err = AppError::ResourceBusy("busy".to_string());
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "RESOURCE_BUSY");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_storage_error_metadata() {
        let err = AppError::Storage("failed to store to storage".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.client_message(), "failed to store to storage");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_internal_with_source_chain() {
        let err = AppError::from(anyhow::anyhow!("root cause"));
        assert_eq!(err.client_message(), "Internal server error");
        assert!(err.detailed_message().contains("root cause"));
    }
}
