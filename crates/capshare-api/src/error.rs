//! HTTP error response conversion
//!
//! This module provides HTTP-specific error response conversion for AppError.
//!
//! **Handler pattern:** Return `Result<impl IntoResponse, HttpAppError>`. Use
//! `AppError` (or types that implement `Into<AppError>`) for errors so they
//! render consistently (status, body, logging). Mutation endpoints answer with
//! an [`ApiOutcome`] either way.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use capshare_core::{AppError, ErrorMetadata, LogLevel};
use serde::Serialize;

use crate::auth::AccessDenied;
use capshare_db::DbError;
use capshare_storage::StorageError;

/// Body of every mutation response: `{"success": true}` or `{"message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ApiOutcome {
    Ok {
        success: bool,
    },
    Err {
        message: String,
    },
}

impl ApiOutcome {
    pub fn ok() -> Self {
        ApiOutcome::Ok { success: true }
    }

    pub fn err(message: impl Into<String>) -> Self {
        ApiOutcome::Err {
            message: message.into(),
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from capshare-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<AccessDenied> for HttpAppError {
    fn from(reason: AccessDenied) -> Self {
        HttpAppError(AppError::from(reason))
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => HttpAppError(AppError::NotFound("file not found".to_string())),
            other => {
                tracing::error!(error = %other, "Storage operation failed");
                HttpAppError(AppError::Storage("storage error".to_string()))
            }
        }
    }
}

impl From<DbError> for HttpAppError {
    fn from(err: DbError) -> Self {
        HttpAppError(AppError::from(err))
    }
}

/// The full error chain goes to the log only; clients see `client_message`.
fn log_error(error: &AppError) {
    let error_type = error.error_type();
    let error_code = error.error_code();
    let recoverable = error.is_recoverable();
    let details = error.detailed_message();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %details, error_type, error_code, recoverable, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %details, error_type, error_code, recoverable, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %details, error_type, error_code, recoverable, "Error occurred");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Rejected grants get a bare body so the reason never leaks.
        if let AppError::Forbidden(_) = app_error {
            return (
                status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                app_error.client_message(),
            )
                .into_response();
        }

        (status, Json(ApiOutcome::err(app_error.client_message()))).into_response()
    }
}
