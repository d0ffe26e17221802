//! Write-grant endpoints: store and delete a shared file.

use crate::auth::{validate_access, AccessQuery};
use crate::error::{ApiOutcome, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartRejection, rejection::QueryRejection, Multipart, Query, State},
    Json,
};
use bytes::Bytes;
use capshare_core::{AppError, FileMetadata, Permission, ResolvedPath};
use futures::StreamExt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::io::StreamReader;

pub const BUSY_MESSAGE: &str = "there is currently an upload/download session";

/// Store the multipart `file` field under the grant's token.
///
/// The metadata record is written before the blob; if the blob cannot be
/// stored, both halves are removed again.
#[tracing::instrument(skip(state, query, multipart), fields(operation = "upload_file"))]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AccessQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiOutcome>, HttpAppError> {
    let now = chrono::Utc::now().timestamp();
    let query = AccessQuery::from_extractor(query)?;
    let access = validate_access(&state.config.users, &query, Permission::Write, now)?;

    let mut multipart = multipart.map_err(|e| AppError::InvalidInput(e.body_text()))?;

    let guard = state
        .locks
        .try_exclusive(&access.path)
        .ok_or_else(|| AppError::ResourceBusy(BUSY_MESSAGE.to_string()))?;

    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => break field,
            Ok(Some(_)) => continue,
            Ok(None) => {
                return Err(AppError::InvalidInput("missing multipart field \"file\"".to_string()).into())
            }
            Err(e) => return Err(AppError::InvalidInput(e.body_text()).into()),
        }
    };

    let filename = field
        .file_name()
        .filter(|name| !name.is_empty())
        .unwrap_or(access.grant.token.as_str())
        .to_string();

    let record = FileMetadata {
        filename,
        preview: query.wants_preview(),
        expire: access.grant.until,
    };

    state.metadata.put(&access.path, &record).await.map_err(|e| {
        tracing::error!(error = %e, key = %access.path, "Failed to write metadata record");
        AppError::Metadata("failed to write record".to_string())
    })?;

    let max_size = access.grant.max_size;
    let exceeded = Arc::new(AtomicBool::new(false));
    let over_limit = Arc::clone(&exceeded);
    let mut received: u64 = 0;

    let capped = field.map(move |chunk| -> io::Result<Bytes> {
        let chunk = chunk.map_err(io::Error::other)?;
        received += chunk.len() as u64;
        if received > max_size {
            over_limit.store(true, Ordering::Relaxed);
            return Err(io::Error::other("file exceeds the size allowed by the grant"));
        }
        Ok(chunk)
    });
    let reader = StreamReader::new(Box::pin(capped));

    match state.storage.put(access.path.as_str(), Box::pin(reader)).await {
        Ok(size) => {
            tracing::info!(
                key = %access.path,
                username = %access.username,
                filename = %record.filename,
                size_bytes = size,
                preview = record.preview,
                "File uploaded"
            );
            guard.release();
            Ok(Json(ApiOutcome::ok()))
        }
        Err(e) => {
            tracing::warn!(error = %e, key = %access.path, "Upload failed, rolling back");
            rollback(&state, &access.path).await;
            guard.release();

            if exceeded.load(Ordering::Relaxed) {
                Err(AppError::PayloadTooLarge(format!(
                    "file exceeds the maximum size of {} bytes",
                    max_size
                ))
                .into())
            } else {
                Err(AppError::Storage("failed to store to storage".to_string()).into())
            }
        }
    }
}

/// Best effort: remove whatever is left of a failed upload.
async fn rollback(state: &AppState, path: &ResolvedPath) {
    if let Err(e) = state.metadata.delete(path).await {
        tracing::error!(error = %e, key = %path, "Rollback failed to delete metadata record");
    }
    match state.storage.delete(path.as_str()).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {}
        Err(e) => {
            tracing::error!(error = %e, key = %path, "Rollback failed to delete blob");
        }
    }
}

/// Remove the file and its record.
#[tracing::instrument(skip(state, query), fields(operation = "delete_file"))]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AccessQuery>, QueryRejection>,
) -> Result<Json<ApiOutcome>, HttpAppError> {
    let now = chrono::Utc::now().timestamp();
    let query = AccessQuery::from_extractor(query)?;
    let access = validate_access(&state.config.users, &query, Permission::Write, now)?;

    let guard = state
        .locks
        .try_exclusive(&access.path)
        .ok_or_else(|| AppError::ResourceBusy(BUSY_MESSAGE.to_string()))?;

    let blob_missing = match state.storage.delete(access.path.as_str()).await {
        Ok(()) => false,
        Err(e) if e.is_not_found() => true,
        Err(e) => {
            // keep the record so the pair stays consistent
            tracing::error!(error = %e, key = %access.path, "Failed to delete blob");
            return Err(AppError::Storage("failed to delete file".to_string()).into());
        }
    };

    if let Err(e) = state.metadata.delete(&access.path).await {
        tracing::error!(error = %e, key = %access.path, "Failed to delete metadata record");
        return Err(AppError::Metadata("failed to delete record".to_string()).into());
    }

    guard.release();

    if blob_missing {
        return Err(AppError::NotFound("file not found".to_string()).into());
    }

    tracing::info!(key = %access.path, username = %access.username, "File deleted");
    Ok(Json(ApiOutcome::ok()))
}
