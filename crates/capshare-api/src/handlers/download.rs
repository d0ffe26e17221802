use crate::auth::{validate_access, AccessQuery};
use crate::error::HttpAppError;
use crate::state::AppState;
use crate::utils::headers::attachment_disposition;
use crate::utils::range::{parse_range, ByteRange};
use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use capshare_core::{AppError, Permission};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const UPLOAD_IN_PROGRESS: &str = "there is currently a upload session";

/// Stream a shared file to the holder of a read grant.
///
/// The shared lock travels with the response body and is released once the
/// body has been sent or dropped.
#[tracing::instrument(skip(state, query, headers), fields(operation = "download_file"))]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AccessQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Response, HttpAppError> {
    let now = Utc::now().timestamp();
    let query = AccessQuery::from_extractor(query)?;
    let access = validate_access(&state.config.users, &query, Permission::Read, now)?;

    let Some(guard) = state.locks.try_shared(&access.path) else {
        return Ok((StatusCode::IM_A_TEAPOT, UPLOAD_IN_PROGRESS).into_response());
    };

    let record = state
        .metadata
        .get(&access.path)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, key = %access.path, "Failed to read metadata record");
            AppError::Metadata("Could not get record".to_string())
        })?
        .ok_or_else(|| AppError::NotFound("file not found".to_string()))?;

    let info = state.storage.stat(access.path.as_str()).await?;
    let last_modified = http_time(info.last_modified);

    if not_modified_since(&headers, last_modified) {
        return Ok(Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header(header::LAST_MODIFIED, httpdate::fmt_http_date(last_modified))
            .body(Body::empty())
            .map_err(|e| AppError::Internal(e.to_string()))?);
    }

    let range = match parse_range(headers.get(header::RANGE), info.size) {
        ByteRange::Full => None,
        ByteRange::Partial(range) => Some(range),
        ByteRange::Unsatisfiable => {
            return Ok(Response::builder()
                .status(StatusCode::RANGE_NOT_SATISFIABLE)
                .header(header::CONTENT_RANGE, format!("bytes */{}", info.size))
                .body(Body::empty())
                .map_err(|e| AppError::Internal(e.to_string()))?);
        }
    };

    let object = state
        .storage
        .get(access.path.as_str(), range.clone())
        .await?;

    let content_type = mime_guess::from_path(&record.filename).first_or_octet_stream();

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::LAST_MODIFIED, httpdate::fmt_http_date(last_modified))
        .header(header::ACCEPT_RANGES, "bytes");

    if !record.preview {
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            attachment_disposition(&record.filename),
        );
    }

    builder = match &range {
        Some(r) => builder
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_LENGTH, r.end - r.start)
            .header(
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{}", r.start, r.end - 1, info.size),
            ),
        None => builder
            .status(StatusCode::OK)
            .header(header::CONTENT_LENGTH, info.size),
    };

    tracing::debug!(
        key = %access.path,
        username = %access.username,
        size_bytes = info.size,
        partial = range.is_some(),
        "Serving file"
    );

    let body = object.body.map(move |chunk| {
        let _held = &guard;
        chunk.map_err(std::io::Error::other)
    });

    builder
        .body(Body::from_stream(body))
        .map_err(|e| HttpAppError(AppError::Internal(e.to_string())))
}

/// HTTP dates carry whole seconds only.
fn http_time(at: DateTime<Utc>) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(at.timestamp().max(0) as u64)
}

fn not_modified_since(headers: &HeaderMap, last_modified: SystemTime) -> bool {
    headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| httpdate::parse_http_date(value).ok())
        .is_some_and(|since| last_modified <= since)
}
