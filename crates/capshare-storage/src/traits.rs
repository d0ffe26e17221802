//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::ops::Range;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Content handed to `Storage::put`. It may borrow from the request it came from.
pub type BoxReader<'a> = Pin<Box<dyn AsyncRead + Send + Unpin + 'a>>;

/// Body of a stored object, yielded in chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Size and modification time of a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectInfo {
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// An opened object: its metadata plus the (possibly ranged) body.
pub struct StoredObject {
    pub info: ObjectInfo,
    pub body: ByteStream,
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) implement this trait, so the
/// handlers and the reaper never depend on a concrete backend. Operations on
/// distinct keys are safe to run concurrently; callers serialize access to the
/// same key through the path lock table.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Verify connectivity or create the root directory.
    ///
    /// Called once at startup; an error here is fatal.
    async fn init(&self) -> StorageResult<()>;

    /// Write the whole reader as the object's content, replacing any prior
    /// content. Returns the number of bytes stored.
    ///
    /// If the reader fails part way, nothing is left at `key` beyond what was
    /// there before the call.
    async fn put<'a>(&self, key: &str, reader: BoxReader<'a>) -> StorageResult<u64>;

    /// Size and modification time, `NotFound` when absent.
    async fn stat(&self, key: &str) -> StorageResult<ObjectInfo>;

    /// Open the object for streaming. With `range`, only those bytes are
    /// returned; the range must already be clamped to the object size.
    async fn get(&self, key: &str, range: Option<Range<u64>>) -> StorageResult<StoredObject>;

    /// Remove the object. Returns `NotFound` when it was already absent;
    /// callers that treat deletion as idempotent check `is_not_found`.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
