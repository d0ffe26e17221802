//! Storage doubles.

use async_trait::async_trait;
use capshare_core::StorageBackend;
use capshare_storage::{
    BoxReader, LocalStorage, ObjectInfo, Storage, StorageError, StorageResult, StoredObject,
};
use std::ops::Range;
use tokio::io::AsyncReadExt;

/// Local storage whose writes always fail after consuming part of the body.
pub struct FailingStorage {
    inner: LocalStorage,
}

impl FailingStorage {
    pub fn new(inner: LocalStorage) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Storage for FailingStorage {
    async fn init(&self) -> StorageResult<()> {
        self.inner.init().await
    }

    async fn put<'a>(&self, _key: &str, mut reader: BoxReader<'a>) -> StorageResult<u64> {
        let mut buf = [0u8; 4];
        let _ = reader.read(&mut buf).await;
        Err(StorageError::BackendError("disk on fire".to_string()))
    }

    async fn stat(&self, key: &str) -> StorageResult<ObjectInfo> {
        self.inner.stat(key).await
    }

    async fn get(&self, key: &str, range: Option<Range<u64>>) -> StorageResult<StoredObject> {
        self.inner.get(key, range).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.delete(key).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
