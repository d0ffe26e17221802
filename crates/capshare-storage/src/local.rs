use crate::keys::validate_key;
use crate::traits::{BoxReader, ObjectInfo, Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::io::{ErrorKind, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Local filesystem storage implementation
///
/// Every key is a file directly under `base_path`. Uploads are written to a
/// hidden temporary sibling and renamed into place once complete.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/capshare/files")
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        LocalStorage {
            base_path: base_path.into(),
        }
    }

    /// Convert storage key to filesystem path with security validation
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.base_path
            .join(format!(".{}.{}-{}.part", key, std::process::id(), n))
    }

    async fn info_for(path: &Path, key: &str) -> StorageResult<ObjectInfo> {
        let meta = match fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => return Err(StorageError::IoError(e)),
        };
        if !meta.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        let last_modified: DateTime<Utc> = meta.modified()?.into();
        Ok(ObjectInfo {
            size: meta.len(),
            last_modified,
        })
    }

    async fn write_temp(
        temp: &Path,
        mut reader: BoxReader<'_>,
    ) -> StorageResult<u64> {
        let mut file = fs::File::create(temp).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", temp.display(), e))
        })?;

        let written = tokio::io::copy(&mut reader, &mut file).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", temp.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", temp.display(), e))
        })?;

        Ok(written)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn init(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let meta = fs::metadata(&self.base_path).await?;
        if !meta.is_dir() {
            return Err(StorageError::ConfigError(format!(
                "{} is not a directory",
                self.base_path.display()
            )));
        }

        tracing::info!(path = %self.base_path.display(), "Local storage ready");
        Ok(())
    }

    async fn put<'a>(&self, key: &str, reader: BoxReader<'a>) -> StorageResult<u64> {
        let path = self.key_to_path(key)?;
        let temp = self.temp_path(key);
        let start = std::time::Instant::now();

        let size = match Self::write_temp(&temp, reader).await {
            Ok(size) => size,
            Err(e) => {
                let _ = fs::remove_file(&temp).await;
                tracing::error!(
                    error = %e,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage upload failed"
                );
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to move file into {}: {}",
                path.display(),
                e
            )));
        }

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(size)
    }

    async fn stat(&self, key: &str) -> StorageResult<ObjectInfo> {
        let path = self.key_to_path(key)?;
        Self::info_for(&path, key).await
    }

    async fn get(&self, key: &str, range: Option<Range<u64>>) -> StorageResult<StoredObject> {
        let path = self.key_to_path(key)?;

        let mut file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => {
                return Err(StorageError::DownloadFailed(format!(
                    "Failed to open file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let info = Self::info_for(&path, key).await?;

        let (offset, len) = match range {
            Some(r) => (r.start, r.end.saturating_sub(r.start)),
            None => (0, info.size),
        };
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await?;
        }

        let key = key.to_string();
        let body = ReaderStream::new(file.take(len)).map(move |chunk| {
            chunk.map_err(|e| {
                tracing::error!(error = %e, key = %key, "Local storage read error");
                StorageError::DownloadFailed(e.to_string())
            })
        });

        Ok(StoredObject {
            info,
            body: Box::pin(body),
        })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, ReadBuf};

    async fn storage() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("files"));
        storage.init().await.unwrap();
        (dir, storage)
    }

    fn reader(data: &'static [u8]) -> BoxReader<'static> {
        Box::pin(data)
    }

    async fn collect(obj: StoredObject) -> Vec<u8> {
        let mut out = Vec::new();
        let mut body = obj.body;
        while let Some(chunk) = body.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    /// Yields some bytes, then fails like a dropped client connection.
    struct BrokenReader {
        sent: bool,
    }

    impl AsyncRead for BrokenReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.sent {
                return Poll::Ready(Err(io::Error::new(ErrorKind::ConnectionReset, "gone")));
            }
            self.sent = true;
            buf.put_slice(b"partial");
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let (_dir, storage) = storage().await;

        let size = storage.put("abc", reader(b"hello world")).await.unwrap();
        assert_eq!(size, 11);
        assert_eq!(storage.stat("abc").await.unwrap().size, 11);

        let obj = storage.get("abc", None).await.unwrap();
        assert_eq!(collect(obj).await, b"hello world");

        storage.delete("abc").await.unwrap();
        assert!(storage.stat("abc").await.unwrap_err().is_not_found());
        assert!(storage.delete("abc").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let (_dir, storage) = storage().await;
        storage.put("abc", reader(b"first version")).await.unwrap();
        storage.put("abc", reader(b"second")).await.unwrap();
        let obj = storage.get("abc", None).await.unwrap();
        assert_eq!(collect(obj).await, b"second");
    }

    #[tokio::test]
    async fn test_get_range() {
        let (_dir, storage) = storage().await;
        storage.put("abc", reader(b"0123456789")).await.unwrap();
        let obj = storage.get("abc", Some(2..5)).await.unwrap();
        assert_eq!(obj.info.size, 10);
        assert_eq!(collect(obj).await, b"234");
    }

    #[tokio::test]
    async fn test_get_missing() {
        let (_dir, storage) = storage().await;
        match storage.get("missing", None).await {
            Err(e) => assert!(e.is_not_found()),
            Ok(_) => panic!("expected NotFound"),
        }
    }

    #[tokio::test]
    async fn test_failed_put_leaves_nothing() {
        let (dir, storage) = storage().await;
        storage.put("abc", reader(b"original")).await.unwrap();

        let result = storage
            .put("abc", Box::pin(BrokenReader { sent: false }))
            .await;
        assert!(matches!(result, Err(StorageError::UploadFailed(_))));

        // previous content intact, no temp files left behind
        let obj = storage.get("abc", None).await.unwrap();
        assert_eq!(collect(obj).await, b"original");
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("files"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let (_dir, storage) = storage().await;
        for key in ["../escape", "a/b", "..", ".hidden", ""] {
            assert!(matches!(
                storage.put(key, reader(b"x")).await,
                Err(StorageError::InvalidKey(_))
            ));
        }
    }
}
