use crate::keys::validate_key;
use crate::traits::{BoxReader, ObjectInfo, Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::StreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::buffered::BufWriter;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{GetOptions, GetRange, ObjectStore, ObjectStoreExt, Result as ObjectResult};
use std::ops::Range;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Credentials used instead of the ambient AWS environment.
#[derive(Clone)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// S3 storage implementation
///
/// Keys map one-to-one onto object keys at the bucket root.
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<AmazonS3>,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `credentials` - Explicit keys; when `None` the AWS environment is used
    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        credentials: Option<S3Credentials>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder.with_endpoint(endpoint).with_allow_http(allow_http);
        }

        if let Some(creds) = credentials {
            builder = builder
                .with_access_key_id(creds.access_key_id)
                .with_secret_access_key(creds.secret_access_key);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store: Arc::new(store),
            bucket,
        })
    }

    fn location(key: &str) -> StorageResult<Path> {
        validate_key(key)?;
        Ok(Path::from(key.to_string()))
    }

    fn map_read_error(&self, key: &str, e: ObjectStoreError) -> StorageError {
        match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %key,
                    "S3 read failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn init(&self) -> StorageResult<()> {
        let result: ObjectResult<_> = self.store.list_with_delimiter(None).await;

        result.map_err(|e| {
            StorageError::ConfigError(format!("bucket {} is not reachable: {}", self.bucket, e))
        })?;

        tracing::info!(bucket = %self.bucket, "S3 storage ready");
        Ok(())
    }

    async fn put<'a>(&self, key: &str, mut reader: BoxReader<'a>) -> StorageResult<u64> {
        let location = Self::location(key)?;
        let start = std::time::Instant::now();

        let store: Arc<dyn ObjectStore> = self.store.clone();
        let mut writer = BufWriter::new(store, location);

        let copied = match tokio::io::copy(&mut reader, &mut writer).await {
            Ok(n) => writer.shutdown().await.map(|_| n),
            Err(e) => Err(e),
        };

        let size = match copied {
            Ok(n) => n,
            Err(e) => {
                // no-op when nothing was flushed yet; otherwise drops the pending multipart upload
                if let Err(abort_err) = writer.abort().await {
                    tracing::warn!(
                        error = %abort_err,
                        bucket = %self.bucket,
                        key = %key,
                        "S3 upload abort failed"
                    );
                }
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 stream upload failed"
                );
                return Err(StorageError::UploadFailed(e.to_string()));
            }
        };

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 stream upload successful"
        );

        Ok(size)
    }

    async fn stat(&self, key: &str) -> StorageResult<ObjectInfo> {
        let location = Self::location(key)?;
        let meta = self
            .store
            .head(&location)
            .await
            .map_err(|e| self.map_read_error(key, e))?;

        Ok(ObjectInfo {
            size: meta.size,
            last_modified: meta.last_modified,
        })
    }

    async fn get(&self, key: &str, range: Option<Range<u64>>) -> StorageResult<StoredObject> {
        let location = Self::location(key)?;
        let options = GetOptions {
            range: range.map(GetRange::Bounded),
            ..Default::default()
        };

        let result: ObjectResult<_> = self.store.get_opts(&location, options).await;
        let result = result.map_err(|e| self.map_read_error(key, e))?;

        let info = ObjectInfo {
            size: result.meta.size,
            last_modified: result.meta.last_modified,
        };

        let bucket = self.bucket.clone();
        let key = key.to_string();
        let body = result.into_stream().map(move |res| {
            res.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    "S3 stream download error"
                );
                StorageError::DownloadFailed(e.to_string())
            })
        });

        Ok(StoredObject {
            info,
            body: Box::pin(body),
        })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let location = Self::location(key)?;
        let start = std::time::Instant::now();

        // S3 deletes are idempotent; probe first so absence is reported.
        self.store
            .head(&location)
            .await
            .map_err(|e| self.map_read_error(key, e))?;

        let result: ObjectResult<_> = self.store.delete(&location).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 delete failed"
            );
            StorageError::DeleteFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_with_custom_endpoint() {
        let storage = S3Storage::new(
            "capshare".to_string(),
            "us-east-1".to_string(),
            Some("http://localhost:9000".to_string()),
            Some(S3Credentials {
                access_key_id: "minio".to_string(),
                secret_access_key: "minio123".to_string(),
            }),
        )
        .unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::S3);
    }

    #[test]
    fn test_location_rejects_nested_keys() {
        assert!(S3Storage::location("abc").is_ok());
        assert!(matches!(
            S3Storage::location("a/b"),
            Err(StorageError::InvalidKey(_))
        ));
    }
}
