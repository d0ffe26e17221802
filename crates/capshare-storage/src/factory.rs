#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::{s3::S3Credentials, S3Storage};
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use capshare_core::Config;
use std::sync::Arc;

/// Create a storage backend based on configuration
///
/// The backend is not initialised; call `Storage::init` before serving.
pub fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;

            let credentials = match (&config.s3_access_key_id, &config.s3_secret_access_key) {
                (Some(id), Some(secret)) => Some(S3Credentials {
                    access_key_id: id.clone(),
                    secret_access_key: secret.clone(),
                }),
                _ => None,
            };

            let storage = S3Storage::new(
                bucket,
                config.s3_region.clone(),
                config.s3_endpoint.clone(),
                credentials,
            )?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;

            Ok(Arc::new(LocalStorage::new(base_path)))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use capshare_core::UserKeys;

    #[tokio::test]
    async fn test_creates_local_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            listen_addr: "127.0.0.1:0".to_string(),
            users: UserKeys::default(),
            storage_backend: StorageBackend::Local,
            local_storage_path: Some(dir.path().join("files").display().to_string()),
            s3_bucket: None,
            s3_endpoint: None,
            s3_region: "us-east-1".to_string(),
            s3_access_key_id: None,
            s3_secret_access_key: None,
            metadata_db_path: dir.path().join("meta.redb").display().to_string(),
            reaper_interval_secs: 30,
            environment: "test".to_string(),
        };

        let storage = create_storage(&config).unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Local);
        storage.init().await.unwrap();
        assert!(dir.path().join("files").is_dir());
    }

    #[test]
    fn test_local_backend_requires_path() {
        let config = Config {
            listen_addr: "127.0.0.1:0".to_string(),
            users: UserKeys::default(),
            storage_backend: StorageBackend::Local,
            local_storage_path: None,
            s3_bucket: None,
            s3_endpoint: None,
            s3_region: "us-east-1".to_string(),
            s3_access_key_id: None,
            s3_secret_access_key: None,
            metadata_db_path: "meta.redb".to_string(),
            reaper_interval_secs: 30,
            environment: "test".to_string(),
        };

        assert!(matches!(
            create_storage(&config),
            Err(StorageError::ConfigError(_))
        ));
    }
}
