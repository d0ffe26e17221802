//! Metadata repository: one redb table mapping resolved path to `FileMetadata`.

use std::path::Path;
use std::sync::Arc;

use capshare_core::{FileMetadata, ResolvedPath};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};

use super::error::DbError;

const METADATA_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("metadata");

/// Repository for file metadata records.
///
/// The database is opened once at startup and shared for the process
/// lifetime. redb calls block, so every async method runs them on the
/// blocking pool.
#[derive(Clone)]
pub struct MetadataRepository {
    db: Arc<Database>,
}

impl MetadataRepository {
    /// Open (or create) the database file and make sure the table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| DbError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            write_txn.open_table(METADATA_TABLE)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Metadata store opened");

        Ok(Self { db: Arc::new(db) })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, DbError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, DbError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db)).await?
    }

    /// Insert or replace the record for `path`.
    #[tracing::instrument(skip(self, record), fields(db.table = "metadata", key = %path))]
    pub async fn put(&self, path: &ResolvedPath, record: &FileMetadata) -> Result<(), DbError> {
        let key = path.as_str().to_string();
        let value = serde_json::to_vec(record).map_err(DbError::Serialize)?;

        self.blocking(move |db| {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(METADATA_TABLE)?;
                table.insert(key.as_str(), value.as_slice())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
    }

    /// Record for `path`, `None` when absent.
    #[tracing::instrument(skip(self), fields(db.table = "metadata", key = %path))]
    pub async fn get(&self, path: &ResolvedPath) -> Result<Option<FileMetadata>, DbError> {
        let key = path.as_str().to_string();

        self.blocking(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(METADATA_TABLE)?;

            let record = match table.get(key.as_str())? {
                Some(value) => Some(serde_json::from_slice(value.value()).map_err(|source| {
                    DbError::Corrupt {
                        key: key.clone(),
                        source,
                    }
                })?),
                None => None,
            };

            Ok(record)
        })
        .await
    }

    /// Remove the record for `path`. Returns whether one existed.
    #[tracing::instrument(skip(self), fields(db.table = "metadata", key = %path))]
    pub async fn delete(&self, path: &ResolvedPath) -> Result<bool, DbError> {
        let key = path.as_str().to_string();

        self.blocking(move |db| {
            let write_txn = db.begin_write()?;
            let existed = {
                let mut table = write_txn.open_table(METADATA_TABLE)?;
                let removed = table.remove(key.as_str())?;
                removed.is_some()
            };
            write_txn.commit()?;
            Ok(existed)
        })
        .await
    }

    /// Every record with `expire <= now`, in key order.
    ///
    /// Records that fail to decode are logged and skipped so one bad entry
    /// never stops a scan.
    #[tracing::instrument(skip(self), fields(db.table = "metadata"))]
    pub async fn list_expired(
        &self,
        now: i64,
    ) -> Result<Vec<(ResolvedPath, FileMetadata)>, DbError> {
        self.blocking(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(METADATA_TABLE)?;

            let mut expired = Vec::new();
            for item in table.iter()? {
                let (key, value) = item?;
                let key = key.value().to_string();
                match serde_json::from_slice::<FileMetadata>(value.value()) {
                    Ok(record) if record.is_expired_at(now) => {
                        expired.push((ResolvedPath::from_key(key), record));
                    }
                    Ok(_) => {}
                    Err(source) => {
                        tracing::error!(
                            error = %DbError::Corrupt { key, source },
                            "Skipping unreadable metadata record"
                        );
                    }
                }
            }

            Ok(expired)
        })
        .await
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<u64, DbError> {
        self.blocking(|db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(METADATA_TABLE)?;
            Ok(table.len()?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> (tempfile::TempDir, MetadataRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = MetadataRepository::open(dir.path().join("metadata.redb")).unwrap();
        (dir, repo)
    }

    fn record(name: &str, expire: i64) -> FileMetadata {
        FileMetadata {
            filename: name.to_string(),
            preview: false,
            expire,
        }
    }

    #[test]
    fn test_open_creates_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("metadata.redb");
        MetadataRepository::open(&path).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_open_reports_unusable_parent() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let result = MetadataRepository::open(blocker.join("metadata.redb"));
        match result {
            Err(DbError::CreateDir { path, .. }) => {
                assert_eq!(path, blocker.display().to_string());
            }
            Err(other) => panic!("expected CreateDir, got {other}"),
            Ok(_) => panic!("expected CreateDir, got an open repository"),
        }
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let (_dir, repo) = repo();
        let path = ResolvedPath::resolve("alice", "report");

        assert_eq!(repo.get(&path).await.unwrap(), None);

        repo.put(&path, &record("report.pdf", 100)).await.unwrap();
        assert_eq!(
            repo.get(&path).await.unwrap(),
            Some(record("report.pdf", 100))
        );

        repo.put(&path, &record("v2.pdf", 200)).await.unwrap();
        assert_eq!(repo.get(&path).await.unwrap(), Some(record("v2.pdf", 200)));
        assert_eq!(repo.count().await.unwrap(), 1);

        assert!(repo.delete(&path).await.unwrap());
        assert!(!repo.delete(&path).await.unwrap());
        assert_eq!(repo.get(&path).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_expired_is_inclusive() {
        let (_dir, repo) = repo();
        let past = ResolvedPath::resolve("alice", "past");
        let exact = ResolvedPath::resolve("alice", "exact");
        let future = ResolvedPath::resolve("alice", "future");

        repo.put(&past, &record("a", 50)).await.unwrap();
        repo.put(&exact, &record("b", 100)).await.unwrap();
        repo.put(&future, &record("c", 101)).await.unwrap();

        let expired: Vec<ResolvedPath> = repo
            .list_expired(100)
            .await
            .unwrap()
            .into_iter()
            .map(|(path, _)| path)
            .collect();

        assert_eq!(expired.len(), 2);
        assert!(expired.contains(&past));
        assert!(expired.contains(&exact));
        // key order
        let mut sorted = expired.clone();
        sorted.sort();
        assert_eq!(expired, sorted);
    }

    #[tokio::test]
    async fn test_reopen_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("metadata.redb");
        let path = ResolvedPath::resolve("bob", "keep");

        {
            let repo = MetadataRepository::open(&db_path).unwrap();
            repo.put(&path, &record("keep.txt", 10)).await.unwrap();
        }

        let repo = MetadataRepository::open(&db_path).unwrap();
        assert_eq!(repo.get(&path).await.unwrap(), Some(record("keep.txt", 10)));
    }
}
