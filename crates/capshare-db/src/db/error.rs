use capshare_core::AppError;
use thiserror::Error;

/// Metadata store errors.
///
/// redb reports failures with one type per operation kind; each is kept as its
/// own variant so logs show which step failed.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open metadata database: {0}")]
    Open(#[from] redb::DatabaseError),

    #[error("failed to begin transaction: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("failed to open table: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("failed to commit transaction: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("corrupt metadata record for {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize metadata record: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        tracing::error!(error = %err, "Metadata store error");
        AppError::Metadata("metadata store error".to_string())
    }
}
