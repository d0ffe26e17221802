use serde::{Deserialize, Serialize};

/// Record persisted per resolved path while the object exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Original, client-supplied filename. Only used for `Content-Disposition`.
    #[serde(rename = "f")]
    pub filename: String,
    /// Serve inline instead of as an attachment.
    #[serde(rename = "p")]
    pub preview: bool,
    /// Unix seconds, copied from the write grant's `until` at upload time.
    #[serde(rename = "e")]
    pub expire: i64,
}

impl FileMetadata {
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expire
    }
}
