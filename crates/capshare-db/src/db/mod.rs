//! Database repositories for data access layer
//
// File metadata records (resolved path -> FileMetadata)
pub mod metadata;
//
// Error type shared by repositories
pub mod error;

pub use error::DbError;
pub use metadata::MetadataRepository;
