//! Capshare Storage Library
//!
//! This crate provides the blob half of every shared file: the `Storage` trait
//! and its implementations for an S3-compatible bucket and the local filesystem.
//!
//! # Storage key format
//!
//! A key is a resolved path: a single opaque component with no separators.
//! Both backends store it as-is, directly under their root (bucket or directory).
//! Keys must not be empty, contain `/`, `\` or `..`, or start with `.`; see
//! the `keys` module.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use capshare_core::StorageBackend;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{BoxReader, ByteStream, ObjectInfo, Storage, StorageError, StorageResult, StoredObject};
