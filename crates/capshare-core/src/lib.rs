//! Capshare Core Library
//!
//! This crate provides the domain models, error types, configuration, and the
//! capability codec shared across all capshare components.

pub mod config;
pub mod error;
pub mod grant;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, UserKeys};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use grant::{GrantError, SignedQuery};
pub use models::{AccessGrant, FileMetadata, Permission, ResolvedPath};
pub use storage_types::StorageBackend;
