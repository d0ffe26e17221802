//! Data models for the application
//!
//! `access` holds the capability payload and the key it resolves to;
//! `file_metadata` holds the record persisted next to every stored object.

mod access;
mod file_metadata;

pub use access::*;
pub use file_metadata::*;
