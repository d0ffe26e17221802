//! Capshare metadata store
//!
//! Durable record of every shared file (filename, preview flag, expiry), kept
//! in an embedded redb database keyed by resolved path.

pub mod db;

pub use db::{DbError, MetadataRepository};
