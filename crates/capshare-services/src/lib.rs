//! Capshare Services Layer
//!
//! Coordination shared by the HTTP handlers and the background reaper: the
//! per-path advisory lock table and the expiry reaper that deletes both halves
//! of an expired file.

pub mod cleanup;
pub mod locks;

pub use cleanup::{ExpiryReaper, ReapSummary};
pub use locks::{ExclusiveGuard, PathLocks, SharedGuard};
