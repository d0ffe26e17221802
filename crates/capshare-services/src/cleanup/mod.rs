mod service;

pub use service::{ExpiryReaper, ReapSummary};
