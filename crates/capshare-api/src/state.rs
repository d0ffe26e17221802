//! Application state shared by every handler.

use capshare_core::Config;
use capshare_db::MetadataRepository;
use capshare_services::PathLocks;
use capshare_storage::Storage;
use std::sync::Arc;

/// Built once at startup; everything in it is safe to share across requests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<dyn Storage>,
    pub metadata: MetadataRepository,
    pub locks: PathLocks,
}

impl AppState {
    pub fn new(config: Arc<Config>, storage: Arc<dyn Storage>, metadata: MetadataRepository) -> Self {
        Self {
            config,
            storage,
            metadata,
            locks: PathLocks::new(),
        }
    }
}
