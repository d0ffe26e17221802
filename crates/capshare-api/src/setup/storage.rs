//! Storage setup and initialization

use anyhow::{Context, Result};
use capshare_core::Config;
use capshare_storage::{create_storage, Storage};
use std::sync::Arc;

/// Build the configured backend and check that it is usable.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing storage backend...");
    let storage = create_storage(config).context("Failed to build storage backend")?;

    storage
        .init()
        .await
        .context("Storage backend is not usable")?;

    tracing::info!(
        backend = ?storage.backend_type(),
        "Storage backend initialized successfully"
    );

    Ok(storage)
}
