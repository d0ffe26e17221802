//! Metadata store setup

use anyhow::{Context, Result};
use capshare_core::Config;
use capshare_db::MetadataRepository;

/// Open (or create) the embedded metadata database.
pub async fn setup_database(config: &Config) -> Result<MetadataRepository> {
    tracing::info!(path = %config.metadata_db_path, "Opening metadata database...");

    let repository = MetadataRepository::open(&config.metadata_db_path).with_context(|| {
        format!(
            "Failed to open metadata database at {}",
            config.metadata_db_path
        )
    })?;

    let records = repository
        .count()
        .await
        .context("Failed to read metadata database")?;

    tracing::info!(records, "Metadata database ready");
    Ok(repository)
}
