//! Application setup and initialization
//!
//! Startup order: telemetry, metadata store, storage, shared state, reaper,
//! routes. Any failure here aborts the process before the listener opens.

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use crate::state::AppState;
use crate::telemetry::{init_telemetry, LogFormat};
use anyhow::Result;
use capshare_core::Config;
use capshare_services::ExpiryReaper;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Everything `main` needs to serve requests.
pub struct App {
    pub state: Arc<AppState>,
    pub router: axum::Router,
    pub reaper: JoinHandle<()>,
}

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<App> {
    init_telemetry(LogFormat::from_env(config.is_production()))
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        users = config.users.len(),
        backend = ?config.storage_backend,
        environment = %config.environment,
        "Configuration loaded and validated successfully"
    );

    let metadata = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config).await?;

    let state = Arc::new(AppState::new(Arc::new(config), storage, metadata));

    let reaper = Arc::new(ExpiryReaper::new(
        state.metadata.clone(),
        state.storage.clone(),
        state.locks.clone(),
        Duration::from_secs(state.config.reaper_interval_secs),
    ));
    let reaper = reaper.start();

    let router = routes::setup_routes(state.clone());

    Ok(App {
        state,
        router,
        reaper,
    })
}
