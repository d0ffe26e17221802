//! Shared setup for HTTP-level tests: the full router over local storage in a
//! temp dir and a temp redb file.

#![allow(dead_code)]

pub mod storage;

use axum_test::TestServer;
use capshare_api::setup::routes::setup_routes;
use capshare_api::AppState;
use capshare_core::grant;
use capshare_core::{AccessGrant, Config, Permission, StorageBackend, UserKeys};
use capshare_db::MetadataRepository;
use capshare_storage::{LocalStorage, Storage};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

pub const USER: &str = "alice";
pub const USER_KEY: &[u8] = b"alice-test-key";

/// Test application state
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    /// Get the HTTP test client
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn test_config(temp_dir: &TempDir) -> Config {
    let mut keys = HashMap::new();
    keys.insert(USER.to_string(), USER_KEY.to_vec());

    Config {
        listen_addr: "127.0.0.1:0".to_string(),
        users: UserKeys::new(keys),
        storage_backend: StorageBackend::Local,
        local_storage_path: Some(temp_dir.path().join("files").display().to_string()),
        s3_bucket: None,
        s3_endpoint: None,
        s3_region: "us-east-1".to_string(),
        s3_access_key_id: None,
        s3_secret_access_key: None,
        metadata_db_path: temp_dir.path().join("metadata.redb").display().to_string(),
        reaper_interval_secs: 30,
        environment: "test".to_string(),
    }
}

/// Setup a test application backed by local storage
pub async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(&temp_dir);

    let storage = LocalStorage::new(temp_dir.path().join("files"));
    storage.init().await.expect("Failed to init local storage");

    build_app(temp_dir, config, Arc::new(storage))
}

/// Setup a test application over a caller-supplied storage backend
pub fn setup_test_app_with_storage(storage: Arc<dyn Storage>) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(&temp_dir);
    build_app(temp_dir, config, storage)
}

fn build_app(temp_dir: TempDir, config: Config, storage: Arc<dyn Storage>) -> TestApp {
    let metadata =
        MetadataRepository::open(&config.metadata_db_path).expect("Failed to open metadata db");

    let state = Arc::new(AppState::new(Arc::new(config), storage, metadata));
    let app = setup_routes(state.clone());
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        _temp_dir: temp_dir,
    }
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn grant_for(token: &str, permission: Permission, until: i64, max_size: u64) -> AccessGrant {
    AccessGrant {
        token: token.to_string(),
        until,
        max_size,
        permission,
    }
}

/// Query string for a grant signed with the test user's key.
pub fn signed_query(grant: &AccessGrant) -> String {
    grant::sign(USER, USER_KEY, grant).unwrap().to_query_string()
}

/// Write grant valid for ten minutes.
pub fn write_query(token: &str, max_size: u64) -> String {
    signed_query(&grant_for(token, Permission::Write, now() + 600, max_size))
}

/// Read grant valid for ten minutes.
pub fn read_query(token: &str) -> String {
    signed_query(&grant_for(token, Permission::Read, now() + 600, 0))
}
