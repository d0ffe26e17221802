//! Configuration module
//!
//! Settings are read once from the environment (after loading `.env`) and
//! validated at startup. The resulting `Config` is immutable and shared
//! through `Arc` by every component.

use std::collections::HashMap;
use std::env;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::storage_types::StorageBackend;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_METADATA_DB_PATH: &str = "capshare.redb";
const DEFAULT_S3_REGION: &str = "us-east-1";
const DEFAULT_REAPER_INTERVAL_SECS: u64 = 30;

/// Username to signing key. Read-only after startup.
#[derive(Clone, Default)]
pub struct UserKeys(HashMap<String, Vec<u8>>);

impl UserKeys {
    pub fn new(keys: HashMap<String, Vec<u8>>) -> Self {
        UserKeys(keys)
    }

    /// Parse `user=base64key,user2=base64key`. Keys use standard base64.
    pub fn parse(spec: &str) -> Result<Self, anyhow::Error> {
        let mut keys = HashMap::new();
        for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (username, encoded) = pair
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("USERS entry \"{}\" is not user=key", pair))?;
            let username = username.trim();
            if username.is_empty() {
                return Err(anyhow::anyhow!("USERS entry has an empty username"));
            }
            let key = STANDARD.decode(encoded.trim()).map_err(|e| {
                anyhow::anyhow!("USERS key for \"{}\" is not valid base64: {}", username, e)
            })?;
            if key.is_empty() {
                return Err(anyhow::anyhow!("USERS key for \"{}\" is empty", username));
            }
            keys.insert(username.to_string(), key);
        }
        Ok(UserKeys(keys))
    }

    pub fn get(&self, username: &str) -> Option<&[u8]> {
        self.0.get(username).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for UserKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.0.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("UserKeys")
            .field("users", &names)
            .field("keys", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct Config {
    pub listen_addr: String,
    pub users: UserKeys,
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_region: String,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub metadata_db_path: String,
    pub reaper_interval_secs: u64,
    pub environment: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("listen_addr", &self.listen_addr)
            .field("users", &self.users)
            .field("storage_backend", &self.storage_backend)
            .field("local_storage_path", &self.local_storage_path)
            .field("s3_bucket", &self.s3_bucket)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("s3_region", &self.s3_region)
            .field("s3_access_key_id", &self.s3_access_key_id)
            .field(
                "s3_secret_access_key",
                &self.s3_secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("metadata_db_path", &self.metadata_db_path)
            .field("reaper_interval_secs", &self.reaper_interval_secs)
            .field("environment", &self.environment)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let users = match env::var("USERS") {
            Ok(spec) => UserKeys::parse(&spec)?,
            Err(_) => UserKeys::default(),
        };

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(s) => s.parse::<StorageBackend>()?,
            Err(_) => StorageBackend::Local,
        };

        let reaper_interval_secs = match env::var("REAPER_INTERVAL_SECS") {
            Ok(s) => s
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("REAPER_INTERVAL_SECS must be a valid number"))?,
            Err(_) => DEFAULT_REAPER_INTERVAL_SECS,
        };

        let config = Config {
            listen_addr: env::var("LISTEN_ADDR").unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string()),
            users,
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| DEFAULT_S3_REGION.to_string()),
            s3_access_key_id: env::var("S3_ACCESS_KEY_ID").ok(),
            s3_secret_access_key: env::var("S3_SECRET_ACCESS_KEY").ok(),
            metadata_db_path: env::var("METADATA_DB_PATH")
                .unwrap_or_else(|_| DEFAULT_METADATA_DB_PATH.to_string()),
            reaper_interval_secs,
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.reaper_interval_secs == 0 {
            return Err(anyhow::anyhow!("REAPER_INTERVAL_SECS must be greater than 0"));
        }

        if self.metadata_db_path.trim().is_empty() {
            return Err(anyhow::anyhow!("METADATA_DB_PATH must not be empty"));
        }

        match self.storage_backend {
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_access_key_id.is_some() != self.s3_secret_access_key.is_some() {
                    return Err(anyhow::anyhow!(
                        "S3_ACCESS_KEY_ID and S3_SECRET_ACCESS_KEY must be set together"
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}
