//! Runtime configuration supplied by the host application.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::local_store::DEFAULT_MAP_SIZE;

const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 10_000;

/// Settings for the background remote sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// Upper bound for any single remote call. Exceeding it counts as a
    /// remote failure.
    pub remote_timeout_ms: u64,
}

impl SyncConfig {
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_timeout_ms: DEFAULT_REMOTE_TIMEOUT_MS,
        }
    }
}

/// Top level configuration. Every field has a default, so hosts may pass a
/// partial JSON object.
///
/// ```rust
/// use grocery_core::config::CoreConfig;
///
/// let config = CoreConfig::from_json(r#"{"databasePath":"/data/groceries"}"#)?;
/// assert_eq!(config.database_path, "/data/groceries");
/// assert_eq!(config.sync.remote_timeout_ms, 10_000);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoreConfig {
    /// LMDB environment name; `.lmdb` is appended for the directory.
    pub database_path: String,
    pub map_size_bytes: usize,
    pub sync: SyncConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: "grocery_store".to_string(),
            map_size_bytes: DEFAULT_MAP_SIZE,
            sync: SyncConfig::default(),
        }
    }
}

impl CoreConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
