//! Configuration.
//!
//! [`SyncConfig`] is the runtime configuration handed to the engine and the
//! scheduler. [`ConfigFile`] is its persisted INI form, edited through
//! [`ConfigKey`] by the CLI.

mod file;
mod keys;

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::api::{DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS};
use crate::coord::BoundingBox;
use crate::export::{ChecksumAlgorithm, STAGING_DIR_NAME};
use crate::sync::SYNC_PAGE_SIZE;

pub use file::{config_file_path, default_data_dir, ConfigFile};
pub use keys::ConfigKey;

/// Interval between cycles unless configured otherwise.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Shortest interval the scheduler accepts unless lowered explicitly.
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// File name of the persisted tile store under the data directory.
pub const STORE_FILE_NAME: &str = "tiles.json";

/// File name of the persisted bearer token under the data directory.
pub const TOKEN_FILE_NAME: &str = "auth.json";

/// Errors reading, writing or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("missing required setting {0}")]
    Missing(String),
}

/// Runtime configuration of the synchronization engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the synchronization service.
    pub api_base_url: String,

    /// Value of the `apikey` header.
    pub api_key: String,

    /// Base storage directory. Bundles are staged in its `staging` folder.
    pub data_dir: PathBuf,

    /// Connect and read timeout for service calls.
    pub timeout: Duration,

    /// Timeout for a whole bundle download.
    pub download_timeout: Duration,

    /// Time between the end of one cycle and the start of the next.
    pub sync_interval: Duration,

    /// Lower bound applied to `sync_interval`.
    pub min_interval: Duration,

    /// Digest used to verify bundles.
    pub checksum: ChecksumAlgorithm,

    /// Records per incremental page.
    pub page_size: usize,

    /// Initial area of interest.
    pub boxes: Vec<BoundingBox>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            api_key: String::new(),
            data_dir: default_data_dir(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            download_timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            sync_interval: DEFAULT_SYNC_INTERVAL,
            min_interval: MIN_SYNC_INTERVAL,
            checksum: ChecksumAlgorithm::default(),
            page_size: SYNC_PAGE_SIZE,
            boxes: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Create a configuration storing data under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Set the service base URL and API key.
    pub fn with_api(mut self, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.api_base_url = base_url.into();
        self.api_key = api_key.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Lower the interval floor. Intended for tests.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn with_checksum(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.checksum = algorithm;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_boxes(mut self, boxes: Vec<BoundingBox>) -> Self {
        self.boxes = boxes;
        self
    }

    /// Interval the scheduler actually waits: never below `min_interval`.
    pub fn effective_interval(&self) -> Duration {
        self.sync_interval.max(self.min_interval)
    }

    /// Where bundles are staged while downloading.
    pub fn staging_dir(&self) -> PathBuf {
        self.data_dir.join(STAGING_DIR_NAME)
    }

    /// Where the CLI persists its tile store.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE_NAME)
    }

    /// Where the bearer token is persisted.
    pub fn token_path(&self) -> PathBuf {
        self.data_dir.join(TOKEN_FILE_NAME)
    }

    /// Check the settings needed to talk to the service.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.is_empty() {
            return Err(ConfigError::Missing("api.base_url".to_string()));
        }
        if !(self.api_base_url.starts_with("https://") || self.api_base_url.starts_with("http://"))
        {
            return Err(ConfigError::InvalidValue {
                key: "api.base_url".to_string(),
                reason: format!("'{}' is not an http(s) URL", self.api_base_url),
            });
        }
        if self.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "page_size".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
