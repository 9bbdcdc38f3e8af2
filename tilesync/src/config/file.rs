//! INI configuration file.
//!
//! ```ini
//! [api]
//! base_url = https://sync.example.com/
//! api_key = ...
//! timeout = 60
//! download_timeout = 300
//!
//! [sync]
//! interval_mins = 15
//! data_dir = ~/.local/share/tilesync
//! checksum = md5
//!
//! [area]
//! boxes = 24.0,-82.0,27.0,-79.0;30.0,-82.0,31.0,-81.0
//!
//! [logging]
//! level = info
//! directory = ~/.local/share/tilesync/logs
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;

use super::{ConfigError, SyncConfig, DEFAULT_SYNC_INTERVAL};
use crate::api::{DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS};
use crate::coord::BoundingBox;
use crate::export::ChecksumAlgorithm;
use crate::logging::LogConfig;

const APP_DIR: &str = "tilesync";
const CONFIG_FILE_NAME: &str = "config.ini";

/// Separator between boxes in `area.boxes`.
pub(crate) const BOX_SEPARATOR: char = ';';

/// Location of the configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE_NAME)
}

/// Default base storage directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Expand a leading `~` to the home directory.
fn expand_home(raw: &str) -> PathBuf {
    match (raw.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}

pub(crate) fn parse_boxes(raw: &str) -> Result<Vec<BoundingBox>, ConfigError> {
    raw.split(BOX_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<BoundingBox>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "area.boxes".to_string(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

pub(crate) fn format_boxes(boxes: &[BoundingBox]) -> String {
    boxes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(&BOX_SEPARATOR.to_string())
}

fn parse_number(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

/// Contents of the configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub interval_mins: u64,
    pub data_dir: PathBuf,
    pub checksum: ChecksumAlgorithm,
    pub boxes: Vec<BoundingBox>,
    pub log_level: String,
    pub log_directory: Option<PathBuf>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            interval_mins: DEFAULT_SYNC_INTERVAL.as_secs() / 60,
            data_dir: default_data_dir(),
            checksum: ChecksumAlgorithm::default(),
            boxes: Vec::new(),
            log_level: "info".to_string(),
            log_directory: None,
        }
    }
}

impl ConfigFile {
    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields defaults; missing keys keep
    /// their default values.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if !path.exists() {
            return Ok(config);
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if let Some(api) = ini.section(Some("api")) {
            if let Some(v) = api.get("base_url") {
                config.base_url = v.trim().to_string();
            }
            if let Some(v) = api.get("api_key") {
                config.api_key = v.trim().to_string();
            }
            if let Some(v) = api.get("timeout") {
                config.timeout_secs = parse_number("api.timeout", v)?;
            }
            if let Some(v) = api.get("download_timeout") {
                config.download_timeout_secs = parse_number("api.download_timeout", v)?;
            }
        }

        if let Some(sync) = ini.section(Some("sync")) {
            if let Some(v) = sync.get("interval_mins") {
                config.interval_mins = parse_number("sync.interval_mins", v)?;
            }
            if let Some(v) = sync.get("data_dir").filter(|v| !v.trim().is_empty()) {
                config.data_dir = expand_home(v.trim());
            }
            if let Some(v) = sync.get("checksum") {
                config.checksum = v.parse().map_err(|reason| ConfigError::InvalidValue {
                    key: "sync.checksum".to_string(),
                    reason,
                })?;
            }
        }

        if let Some(area) = ini.section(Some("area")) {
            if let Some(v) = area.get("boxes") {
                config.boxes = parse_boxes(v)?;
            }
        }

        if let Some(logging) = ini.section(Some("logging")) {
            if let Some(v) = logging.get("level").filter(|v| !v.trim().is_empty()) {
                config.log_level = v.trim().to_string();
            }
            if let Some(v) = logging.get("directory") {
                let v = v.trim();
                config.log_directory = (!v.is_empty()).then(|| expand_home(v));
            }
        }

        Ok(config)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let mut ini = Ini::new();
        ini.with_section(Some("api"))
            .set("base_url", self.base_url.as_str())
            .set("api_key", self.api_key.as_str())
            .set("timeout", self.timeout_secs.to_string())
            .set("download_timeout", self.download_timeout_secs.to_string());
        ini.with_section(Some("sync"))
            .set("interval_mins", self.interval_mins.to_string())
            .set("data_dir", self.data_dir.to_string_lossy().to_string())
            .set("checksum", self.checksum.as_str());
        ini.with_section(Some("area"))
            .set("boxes", format_boxes(&self.boxes));
        ini.with_section(Some("logging"))
            .set("level", self.log_level.as_str())
            .set(
                "directory",
                self.log_directory
                    .as_ref()
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_default(),
            );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        ini.write_to_file(path).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Runtime configuration described by this file.
    pub fn to_sync_config(&self) -> SyncConfig {
        SyncConfig::new(self.data_dir.clone())
            .with_api(self.base_url.clone(), self.api_key.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_download_timeout(Duration::from_secs(self.download_timeout_secs))
            .with_sync_interval(Duration::from_secs(self.interval_mins * 60))
            .with_checksum(self.checksum)
            .with_boxes(self.boxes.clone())
    }

    /// Logging settings described by this file.
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.clone(),
            directory: self.log_directory.clone(),
            ..Default::default()
        }
    }
}
