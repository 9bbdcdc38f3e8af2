//! Addressable configuration keys for `config get/set/list`.

use std::path::PathBuf;
use std::str::FromStr;

use super::file::{format_boxes, parse_boxes};
use super::{ConfigError, ConfigFile};

/// One `section.key` setting of the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ApiBaseUrl,
    ApiKey,
    ApiTimeout,
    ApiDownloadTimeout,
    SyncIntervalMins,
    SyncDataDir,
    SyncChecksum,
    AreaBoxes,
    LoggingLevel,
    LoggingDirectory,
}

const ALL_KEYS: [ConfigKey; 10] = [
    ConfigKey::ApiBaseUrl,
    ConfigKey::ApiKey,
    ConfigKey::ApiTimeout,
    ConfigKey::ApiDownloadTimeout,
    ConfigKey::SyncIntervalMins,
    ConfigKey::SyncDataDir,
    ConfigKey::SyncChecksum,
    ConfigKey::AreaBoxes,
    ConfigKey::LoggingLevel,
    ConfigKey::LoggingDirectory,
];

impl ConfigKey {
    /// Every key, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        &ALL_KEYS
    }

    /// Full `section.key` name.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::ApiBaseUrl => "api.base_url",
            ConfigKey::ApiKey => "api.api_key",
            ConfigKey::ApiTimeout => "api.timeout",
            ConfigKey::ApiDownloadTimeout => "api.download_timeout",
            ConfigKey::SyncIntervalMins => "sync.interval_mins",
            ConfigKey::SyncDataDir => "sync.data_dir",
            ConfigKey::SyncChecksum => "sync.checksum",
            ConfigKey::AreaBoxes => "area.boxes",
            ConfigKey::LoggingLevel => "logging.level",
            ConfigKey::LoggingDirectory => "logging.directory",
        }
    }

    pub fn section(&self) -> &'static str {
        self.name().split('.').next().unwrap_or_default()
    }

    pub fn key_name(&self) -> &'static str {
        self.name().split('.').nth(1).unwrap_or_default()
    }

    /// Current value as text; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::ApiBaseUrl => config.base_url.clone(),
            ConfigKey::ApiKey => config.api_key.clone(),
            ConfigKey::ApiTimeout => config.timeout_secs.to_string(),
            ConfigKey::ApiDownloadTimeout => config.download_timeout_secs.to_string(),
            ConfigKey::SyncIntervalMins => config.interval_mins.to_string(),
            ConfigKey::SyncDataDir => config.data_dir.to_string_lossy().to_string(),
            ConfigKey::SyncChecksum => config.checksum.to_string(),
            ConfigKey::AreaBoxes => format_boxes(&config.boxes),
            ConfigKey::LoggingLevel => config.log_level.clone(),
            ConfigKey::LoggingDirectory => config
                .log_directory
                .as_ref()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default(),
        }
    }

    /// Parse and store `value`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = |reason: String| ConfigError::InvalidValue {
            key: self.name().to_string(),
            reason,
        };
        let number = || value.parse::<u64>().map_err(|e| invalid(e.to_string()));

        match self {
            ConfigKey::ApiBaseUrl => config.base_url = value.to_string(),
            ConfigKey::ApiKey => config.api_key = value.to_string(),
            ConfigKey::ApiTimeout => config.timeout_secs = number()?,
            ConfigKey::ApiDownloadTimeout => config.download_timeout_secs = number()?,
            ConfigKey::SyncIntervalMins => config.interval_mins = number()?,
            ConfigKey::SyncDataDir => {
                if value.is_empty() {
                    return Err(invalid("must not be empty".to_string()));
                }
                config.data_dir = PathBuf::from(value);
            }
            ConfigKey::SyncChecksum => config.checksum = value.parse().map_err(&invalid)?,
            ConfigKey::AreaBoxes => config.boxes = parse_boxes(value)?,
            ConfigKey::LoggingLevel => config.log_level = value.to_string(),
            ConfigKey::LoggingDirectory => {
                config.log_directory = (!value.is_empty()).then(|| PathBuf::from(value));
            }
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_KEYS
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ChecksumAlgorithm;

    #[test]
    fn test_parse_keys() {
        assert_eq!("api.base_url".parse::<ConfigKey>().unwrap(), ConfigKey::ApiBaseUrl);
        assert_eq!("AREA.BOXES".parse::<ConfigKey>().unwrap(), ConfigKey::AreaBoxes);
        assert!(matches!(
            "api.nope".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_section_and_key_name() {
        assert_eq!(ConfigKey::SyncChecksum.section(), "sync");
        assert_eq!(ConfigKey::SyncChecksum.key_name(), "checksum");
    }

    #[test]
    fn test_all_names_unique() {
        let mut names: Vec<_> = ConfigKey::all().iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ConfigKey::all().len());
    }

    #[test]
    fn test_set_and_get() {
        let mut config = ConfigFile::default();

        ConfigKey::SyncChecksum.set(&mut config, "SHA256").unwrap();
        assert_eq!(config.checksum, ChecksumAlgorithm::Sha256);
        assert_eq!(ConfigKey::SyncChecksum.get(&config), "sha256");

        ConfigKey::AreaBoxes
            .set(&mut config, "24,-82,27,-79;30,-82,31,-81")
            .unwrap();
        assert_eq!(config.boxes.len(), 2);
        assert_eq!(ConfigKey::AreaBoxes.get(&config), "24,-82,27,-79;30,-82,31,-81");

        ConfigKey::LoggingDirectory.set(&mut config, "").unwrap();
        assert!(config.log_directory.is_none());
        assert_eq!(ConfigKey::LoggingDirectory.get(&config), "");
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::ApiTimeout.set(&mut config, "fast").is_err());
        assert!(ConfigKey::SyncChecksum.set(&mut config, "crc").is_err());
        assert!(ConfigKey::SyncDataDir.set(&mut config, " ").is_err());
        assert!(ConfigKey::AreaBoxes.set(&mut config, "91,0,92,1").is_err());
    }
}
