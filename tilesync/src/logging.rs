//! Logging setup.
//!
//! Console output goes to stderr. When a log directory is configured, a
//! daily-rolling file is written through a non-blocking worker whose guard
//! must be kept alive for the life of the process.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default file name prefix for rolling log files.
pub const DEFAULT_LOG_PREFIX: &str = "tilesync.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is not set, e.g. `info` or
    /// `tilesync=debug`.
    pub level: String,
    /// Directory for rolling log files; console only when `None`.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: DEFAULT_LOG_PREFIX.to_string(),
        }
    }
}

impl LogConfig {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }
}

fn level_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(level).map_err(|e| LoggingError::InvalidFilter {
        filter: level.to_string(),
        reason: e.to_string(),
    })
}

/// Install the global subscriber. `RUST_LOG` overrides `config.level`.
///
/// Returns the file writer guard when file logging is enabled.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&config.level)?,
    };
    let console = fmt::layer().with_writer(std::io::stderr);

    let Some(dir) = &config.directory else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;
        return Ok(None);
    };

    std::fs::create_dir_all(dir).map_err(|e| LoggingError::Directory {
        path: dir.clone(),
        source: e,
    })?;
    let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file = fmt::layer().with_ansi(false).with_writer(writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(Some(guard))
}
