//! CLI error type.

use thiserror::Error;
use tilesync::config::ConfigError;
use tilesync::coord::CoordError;
use tilesync::logging::LoggingError;
use tilesync::store::StoreError;
use tilesync::SyncError;

/// Errors surfaced to the user by a CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error("Invalid bounding box: {0}")]
    BoundingBox(#[from] CoordError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Logging setup failed: {0}")]
    Logging(#[from] LoggingError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Sync cycle aborted: {0}")]
    CycleAborted(String),
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::BoundingBox(_) => 2,
            _ => 1,
        }
    }
}
