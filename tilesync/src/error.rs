//! Crate-level error type.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::coord::CoordError;
use crate::export::ExportFailure;
use crate::store::StoreError;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the synchronization engine and its wiring.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Coord(#[from] CoordError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Export(#[from] ExportFailure),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A cycle task could not be run to completion.
    #[error("sync task failed: {0}")]
    Task(String),
}
