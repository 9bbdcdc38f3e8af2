//! Remote service abstraction.
//!
//! [`SyncApi`] covers the four endpoints the engine talks to and
//! [`BundleSource`] opens export bundle downloads. Both are traits so the
//! engine can be driven by scripted fakes; [`HttpSyncApi`] and
//! [`HttpBundleSource`] are the reqwest-backed implementations.

mod http;
mod types;

use std::io::Read;

use thiserror::Error;

use crate::coord::{BoundingBox, TileCoordinate};
use crate::export::ExportManifest;
use crate::sync::{EntityKind, VersionToken};

pub use http::{HttpBundleSource, HttpSyncApi, DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS};
pub use types::{IncrementalPage, SyncStatusEntry, SyncStatusRequest};

/// Result type for remote calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors from remote calls. None of them are fatal; the engine logs them
/// and moves on to the next tile or cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// The request could not be sent or the connection failed.
    #[error("request to {endpoint} failed: {reason}")]
    Request { endpoint: String, reason: String },

    /// Connect or read timeout.
    #[error("request to {endpoint} timed out after {timeout_secs}s")]
    Timeout { endpoint: String, timeout_secs: u64 },

    /// Non-success status other than the export escalation.
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// The response body could not be decoded.
    #[error("failed to decode response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

/// The remote synchronization service.
pub trait SyncApi: Send + Sync {
    /// Tiles that hold data within any of `boxes`.
    fn list_tiles(&self, boxes: &[BoundingBox]) -> ApiResult<Vec<TileCoordinate>>;

    /// Per-tile decisions for a batch of status requests.
    ///
    /// `database_version` is the Tile Store's schema/content version.
    fn sync_status(
        &self,
        database_version: &str,
        requests: &[SyncStatusRequest],
    ) -> ApiResult<Vec<SyncStatusEntry>>;

    /// One page of changes for `kind` in `tile` newer than `cursor`.
    ///
    /// A `None` cursor asks for everything.
    fn sync_incremental(
        &self,
        tile: TileCoordinate,
        kind: EntityKind,
        cursor: Option<&VersionToken>,
    ) -> ApiResult<IncrementalPage>;

    /// Download manifests for full bundles of `tiles`.
    fn export_manifests(&self, tiles: &[TileCoordinate]) -> ApiResult<Vec<ExportManifest>>;
}

/// Opens a byte stream for an export bundle URL.
pub trait BundleSource: Send + Sync {
    fn open(&self, url: &str) -> ApiResult<Box<dyn Read + Send>>;
}
