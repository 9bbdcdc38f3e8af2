//! Bulk export path: manifest resolution, verified download and install.
//!
//! A tile whose incremental history cannot be replayed is replaced wholesale
//! by a compressed bundle. The bundle is only handed to the Tile Store after
//! its byte count and checksum both match the manifest.

pub mod checksum;
mod downloader;
pub mod extractor;
mod manifest;

use std::path::PathBuf;

use thiserror::Error;

use crate::api::ApiError;
use crate::coord::TileCoordinate;
use crate::store::StoreError;

pub use checksum::{ChecksumAlgorithm, StreamingChecksum};
pub use downloader::{IntegrityVerifyingDownloader, STAGING_DIR_NAME};
pub use manifest::{collect_export_set, BulkExportFetcher, ExportManifest};

/// Why a tile's export was not installed.
///
/// None of these leave the Tile Store modified.
#[derive(Debug, Error)]
pub enum ExportFailure {
    /// The export batch response had no entry for the tile.
    #[error("no export manifest returned for tile {tile}")]
    MissingManifest { tile: TileCoordinate },

    /// The bundle download could not be opened.
    #[error("failed to open bundle for tile {tile}: {source}")]
    Fetch {
        tile: TileCoordinate,
        #[source]
        source: ApiError,
    },

    /// The bundle stream broke off mid-transfer.
    #[error("bundle stream for tile {tile} failed: {source}")]
    Stream {
        tile: TileCoordinate,
        #[source]
        source: std::io::Error,
    },

    /// A local file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bundle for tile {tile} is {actual} bytes, manifest says {expected}")]
    SizeMismatch {
        tile: TileCoordinate,
        expected: u64,
        actual: u64,
    },

    #[error("bundle for tile {tile} has checksum {actual}, manifest says {expected}")]
    ChecksumMismatch {
        tile: TileCoordinate,
        expected: String,
        actual: String,
    },

    /// The verified bundle is not valid gzip.
    #[error("failed to decompress {path}: {source}")]
    Decompress {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The Tile Store rejected the bundle.
    #[error("failed to install bundle for tile {tile}: {source}")]
    Install {
        tile: TileCoordinate,
        #[source]
        source: StoreError,
    },
}

impl ExportFailure {
    /// True for size and checksum mismatches.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            ExportFailure::SizeMismatch { .. } | ExportFailure::ChecksumMismatch { .. }
        )
    }
}
