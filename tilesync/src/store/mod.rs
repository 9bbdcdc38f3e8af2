//! Tile Store abstraction.
//!
//! The Tile Store is the authoritative local cache of marker and review
//! records and of their per-tile version tokens. The synchronization engine
//! never touches records itself; it only asks the store for watermarks and
//! hands it pages, bundles and deletions to apply.
//!
//! Implementations must be safe to read from other threads while the engine
//! writes, and each write to a tile must become visible to readers all at once.
//!
//! [`MemoryTileStore`] is a reference implementation that counts records and
//! tracks watermarks without modelling record contents.

mod memory;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::coord::{BoundingBox, TileCoordinate};
use crate::sync::{EntityKind, LastUpdateInfo};

pub use memory::{MemoryTileStore, RECORD_WATERMARK_FIELD};

/// Result type for Tile Store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a Tile Store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An incremental page could not be understood.
    #[error("malformed {kind} page for tile {tile}: {reason}")]
    MalformedPage {
        tile: TileCoordinate,
        kind: EntityKind,
        reason: String,
    },

    /// An export bundle could not be understood.
    #[error("malformed bundle {path}: {reason}")]
    MalformedBundle { path: PathBuf, reason: String },

    /// The persisted store could not be encoded or decoded.
    #[error("store serialization failed: {0}")]
    Serialization(String),
}

/// Operations the synchronization engine needs from the local cache.
pub trait TileStore: Send + Sync {
    /// Watermarks of every locally known tile overlapping `bbox`.
    ///
    /// Returns an empty map when the store holds nothing in the box.
    fn last_update_info_in(
        &self,
        bbox: &BoundingBox,
    ) -> StoreResult<BTreeMap<TileCoordinate, LastUpdateInfo>>;

    /// Current watermarks of one tile; empty if the tile is unknown.
    fn last_update_info(&self, tile: TileCoordinate) -> StoreResult<LastUpdateInfo>;

    /// Apply one incremental page and return the number of records it held.
    ///
    /// Advances the tile's watermark for `kind` as a side effect.
    fn apply_incremental_page(
        &self,
        tile: TileCoordinate,
        kind: EntityKind,
        body: &str,
    ) -> StoreResult<usize>;

    /// Remove all local data of one kind for a tile.
    fn delete_tile(&self, tile: TileCoordinate, kind: EntityKind) -> StoreResult<()>;

    /// Install a decompressed export bundle for a tile.
    ///
    /// The store owns merge/replace semantics and resets both watermarks to
    /// the values implied by the bundle.
    fn install_bundle(&self, path: &Path, tile: TileCoordinate) -> StoreResult<()>;

    /// Schema/content version string sent with status requests.
    fn version(&self) -> String;
}
