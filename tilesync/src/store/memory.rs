//! In-memory reference Tile Store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{StoreError, StoreResult, TileStore};
use crate::coord::{tiles_in_box, BoundingBox, TileCoordinate};
use crate::sync::{EntityKind, LastUpdateInfo, VersionToken};

/// Record field holding each record's modification watermark.
pub const RECORD_WATERMARK_FIELD: &str = "lastModified";

/// Default schema/content version reported by the store.
const DEFAULT_VERSION: &str = "1.0.0.0";

/// Per-kind state of one tile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct KindState {
    records: usize,
    token: Option<VersionToken>,
}

impl KindState {
    fn is_empty(&self) -> bool {
        self.records == 0 && self.token.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct TileRecord {
    markers: KindState,
    reviews: KindState,
}

impl TileRecord {
    fn kind(&self, kind: EntityKind) -> &KindState {
        match kind {
            EntityKind::Markers => &self.markers,
            EntityKind::Reviews => &self.reviews,
        }
    }

    fn kind_mut(&mut self, kind: EntityKind) -> &mut KindState {
        match kind {
            EntityKind::Markers => &mut self.markers,
            EntityKind::Reviews => &mut self.reviews,
        }
    }

    fn info(&self) -> LastUpdateInfo {
        LastUpdateInfo::new(self.markers.token.clone(), self.reviews.token.clone())
    }

    fn is_empty(&self) -> bool {
        self.markers.is_empty() && self.reviews.is_empty()
    }
}

/// On-disk form of the store.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStore {
    version: String,
    tiles: Vec<PersistedTile>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedTile {
    tile: TileCoordinate,
    record: TileRecord,
}

/// Decompressed export bundle contents.
#[derive(Debug, Deserialize)]
struct BundleDocument {
    #[serde(default)]
    markers: Vec<Value>,
    #[serde(default)]
    reviews: Vec<Value>,
}

/// Highest watermark found among `records`, if any.
fn max_watermark(records: &[Value]) -> Option<VersionToken> {
    records
        .iter()
        .filter_map(|r| r.get(RECORD_WATERMARK_FIELD))
        .filter_map(Value::as_str)
        .filter_map(VersionToken::new)
        .max()
}

/// Reference Tile Store holding per-tile record counts and watermarks.
///
/// Records are JSON objects; only their count and their
/// [`RECORD_WATERMARK_FIELD`] are retained. Every mutation happens under a
/// single write lock, so readers never observe a partially applied tile.
#[derive(Debug)]
pub struct MemoryTileStore {
    version: String,
    tiles: RwLock<BTreeMap<TileCoordinate, TileRecord>>,
}

impl Default for MemoryTileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTileStore {
    /// Create an empty store reporting the default version.
    pub fn new() -> Self {
        Self::with_version(DEFAULT_VERSION)
    }

    /// Create an empty store reporting `version`.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            tiles: RwLock::new(BTreeMap::new()),
        }
    }

    /// Load a store previously written by [`save`](Self::save).
    ///
    /// A missing file yields an empty store.
    pub fn load(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let contents = fs::read_to_string(path).map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let persisted: PersistedStore = serde_json::from_str(&contents)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tiles = persisted
            .tiles
            .into_iter()
            .map(|t| (t.tile, t.record))
            .collect();

        Ok(Self {
            version: persisted.version,
            tiles: RwLock::new(tiles),
        })
    }

    /// Persist the store as JSON, replacing `path` atomically.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let persisted = PersistedStore {
            version: self.version.clone(),
            tiles: self
                .tiles
                .read()
                .iter()
                .map(|(tile, record)| PersistedTile {
                    tile: *tile,
                    record: record.clone(),
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&persisted)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| StoreError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, path).map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Overwrite a tile's watermarks, creating the tile if needed.
    pub fn set_last_update_info(&self, tile: TileCoordinate, info: LastUpdateInfo) {
        let mut tiles = self.tiles.write();
        let record = tiles.entry(tile).or_default();
        record.markers.token = info.marker;
        record.reviews.token = info.review;
    }

    /// Number of records applied for one tile and kind.
    pub fn record_count(&self, tile: TileCoordinate, kind: EntityKind) -> usize {
        self.tiles
            .read()
            .get(&tile)
            .map(|r| r.kind(kind).records)
            .unwrap_or(0)
    }

    /// Number of tiles holding any data.
    pub fn tile_count(&self) -> usize {
        self.tiles.read().len()
    }

    /// All tiles holding any data, in coordinate order.
    pub fn tiles(&self) -> Vec<TileCoordinate> {
        self.tiles.read().keys().copied().collect()
    }
}

impl TileStore for MemoryTileStore {
    fn last_update_info_in(
        &self,
        bbox: &BoundingBox,
    ) -> StoreResult<BTreeMap<TileCoordinate, LastUpdateInfo>> {
        let tiles = self.tiles.read();
        Ok(tiles_in_box(bbox)
            .into_iter()
            .filter_map(|tile| tiles.get(&tile).map(|record| (tile, record.info())))
            .collect())
    }

    fn last_update_info(&self, tile: TileCoordinate) -> StoreResult<LastUpdateInfo> {
        Ok(self
            .tiles
            .read()
            .get(&tile)
            .map(TileRecord::info)
            .unwrap_or_default())
    }

    fn apply_incremental_page(
        &self,
        tile: TileCoordinate,
        kind: EntityKind,
        body: &str,
    ) -> StoreResult<usize> {
        let records: Vec<Value> =
            serde_json::from_str(body).map_err(|e| StoreError::MalformedPage {
                tile,
                kind,
                reason: e.to_string(),
            })?;
        if records.is_empty() {
            debug!(tile = %tile, kind = %kind, "Empty incremental page");
            return Ok(0);
        }
        let page_max = max_watermark(&records);

        let mut tiles = self.tiles.write();
        let state = tiles.entry(tile).or_default().kind_mut(kind);
        state.records += records.len();

        // Watermarks only move forward.
        if let Some(page_max) = page_max {
            let advances = match &state.token {
                Some(current) => page_max > *current,
                None => true,
            };
            if advances {
                state.token = Some(page_max);
            }
        }

        debug!(
            tile = %tile,
            kind = %kind,
            records = records.len(),
            token = ?state.token,
            "Applied incremental page"
        );

        Ok(records.len())
    }

    fn delete_tile(&self, tile: TileCoordinate, kind: EntityKind) -> StoreResult<()> {
        let mut tiles = self.tiles.write();
        if let Some(record) = tiles.get_mut(&tile) {
            *record.kind_mut(kind) = KindState::default();
            if record.is_empty() {
                tiles.remove(&tile);
            }
        }
        Ok(())
    }

    fn install_bundle(&self, path: &Path, tile: TileCoordinate) -> StoreResult<()> {
        let malformed = |reason: String| StoreError::MalformedBundle {
            path: PathBuf::from(path),
            reason,
        };

        let contents = fs::read_to_string(path).map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let bundle: BundleDocument =
            serde_json::from_str(&contents).map_err(|e| malformed(e.to_string()))?;

        let record = TileRecord {
            markers: KindState {
                records: bundle.markers.len(),
                token: max_watermark(&bundle.markers),
            },
            reviews: KindState {
                records: bundle.reviews.len(),
                token: max_watermark(&bundle.reviews),
            },
        };

        debug!(
            tile = %tile,
            markers = record.markers.records,
            reviews = record.reviews.records,
            "Installed bundle"
        );

        self.tiles.write().insert(tile, record);
        Ok(())
    }

    fn version(&self) -> String {
        self.version.clone()
    }
}
