//! Local tile state lookup.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::LastUpdateInfo;
use crate::coord::{BoundingBox, TileCoordinate};
use crate::error::SyncResult;
use crate::store::TileStore;

/// Finds the locally known tiles of an area and their watermarks.
pub struct TileStateTracker {
    store: Arc<dyn TileStore>,
}

impl TileStateTracker {
    pub fn new(store: Arc<dyn TileStore>) -> Self {
        Self { store }
    }

    /// Union of the tiles known to the store within `boxes`.
    ///
    /// Overlapping boxes contribute each tile once; the first box to report a
    /// tile wins. An empty result means nothing is cached yet and the caller
    /// should bootstrap, so a store read failure on any box is returned as an
    /// error rather than being mistaken for an empty area.
    pub fn resolve_tiles(
        &self,
        boxes: &[BoundingBox],
    ) -> SyncResult<BTreeMap<TileCoordinate, LastUpdateInfo>> {
        let mut tiles = BTreeMap::new();

        for bbox in boxes {
            let found = self.store.last_update_info_in(bbox).map_err(|e| {
                warn!(bbox = %bbox, error = %e, "Failed to read local tiles for box");
                e
            })?;
            for (tile, info) in found {
                tiles.entry(tile).or_insert(info);
            }
        }

        debug!(boxes = boxes.len(), tiles = tiles.len(), "Resolved local tiles");
        Ok(tiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTileStore;
    use crate::sync::VersionToken;

    fn tile(x: u8, y: u8) -> TileCoordinate {
        TileCoordinate::new(x, y).unwrap()
    }

    #[test]
    fn test_empty_store_yields_empty_map() {
        let tracker = TileStateTracker::new(Arc::new(MemoryTileStore::new()));
        let tiles = tracker.resolve_tiles(&[BoundingBox::world()]).unwrap();
        assert!(tiles.is_empty());
    }

    #[test]
    fn test_overlapping_boxes_union_without_duplicates() {
        let store = Arc::new(MemoryTileStore::new());
        let miami = tile(4, 10);
        let east = tile(5, 10);
        store.set_last_update_info(miami, LastUpdateInfo::new(VersionToken::new("m1"), None));
        store.set_last_update_info(east, LastUpdateInfo::new(None, VersionToken::new("r1")));

        let tracker = TileStateTracker::new(store);
        let boxes = [
            BoundingBox::new(24.0, -82.0, 26.0, -80.0).unwrap(),
            BoundingBox::new(25.0, -81.0, 27.0, -60.0).unwrap(),
        ];
        let tiles = tracker.resolve_tiles(&boxes).unwrap();

        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[&miami].marker.as_ref().unwrap().as_str(), "m1");
        assert_eq!(tiles[&east].review.as_ref().unwrap().as_str(), "r1");
    }

    struct UnreadableStore(MemoryTileStore);

    impl TileStore for UnreadableStore {
        fn last_update_info_in(
            &self,
            _bbox: &BoundingBox,
        ) -> crate::store::StoreResult<BTreeMap<TileCoordinate, LastUpdateInfo>> {
            Err(crate::store::StoreError::Serialization("disk unreadable".into()))
        }

        fn last_update_info(
            &self,
            tile: TileCoordinate,
        ) -> crate::store::StoreResult<LastUpdateInfo> {
            self.0.last_update_info(tile)
        }

        fn apply_incremental_page(
            &self,
            tile: TileCoordinate,
            kind: crate::sync::EntityKind,
            body: &str,
        ) -> crate::store::StoreResult<usize> {
            self.0.apply_incremental_page(tile, kind, body)
        }

        fn delete_tile(
            &self,
            tile: TileCoordinate,
            kind: crate::sync::EntityKind,
        ) -> crate::store::StoreResult<()> {
            self.0.delete_tile(tile, kind)
        }

        fn install_bundle(
            &self,
            path: &std::path::Path,
            tile: TileCoordinate,
        ) -> crate::store::StoreResult<()> {
            self.0.install_bundle(path, tile)
        }

        fn version(&self) -> String {
            self.0.version()
        }
    }

    #[test]
    fn test_store_read_failure_is_an_error_not_an_empty_area() {
        let tracker = TileStateTracker::new(Arc::new(UnreadableStore(MemoryTileStore::new())));
        let result = tracker.resolve_tiles(&[BoundingBox::world()]);
        assert!(matches!(result, Err(crate::SyncError::Store(_))));
    }
}
