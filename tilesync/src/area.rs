//! The set of bounding boxes kept in sync.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::coord::{tiles_in_box, BoundingBox, TileCoordinate};

/// Bounding boxes shared between the engine and whoever edits them.
///
/// Readers take a snapshot and keep using it even if the boxes are replaced
/// meanwhile; a running cycle never sees a half-updated list.
#[derive(Debug, Default)]
pub struct AreaOfInterest {
    boxes: RwLock<Arc<Vec<BoundingBox>>>,
}

impl AreaOfInterest {
    pub fn new(boxes: Vec<BoundingBox>) -> Self {
        Self {
            boxes: RwLock::new(Arc::new(boxes)),
        }
    }

    /// Current boxes.
    pub fn snapshot(&self) -> Arc<Vec<BoundingBox>> {
        Arc::clone(&self.boxes.read())
    }

    /// Replace all boxes at once.
    pub fn replace(&self, boxes: Vec<BoundingBox>) {
        *self.boxes.write() = Arc::new(boxes);
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.read().is_empty()
    }

    /// Every tile overlapped by any box, without duplicates.
    pub fn tiles(&self) -> Vec<TileCoordinate> {
        let mut tiles: Vec<TileCoordinate> =
            self.snapshot().iter().flat_map(tiles_in_box).collect();
        tiles.sort();
        tiles.dedup();
        tiles
    }
}
