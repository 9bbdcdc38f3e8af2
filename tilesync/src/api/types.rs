//! Wire types for the synchronization endpoints.

use serde::{Deserialize, Serialize};

use crate::coord::{CoordError, TileCoordinate};
use crate::sync::{LastUpdateInfo, SyncDecision, VersionToken};

/// One entry of a status request: a tile and its local watermarks.
///
/// Missing watermarks are sent as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatusRequest {
    #[serde(flatten)]
    pub tile: TileCoordinate,
    #[serde(rename = "poiDateLastModified")]
    pub marker_token: Option<VersionToken>,
    #[serde(rename = "reviewDateLastModified")]
    pub review_token: Option<VersionToken>,
}

impl SyncStatusRequest {
    pub fn new(tile: TileCoordinate, info: &LastUpdateInfo) -> Self {
        Self {
            tile,
            marker_token: info.marker.clone(),
            review_token: info.review.clone(),
        }
    }

    /// A request for a tile with no local data.
    pub fn bootstrap(tile: TileCoordinate) -> Self {
        Self::new(tile, &LastUpdateInfo::default())
    }
}

/// One entry of a status response.
///
/// The tile is kept as raw integers so an out-of-range entry can be dropped
/// on its own instead of failing the whole response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatusEntry {
    #[serde(rename = "tileX")]
    pub tile_x: i64,
    #[serde(rename = "tileY")]
    pub tile_y: i64,
    #[serde(rename = "poiUpdateType", default)]
    pub markers: SyncDecision,
    #[serde(rename = "reviewUpdateType", default)]
    pub reviews: SyncDecision,
}

impl SyncStatusEntry {
    pub fn new(tile: TileCoordinate, markers: SyncDecision, reviews: SyncDecision) -> Self {
        Self {
            tile_x: tile.x() as i64,
            tile_y: tile.y() as i64,
            markers,
            reviews,
        }
    }

    pub fn tile(&self) -> Result<TileCoordinate, CoordError> {
        TileCoordinate::from_wire(self.tile_x, self.tile_y)
    }
}

/// Result of one incremental request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncrementalPage {
    /// A page of records, passed to the Tile Store unparsed.
    Page(String),
    /// The server answered "too stale": only a full export can catch up.
    ExportRequired,
}

/// Tile entry in list and export responses.
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct RawTile {
    #[serde(rename = "tileX")]
    pub tile_x: i64,
    #[serde(rename = "tileY")]
    pub tile_y: i64,
}

impl RawTile {
    pub fn tile(&self) -> Result<TileCoordinate, CoordError> {
        TileCoordinate::from_wire(self.tile_x, self.tile_y)
    }
}

/// Compressed bundle description inside an export response entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireBundle {
    pub url: String,
    pub file_size: u64,
    pub md5_hash: String,
}

/// One entry of an export response: `{tileX, tileY, gzip: {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireExportEntry {
    #[serde(flatten)]
    pub tile: RawTile,
    pub gzip: WireBundle,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(x: u8, y: u8) -> TileCoordinate {
        TileCoordinate::new(x, y).unwrap()
    }

    #[test]
    fn test_status_request_serializes_null_tokens() {
        let request = SyncStatusRequest::bootstrap(tile(3, 4));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "tileX": 3,
                "tileY": 4,
                "poiDateLastModified": null,
                "reviewDateLastModified": null
            })
        );
    }

    #[test]
    fn test_status_request_carries_tokens() {
        let info = LastUpdateInfo::new(
            VersionToken::new("2024-01-01T00:00:00Z"),
            VersionToken::new("2024-02-01T00:00:00Z"),
        );
        let value = serde_json::to_value(SyncStatusRequest::new(tile(1, 2), &info)).unwrap();
        assert_eq!(value["poiDateLastModified"], "2024-01-01T00:00:00Z");
        assert_eq!(value["reviewDateLastModified"], "2024-02-01T00:00:00Z");
    }

    #[test]
    fn test_status_entry_decodes_and_validates() {
        let entries: Vec<SyncStatusEntry> = serde_json::from_str(
            r#"[
                {"tileX": 4, "tileY": 10, "poiUpdateType": "sync", "reviewUpdateType": "Export"},
                {"tileX": 99, "tileY": 0, "poiUpdateType": "None"}
            ]"#,
        )
        .unwrap();

        assert_eq!(entries[0].tile().unwrap(), tile(4, 10));
        assert_eq!(entries[0].markers, SyncDecision::Sync);
        assert_eq!(entries[0].reviews, SyncDecision::Export);
        assert!(entries[1].tile().is_err());
        assert_eq!(entries[1].reviews, SyncDecision::None);
    }

    #[test]
    fn test_export_entry_decodes() {
        let entry: WireExportEntry = serde_json::from_str(
            r#"{"tileX": 2, "tileY": 5, "gzip": {"url": "https://cdn/x.gz", "fileSize": 2048, "md5Hash": "ABCD"}}"#,
        )
        .unwrap();
        assert_eq!(entry.tile.tile().unwrap(), tile(2, 5));
        assert_eq!(entry.gzip.file_size, 2048);
        assert_eq!(entry.gzip.md5_hash, "ABCD");
    }
}
