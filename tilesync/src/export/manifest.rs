//! Export manifests and the batched manifest request.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::SyncApi;
use crate::coord::TileCoordinate;
use crate::error::SyncResult;
use crate::sync::TileDecision;

/// Where to download a tile's bundle and how to verify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportManifest {
    pub tile: TileCoordinate,
    pub download_url: String,
    /// Exact size of the compressed bundle in bytes.
    pub compressed_size: u64,
    /// Hex digest of the compressed bundle.
    pub checksum: String,
}

/// Tiles needing a bundle this cycle.
///
/// Bundles carry both entity kinds, so a tile marked for export by either
/// kind, or escalated by an incremental sync, appears once.
pub fn collect_export_set<'a>(
    decisions: impl IntoIterator<Item = &'a TileDecision>,
    escalated: impl IntoIterator<Item = TileCoordinate>,
) -> BTreeSet<TileCoordinate> {
    decisions
        .into_iter()
        .filter(|d| d.needs_export())
        .map(|d| d.tile)
        .chain(escalated)
        .collect()
}

/// Resolves download manifests for a batch of tiles in one remote call.
pub struct BulkExportFetcher {
    api: Arc<dyn SyncApi>,
}

impl BulkExportFetcher {
    pub fn new(api: Arc<dyn SyncApi>) -> Self {
        Self { api }
    }

    /// Fetch manifests for `tiles`.
    ///
    /// An empty set makes no remote call. Entries for tiles that were not
    /// requested are ignored, as are repeats of a tile already seen.
    pub fn fetch_manifests(
        &self,
        tiles: &BTreeSet<TileCoordinate>,
    ) -> SyncResult<BTreeMap<TileCoordinate, ExportManifest>> {
        if tiles.is_empty() {
            return Ok(BTreeMap::new());
        }

        let request: Vec<TileCoordinate> = tiles.iter().copied().collect();
        debug!(tiles = request.len(), "Requesting export manifests");
        let manifests = self.api.export_manifests(&request)?;

        let mut by_tile = BTreeMap::new();
        for manifest in manifests {
            if !tiles.contains(&manifest.tile) {
                warn!(tile = %manifest.tile, "Ignoring manifest for tile that was not requested");
                continue;
            }
            by_tile.entry(manifest.tile).or_insert(manifest);
        }
        Ok(by_tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        ApiError, ApiResult, IncrementalPage, SyncStatusEntry, SyncStatusRequest,
    };
    use crate::coord::BoundingBox;
    use crate::sync::{EntityKind, SyncDecision, VersionToken};
    use parking_lot::Mutex;

    fn tile(x: u8, y: u8) -> TileCoordinate {
        TileCoordinate::new(x, y).unwrap()
    }

    fn manifest(t: TileCoordinate) -> ExportManifest {
        ExportManifest {
            tile: t,
            download_url: format!("https://cdn.example/{}.gz", t.file_stem()),
            compressed_size: 10,
            checksum: "00".into(),
        }
    }

    /// Records export requests and answers with a fixed manifest list.
    struct ExportOnlyApi {
        response: ApiResult<Vec<ExportManifest>>,
        calls: Mutex<Vec<Vec<TileCoordinate>>>,
    }

    impl SyncApi for ExportOnlyApi {
        fn list_tiles(&self, _: &[BoundingBox]) -> ApiResult<Vec<TileCoordinate>> {
            unreachable!()
        }
        fn sync_status(
            &self,
            _: &str,
            _: &[SyncStatusRequest],
        ) -> ApiResult<Vec<SyncStatusEntry>> {
            unreachable!()
        }
        fn sync_incremental(
            &self,
            _: TileCoordinate,
            _: EntityKind,
            _: Option<&VersionToken>,
        ) -> ApiResult<IncrementalPage> {
            unreachable!()
        }
        fn export_manifests(&self, tiles: &[TileCoordinate]) -> ApiResult<Vec<ExportManifest>> {
            self.calls.lock().push(tiles.to_vec());
            self.response.clone()
        }
    }

    fn fetcher(response: ApiResult<Vec<ExportManifest>>) -> (BulkExportFetcher, Arc<ExportOnlyApi>) {
        let api = Arc::new(ExportOnlyApi {
            response,
            calls: Mutex::new(Vec::new()),
        });
        (BulkExportFetcher::new(api.clone()), api)
    }

    #[test]
    fn test_empty_set_makes_no_call() {
        let (fetcher, api) = fetcher(Ok(vec![]));
        let result = fetcher.fetch_manifests(&BTreeSet::new()).unwrap();
        assert!(result.is_empty());
        assert!(api.calls.lock().is_empty());
    }

    #[test]
    fn test_unrequested_entries_ignored() {
        let wanted = tile(1, 1);
        let (fetcher, api) = fetcher(Ok(vec![manifest(wanted), manifest(tile(9, 9))]));

        let result = fetcher.fetch_manifests(&BTreeSet::from([wanted])).unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.contains_key(&wanted));
        assert_eq!(api.calls.lock().as_slice(), &[vec![wanted]]);
    }

    #[test]
    fn test_call_failure_propagates() {
        let (fetcher, _) = fetcher(Err(ApiError::Status {
            endpoint: "export".into(),
            status: 500,
        }));
        assert!(fetcher.fetch_manifests(&BTreeSet::from([tile(0, 0)])).is_err());
    }

    #[test]
    fn test_collect_export_set_dedups_across_kinds() {
        let a = tile(2, 2);
        let b = tile(3, 3);
        let decisions = [
            TileDecision {
                tile: a,
                markers: SyncDecision::Export,
                reviews: SyncDecision::Export,
            },
            TileDecision {
                tile: b,
                markers: SyncDecision::Sync,
                reviews: SyncDecision::None,
            },
        ];

        let set = collect_export_set(&decisions, [a, b]);
        assert_eq!(set, BTreeSet::from([a, b]));

        let only_decided = collect_export_set(&decisions, []);
        assert_eq!(only_decided, BTreeSet::from([a]));
    }
}
