//! Scripted fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{Cursor, Read, Write};
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};
use parking_lot::Mutex;
use tempfile::TempDir;

use tilesync::api::{
    ApiError, ApiResult, BundleSource, IncrementalPage, SyncApi, SyncStatusEntry,
    SyncStatusRequest,
};
use tilesync::config::SyncConfig;
use tilesync::coord::{tiles_in_box, BoundingBox, TileCoordinate};
use tilesync::export::{ChecksumAlgorithm, ExportManifest};
use tilesync::store::{MemoryTileStore, RECORD_WATERMARK_FIELD};
use tilesync::sync::{EntityKind, SyncDecision, SyncEngine, VersionToken};

pub fn tile(x: u8, y: u8) -> TileCoordinate {
    TileCoordinate::new(x, y).unwrap()
}

/// Box covering only tile (4, 10).
pub fn miami_box() -> BoundingBox {
    BoundingBox::new(25.0, -81.0, 26.0, -80.0).unwrap()
}

pub fn miami() -> TileCoordinate {
    tile(4, 10)
}

/// Watermark of the `i`-th record in a backlog.
pub fn watermark(i: usize) -> String {
    format!("2024-01-01T00:00:{:06}Z", i)
}

/// JSON page body of records with the given watermarks.
pub fn page_body(watermarks: &[String]) -> String {
    let records: Vec<serde_json::Value> = watermarks
        .iter()
        .enumerate()
        .map(|(i, w)| serde_json::json!({ "id": i, (RECORD_WATERMARK_FIELD): w }))
        .collect();
    serde_json::Value::Array(records).to_string()
}

/// Every remote call the engine made, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListTiles,
    SyncStatus(Vec<SyncStatusRequest>),
    Incremental {
        tile: TileCoordinate,
        kind: EntityKind,
        cursor: Option<String>,
    },
    Export(Vec<TileCoordinate>),
}

/// In-memory stand-in for the synchronization service.
///
/// Each tile/kind holds a sorted backlog of record watermarks. Status
/// answers are derived from that backlog unless overridden, and incremental
/// pages return the records newer than the cursor.
pub struct FakeApi {
    pub page_size: usize,
    pub backlog: Mutex<BTreeMap<(TileCoordinate, EntityKind), Vec<String>>>,
    pub overrides: Mutex<BTreeMap<TileCoordinate, (SyncDecision, SyncDecision)>>,
    pub export_required: Mutex<BTreeSet<(TileCoordinate, EntityKind)>>,
    pub fixed_page: Mutex<Option<String>>,
    pub manifests: Mutex<Vec<ExportManifest>>,
    pub status_error: Mutex<Option<ApiError>>,
    pub incremental_error: Mutex<Option<ApiError>>,
    pub raw_status: Mutex<Option<Vec<SyncStatusEntry>>>,
    pub calls: Mutex<Vec<Call>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            page_size: 100,
            backlog: Mutex::new(BTreeMap::new()),
            overrides: Mutex::new(BTreeMap::new()),
            export_required: Mutex::new(BTreeSet::new()),
            fixed_page: Mutex::new(None),
            manifests: Mutex::new(Vec::new()),
            status_error: Mutex::new(None),
            incremental_error: Mutex::new(None),
            raw_status: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Put `count` records with increasing watermarks on the server.
    pub fn add_backlog(&self, tile: TileCoordinate, kind: EntityKind, count: usize) {
        let mut backlog = self.backlog.lock();
        let records = backlog.entry((tile, kind)).or_default();
        let start = records.len();
        records.extend((start..start + count).map(watermark));
    }

    pub fn set_decision(&self, tile: TileCoordinate, markers: SyncDecision, reviews: SyncDecision) {
        self.overrides.lock().insert(tile, (markers, reviews));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn incremental_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Incremental { .. }))
            .collect()
    }

    pub fn export_calls(&self) -> Vec<Vec<TileCoordinate>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Export(tiles) => Some(tiles),
                _ => None,
            })
            .collect()
    }

    fn pending(&self, tile: TileCoordinate, kind: EntityKind, token: Option<&VersionToken>) -> bool {
        self.backlog
            .lock()
            .get(&(tile, kind))
            .map(|records| {
                records
                    .iter()
                    .any(|w| token.map_or(true, |t| w.as_str() > t.as_str()))
            })
            .unwrap_or(false)
    }

    fn decide(&self, tile: TileCoordinate, kind: EntityKind, token: Option<&VersionToken>) -> SyncDecision {
        if self.export_required.lock().contains(&(tile, kind)) {
            SyncDecision::Export
        } else if self.pending(tile, kind, token) {
            SyncDecision::Sync
        } else {
            SyncDecision::None
        }
    }
}

impl SyncApi for FakeApi {
    fn list_tiles(&self, boxes: &[BoundingBox]) -> ApiResult<Vec<TileCoordinate>> {
        self.calls.lock().push(Call::ListTiles);
        let in_area: BTreeSet<TileCoordinate> = boxes.iter().flat_map(tiles_in_box).collect();
        let mut known: BTreeSet<TileCoordinate> =
            self.backlog.lock().keys().map(|(tile, _)| *tile).collect();
        known.extend(self.overrides.lock().keys().copied());
        Ok(known.intersection(&in_area).copied().collect())
    }

    fn sync_status(
        &self,
        _database_version: &str,
        requests: &[SyncStatusRequest],
    ) -> ApiResult<Vec<SyncStatusEntry>> {
        self.calls.lock().push(Call::SyncStatus(requests.to_vec()));
        if let Some(e) = self.status_error.lock().clone() {
            return Err(e);
        }
        if let Some(raw) = self.raw_status.lock().clone() {
            return Ok(raw);
        }

        let overrides = self.overrides.lock().clone();
        Ok(requests
            .iter()
            .map(|r| {
                let (markers, reviews) = overrides.get(&r.tile).copied().unwrap_or_else(|| {
                    (
                        self.decide(r.tile, EntityKind::Markers, r.marker_token.as_ref()),
                        self.decide(r.tile, EntityKind::Reviews, r.review_token.as_ref()),
                    )
                });
                SyncStatusEntry::new(r.tile, markers, reviews)
            })
            .collect())
    }

    fn sync_incremental(
        &self,
        tile: TileCoordinate,
        kind: EntityKind,
        cursor: Option<&VersionToken>,
    ) -> ApiResult<IncrementalPage> {
        self.calls.lock().push(Call::Incremental {
            tile,
            kind,
            cursor: cursor.map(|c| c.as_str().to_string()),
        });

        if let Some(e) = self.incremental_error.lock().clone() {
            return Err(e);
        }
        if self.export_required.lock().contains(&(tile, kind)) {
            return Ok(IncrementalPage::ExportRequired);
        }
        if let Some(body) = self.fixed_page.lock().clone() {
            return Ok(IncrementalPage::Page(body));
        }

        let page: Vec<String> = self
            .backlog
            .lock()
            .get(&(tile, kind))
            .map(|records| {
                records
                    .iter()
                    .filter(|w| cursor.map_or(true, |c| w.as_str() > c.as_str()))
                    .take(self.page_size)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(IncrementalPage::Page(page_body(&page)))
    }

    fn export_manifests(&self, tiles: &[TileCoordinate]) -> ApiResult<Vec<ExportManifest>> {
        self.calls.lock().push(Call::Export(tiles.to_vec()));
        Ok(self.manifests.lock().clone())
    }
}

/// Serves bundle bytes by URL.
#[derive(Default)]
pub struct FakeBundles {
    pub files: Mutex<HashMap<String, Vec<u8>>>,
    pub opened: Mutex<Vec<String>>,
}

impl FakeBundles {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, url: &str, bytes: Vec<u8>) {
        self.files.lock().insert(url.to_string(), bytes);
    }
}

impl BundleSource for FakeBundles {
    fn open(&self, url: &str) -> ApiResult<Box<dyn Read + Send>> {
        self.opened.lock().push(url.to_string());
        match self.files.lock().get(url) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(ApiError::Status {
                endpoint: url.to_string(),
                status: 404,
            }),
        }
    }
}

pub fn gzip(contents: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(contents).unwrap();
    encoder.finish().unwrap()
}

pub fn md5_hex(bytes: &[u8]) -> String {
    let mut hasher = ChecksumAlgorithm::Md5.hasher();
    hasher.update(bytes);
    hasher.finalize_hex()
}

/// Gzip of a bundle document whose compressed form is exactly `size` bytes,
/// padded through the gzip header's extra field.
pub fn bundle_of_size(markers: usize, reviews: usize, size: usize) -> Vec<u8> {
    let records = |n: usize| -> Vec<serde_json::Value> {
        (0..n)
            .map(|i| serde_json::json!({ "id": i, (RECORD_WATERMARK_FIELD): watermark(1_000 + i) }))
            .collect()
    };
    let doc = serde_json::json!({
        "markers": records(markers),
        "reviews": records(reviews),
    })
    .to_string();

    // The extra field costs two length bytes on top of its contents.
    let unpadded = gzip(doc.as_bytes()).len();
    assert!(unpadded + 2 <= size, "bundle needs at least {} bytes", unpadded + 2);

    let extra = vec![0u8; size - unpadded - 2];
    let mut encoder = GzBuilder::new()
        .extra(extra)
        .write(Vec::new(), Compression::default());
    encoder.write_all(doc.as_bytes()).unwrap();
    let bytes = encoder.finish().unwrap();
    assert_eq!(bytes.len(), size);
    bytes
}

/// A test environment: engine wired to fakes and a real in-memory store.
pub struct Harness {
    pub api: Arc<FakeApi>,
    pub bundles: Arc<FakeBundles>,
    pub store: Arc<MemoryTileStore>,
    pub engine: SyncEngine,
    pub temp: TempDir,
}

impl Harness {
    pub fn new(boxes: Vec<BoundingBox>) -> Self {
        Self::with_api(FakeApi::new(), boxes)
    }

    pub fn with_api(api: Arc<FakeApi>, boxes: Vec<BoundingBox>) -> Self {
        let temp = TempDir::new().unwrap();
        let config = SyncConfig::new(temp.path()).with_boxes(boxes);
        let bundles = FakeBundles::new();
        let store = Arc::new(MemoryTileStore::new());
        let engine = SyncEngine::new(&config, api.clone(), store.clone(), bundles.clone());
        Self {
            api,
            bundles,
            store,
            engine,
            temp,
        }
    }

    /// Publish a bundle for `tile` and its manifest.
    pub fn publish_export(&self, tile: TileCoordinate, bytes: &[u8], declared_size: u64, checksum: &str) {
        let url = format!("https://cdn.example/{}.gz", tile.file_stem());
        self.bundles.serve(&url, bytes.to_vec());
        self.api.manifests.lock().push(ExportManifest {
            tile,
            download_url: url,
            compressed_size: declared_size,
            checksum: checksum.to_string(),
        });
    }

    pub fn staging_is_empty(&self) -> bool {
        std::fs::read_dir(self.temp.path().join("staging"))
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }
}
