//! Cycle orchestration and per-tile dispatch.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::{
    EntityKind, IncrementalSyncer, SyncDecision, SyncOutcome, SyncStatusResolver,
    TileDecision, TileStateTracker,
};
use crate::api::{BundleSource, HttpBundleSource, HttpSyncApi, SyncApi};
use crate::area::AreaOfInterest;
use crate::auth::TokenStore;
use crate::config::SyncConfig;
use crate::coord::{BoundingBox, TileCoordinate};
use crate::error::SyncResult;
use crate::export::{
    collect_export_set, BulkExportFetcher, ExportFailure, IntegrityVerifyingDownloader,
};
use crate::store::TileStore;

/// A tile (and kind, where it applies) that did not complete this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileFailure {
    pub tile: TileCoordinate,
    /// `None` for failures of the export path, which covers both kinds.
    pub kind: Option<EntityKind>,
    pub reason: String,
}

/// Summary of one synchronization cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Tiles that received a decision.
    pub tiles: usize,
    /// Tile/kind pairs with nothing to do.
    pub unchanged: usize,
    /// Tile/kind pairs caught up incrementally.
    pub synced: usize,
    /// Tile/kind pairs deleted locally.
    pub deleted: usize,
    /// Tile/kind pairs escalated from incremental to export.
    pub escalated: usize,
    /// Tiles whose export bundle was installed.
    pub exported: usize,
    pub failures: Vec<TileFailure>,
    /// Why the cycle stopped before dispatch, if it did.
    pub aborted: Option<String>,
    /// Wall-clock start of the cycle.
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed: Duration,
}

impl CycleReport {
    /// True when nothing failed and the cycle ran to completion.
    pub fn is_clean(&self) -> bool {
        self.aborted.is_none() && self.failures.is_empty()
    }

    fn fail(&mut self, tile: TileCoordinate, kind: Option<EntityKind>, reason: impl Into<String>) {
        self.failures.push(TileFailure {
            tile,
            kind,
            reason: reason.into(),
        });
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(reason) = &self.aborted {
            return write!(f, "cycle aborted: {}", reason);
        }
        write!(
            f,
            "{} tiles: {} synced, {} unchanged, {} deleted, {} exported ({} escalated), {} failed in {:.1}s",
            self.tiles,
            self.synced,
            self.unchanged,
            self.deleted,
            self.exported,
            self.escalated,
            self.failures.len(),
            self.elapsed.as_secs_f64()
        )
    }
}

/// Runs synchronization cycles over the area of interest.
///
/// All collaborators are injected; [`SyncEngine::from_config`] wires the
/// HTTP implementations.
pub struct SyncEngine {
    store: Arc<dyn TileStore>,
    area: Arc<AreaOfInterest>,
    tracker: TileStateTracker,
    resolver: SyncStatusResolver,
    syncer: IncrementalSyncer,
    fetcher: BulkExportFetcher,
    downloader: IntegrityVerifyingDownloader,
}

impl SyncEngine {
    pub fn new(
        config: &SyncConfig,
        api: Arc<dyn SyncApi>,
        store: Arc<dyn TileStore>,
        bundles: Arc<dyn BundleSource>,
    ) -> Self {
        Self {
            area: Arc::new(AreaOfInterest::new(config.boxes.clone())),
            tracker: TileStateTracker::new(store.clone()),
            resolver: SyncStatusResolver::new(api.clone()),
            syncer: IncrementalSyncer::with_page_size(api.clone(), store.clone(), config.page_size),
            fetcher: BulkExportFetcher::new(api),
            downloader: IntegrityVerifyingDownloader::new(
                bundles,
                store.clone(),
                config.staging_dir(),
                config.checksum,
            ),
            store,
        }
    }

    /// Build an engine talking to the configured service over HTTPS.
    pub fn from_config(
        config: &SyncConfig,
        store: Arc<dyn TileStore>,
        tokens: Arc<dyn TokenStore>,
    ) -> SyncResult<Self> {
        config.validate()?;
        let api = HttpSyncApi::new(
            config.api_base_url.clone(),
            config.api_key.clone(),
            tokens,
            config.timeout,
        )?;
        let bundles = HttpBundleSource::new(config.timeout, config.download_timeout)?;
        Ok(Self::new(config, Arc::new(api), store, Arc::new(bundles)))
    }

    /// The bounding boxes synchronized by this engine. Replacing them takes
    /// effect on the next cycle.
    pub fn area(&self) -> &Arc<AreaOfInterest> {
        &self.area
    }

    /// Run one full cycle.
    ///
    /// Per-tile failures are collected in the report and never stop the
    /// cycle. Failing to resolve decisions aborts it before any tile is
    /// touched.
    pub fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        let boxes = self.area.snapshot();
        if boxes.is_empty() {
            info!("No area of interest configured, skipping cycle");
            return report;
        }

        let decisions = match self.resolve(&boxes) {
            Ok(decisions) => decisions,
            Err(e) => {
                error!(error = %e, "Sync cycle aborted");
                report.aborted = Some(e.to_string());
                report.elapsed = started.elapsed();
                return report;
            }
        };
        report.tiles = decisions.len();

        let mut escalated = BTreeSet::new();
        for decision in &decisions {
            self.dispatch(decision, &mut escalated, &mut report);
        }

        let exports = collect_export_set(&decisions, escalated);
        self.run_exports(&exports, &mut report);

        report.elapsed = started.elapsed();
        info!(
            tiles = report.tiles,
            synced = report.synced,
            unchanged = report.unchanged,
            deleted = report.deleted,
            exported = report.exported,
            failed = report.failures.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Sync cycle complete"
        );
        report
    }

    fn resolve(&self, boxes: &[BoundingBox]) -> SyncResult<Vec<TileDecision>> {
        let known = self.tracker.resolve_tiles(boxes)?;
        self.resolver.resolve(&self.store.version(), boxes, &known)
    }

    /// Apply one tile's decisions, markers first.
    fn dispatch(
        &self,
        decision: &TileDecision,
        escalated: &mut BTreeSet<TileCoordinate>,
        report: &mut CycleReport,
    ) {
        let tile = decision.tile;

        for kind in EntityKind::ALL {
            match decision.decision(kind) {
                SyncDecision::None => report.unchanged += 1,
                // Collected into the export batch after dispatch.
                SyncDecision::Export => {}
                SyncDecision::Delete => match self.store.delete_tile(tile, kind) {
                    Ok(()) => {
                        info!(tile = %tile, kind = %kind, "Deleted local data");
                        report.deleted += 1;
                    }
                    Err(e) => {
                        warn!(tile = %tile, kind = %kind, error = %e, "Delete failed");
                        report.fail(tile, Some(kind), e.to_string());
                    }
                },
                SyncDecision::Sync => match self.syncer.sync_entity(tile, kind) {
                    SyncOutcome::Success => report.synced += 1,
                    SyncOutcome::Fail => report.fail(tile, Some(kind), "incremental sync failed"),
                    SyncOutcome::ExportRequired => {
                        report.escalated += 1;
                        escalated.insert(tile);
                    }
                },
            }
        }
    }

    fn run_exports(&self, tiles: &BTreeSet<TileCoordinate>, report: &mut CycleReport) {
        if tiles.is_empty() {
            return;
        }

        let manifests = match self.fetcher.fetch_manifests(tiles) {
            Ok(manifests) => manifests,
            Err(e) => {
                warn!(tiles = tiles.len(), error = %e, "Export manifest request failed");
                for tile in tiles {
                    report.fail(*tile, None, e.to_string());
                }
                return;
            }
        };

        for tile in tiles {
            let result = match manifests.get(tile) {
                Some(manifest) => self.downloader.install_export(*tile, manifest),
                None => Err(ExportFailure::MissingManifest { tile: *tile }),
            };

            match result {
                Ok(_) => report.exported += 1,
                Err(e) => {
                    warn!(tile = %tile, error = %e, "Export not installed");
                    report.fail(*tile, None, e.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(x: u8, y: u8) -> TileCoordinate {
        TileCoordinate::new(x, y).unwrap()
    }

    #[test]
    fn test_report_display() {
        let mut report = CycleReport {
            tiles: 3,
            synced: 2,
            unchanged: 3,
            exported: 1,
            ..Default::default()
        };
        assert!(report.is_clean());
        assert!(report.to_string().starts_with("3 tiles: 2 synced, 3 unchanged"));

        report.fail(tile(1, 1), Some(EntityKind::Reviews), "boom");
        assert!(!report.is_clean());

        report.aborted = Some("status call failed".into());
        assert_eq!(report.to_string(), "cycle aborted: status call failed");
    }
}
