//! Remote decision resolution.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{LastUpdateInfo, TileDecision};
use crate::api::{SyncApi, SyncStatusEntry, SyncStatusRequest};
use crate::coord::{BoundingBox, TileCoordinate};
use crate::error::SyncResult;

/// Asks the service what each tile needs this cycle.
pub struct SyncStatusResolver {
    api: Arc<dyn SyncApi>,
}

impl SyncStatusResolver {
    pub fn new(api: Arc<dyn SyncApi>) -> Self {
        Self { api }
    }

    /// Resolve one decision per tile and entity kind.
    ///
    /// With no known tiles the area is bootstrapped: the service lists the
    /// tiles holding data in `boxes` and each is asked about with empty
    /// watermarks. Otherwise all known tiles go out in a single status call.
    /// `local_version` is the Tile Store's schema/content version.
    pub fn resolve(
        &self,
        local_version: &str,
        boxes: &[BoundingBox],
        tiles: &BTreeMap<TileCoordinate, LastUpdateInfo>,
    ) -> SyncResult<Vec<TileDecision>> {
        let requests: Vec<SyncStatusRequest> = if tiles.is_empty() {
            self.bootstrap_requests(boxes)?
        } else {
            tiles
                .iter()
                .map(|(tile, info)| SyncStatusRequest::new(*tile, info))
                .collect()
        };

        if requests.is_empty() {
            debug!("No tiles to resolve");
            return Ok(Vec::new());
        }

        let entries = self.api.sync_status(local_version, &requests)?;
        let decisions = decisions_from_entries(entries);
        debug!(
            requested = requests.len(),
            resolved = decisions.len(),
            "Resolved sync status"
        );
        Ok(decisions)
    }

    fn bootstrap_requests(&self, boxes: &[BoundingBox]) -> SyncResult<Vec<SyncStatusRequest>> {
        if boxes.is_empty() {
            return Ok(Vec::new());
        }

        let listed: BTreeSet<TileCoordinate> = self.api.list_tiles(boxes)?.into_iter().collect();
        info!(tiles = listed.len(), "Bootstrapping area of interest");
        Ok(listed.into_iter().map(SyncStatusRequest::bootstrap).collect())
    }
}

/// Convert status entries, dropping out-of-range tiles and repeats.
fn decisions_from_entries(entries: Vec<SyncStatusEntry>) -> Vec<TileDecision> {
    let mut seen = BTreeSet::new();
    let mut decisions = Vec::with_capacity(entries.len());

    for entry in entries {
        let tile = match entry.tile() {
            Ok(tile) => tile,
            Err(e) => {
                warn!(error = %e, "Dropping status entry");
                continue;
            }
        };
        if !seen.insert(tile) {
            warn!(tile = %tile, "Dropping duplicate status entry");
            continue;
        }
        decisions.push(TileDecision {
            tile,
            markers: entry.markers,
            reviews: entry.reviews,
        });
    }

    decisions
}
