//! Cursor-paginated incremental catch-up for one tile and entity kind.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{EntityKind, SyncOutcome, VersionToken};
use crate::api::{IncrementalPage, SyncApi};
use crate::coord::TileCoordinate;
use crate::store::TileStore;

/// Records per incremental page. A shorter page means the backlog is drained.
pub const SYNC_PAGE_SIZE: usize = 100;

/// Pulls pages of changes until a tile and kind are caught up.
pub struct IncrementalSyncer {
    api: Arc<dyn SyncApi>,
    store: Arc<dyn TileStore>,
    page_size: usize,
}

impl IncrementalSyncer {
    pub fn new(api: Arc<dyn SyncApi>, store: Arc<dyn TileStore>) -> Self {
        Self::with_page_size(api, store, SYNC_PAGE_SIZE)
    }

    pub fn with_page_size(
        api: Arc<dyn SyncApi>,
        store: Arc<dyn TileStore>,
        page_size: usize,
    ) -> Self {
        Self {
            api,
            store,
            page_size,
        }
    }

    /// Catch up `kind` in `tile`.
    ///
    /// The cursor is re-read from the store before every request. If it has
    /// not moved since the previous request the loop stops with the last
    /// result, so a page that fails to advance the watermark cannot spin.
    /// Nothing is retried; a failure ends the call with
    /// [`SyncOutcome::Fail`].
    pub fn sync_entity(&self, tile: TileCoordinate, kind: EntityKind) -> SyncOutcome {
        // `None` until the first request; `Some(None)` is a request without cursor.
        let mut previous: Option<Option<VersionToken>> = None;
        let mut pages = 0usize;
        let mut records = 0usize;

        loop {
            let cursor = match self.store.last_update_info(tile) {
                Ok(info) => info.token(kind).cloned(),
                Err(e) => {
                    warn!(tile = %tile, kind = %kind, error = %e, "Failed to read watermark");
                    return SyncOutcome::Fail;
                }
            };

            if previous.as_ref() == Some(&cursor) {
                warn!(
                    tile = %tile,
                    kind = %kind,
                    cursor = ?cursor,
                    "Watermark did not advance, stopping"
                );
                return SyncOutcome::Success;
            }

            let page = self.api.sync_incremental(tile, kind, cursor.as_ref());
            previous = Some(cursor);

            let body = match page {
                Ok(IncrementalPage::Page(body)) => body,
                Ok(IncrementalPage::ExportRequired) => {
                    debug!(tile = %tile, kind = %kind, "Escalating to export");
                    return SyncOutcome::ExportRequired;
                }
                Err(e) => {
                    warn!(tile = %tile, kind = %kind, error = %e, "Incremental request failed");
                    return SyncOutcome::Fail;
                }
            };

            let count = match self.store.apply_incremental_page(tile, kind, &body) {
                Ok(count) => count,
                Err(e) => {
                    warn!(tile = %tile, kind = %kind, error = %e, "Failed to apply page");
                    return SyncOutcome::Fail;
                }
            };

            pages += 1;
            records += count;
            debug!(tile = %tile, kind = %kind, page = pages, records = count, "Applied page");

            if count != self.page_size {
                debug!(tile = %tile, kind = %kind, pages, records, "Caught up");
                return SyncOutcome::Success;
            }
        }
    }
}
