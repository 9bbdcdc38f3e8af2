//! Tile synchronization engine.
//!
//! A cycle runs in four steps:
//!
//! 1. [`TileStateTracker`] reads the local watermarks of every tile in the
//!    area of interest.
//! 2. [`SyncStatusResolver`] asks the service what to do with each tile and
//!    entity kind.
//! 3. [`SyncEngine`] dispatches each decision, running [`IncrementalSyncer`]
//!    for incremental catch-up and deleting tiles the service dropped.
//! 4. Tiles needing a full snapshot are exported in one batch through
//!    [`BulkExportFetcher`](crate::export::BulkExportFetcher) and
//!    [`IntegrityVerifyingDownloader`](crate::export::IntegrityVerifyingDownloader).

mod engine;
mod incremental;
mod resolver;
mod tracker;
mod types;

pub use engine::{CycleReport, SyncEngine, TileFailure};
pub use incremental::{IncrementalSyncer, SYNC_PAGE_SIZE};
pub use resolver::SyncStatusResolver;
pub use tracker::TileStateTracker;
pub use types::{
    EntityKind, LastUpdateInfo, SyncDecision, SyncOutcome, TileDecision, VersionToken,
};
