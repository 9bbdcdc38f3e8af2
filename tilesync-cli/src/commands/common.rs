//! Helpers shared by the commands that touch the local cache.

use std::sync::Arc;

use tilesync::auth::FileTokenStore;
use tilesync::config::{ConfigFile, SyncConfig};
use tilesync::coord::BoundingBox;
use tilesync::store::MemoryTileStore;
use tracing::info;

use crate::error::CliError;

/// Everything a sync command needs, loaded from disk.
pub struct Workspace {
    pub config: SyncConfig,
    pub store: Arc<MemoryTileStore>,
    pub tokens: Arc<FileTokenStore>,
}

impl Workspace {
    /// Load configuration, the persisted store and the token file.
    ///
    /// Non-empty `boxes` replace the configured area of interest.
    pub fn open(boxes: Vec<BoundingBox>) -> Result<Self, CliError> {
        let mut config = ConfigFile::load()?.to_sync_config();
        if !boxes.is_empty() {
            config = config.with_boxes(boxes);
        }

        let store = MemoryTileStore::load(&config.store_path())?;
        let tokens = FileTokenStore::open(config.token_path())?;
        info!(
            data_dir = %config.data_dir.display(),
            tiles = store.tile_count(),
            "Opened local cache"
        );

        Ok(Self {
            config,
            store: Arc::new(store),
            tokens: Arc::new(tokens),
        })
    }

    /// Write the store back to its file.
    pub fn save(&self) -> Result<(), CliError> {
        self.store.save(&self.config.store_path())?;
        Ok(())
    }
}
