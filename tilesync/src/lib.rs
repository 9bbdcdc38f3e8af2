//! TileSync - tile synchronization engine for a marker and review cache
//!
//! Keeps a locally cached, spatially partitioned copy of points of interest
//! ("markers") and their reviews consistent with a remote service. The world
//! is split into a fixed 16×16 grid of tiles; for every tile in the area of
//! interest and each entity kind the engine either does nothing, pulls
//! incremental changes, replaces the tile with a verified bulk export, or
//! deletes it.
//!
//! The local cache itself is abstracted behind [`store::TileStore`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use tilesync::auth::FileTokenStore;
//! use tilesync::config::ConfigFile;
//! use tilesync::store::MemoryTileStore;
//! use tilesync::sync::SyncEngine;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigFile::load()?.to_sync_config();
//! let store = Arc::new(MemoryTileStore::load(&config.store_path())?);
//! let tokens = Arc::new(FileTokenStore::open(config.token_path())?);
//! let engine = SyncEngine::from_config(&config, store, tokens)?;
//! println!("{}", engine.run_cycle());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod area;
pub mod auth;
pub mod config;
pub mod coord;
pub mod error;
pub mod export;
pub mod logging;
pub mod scheduler;
pub mod store;
pub mod sync;

pub use error::{SyncError, SyncResult};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
