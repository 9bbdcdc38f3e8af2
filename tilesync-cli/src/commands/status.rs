//! Status command - summarize the local cache.

use tilesync::config::ConfigFile;
use tilesync::store::{MemoryTileStore, TileStore};
use tilesync::sync::EntityKind;

use crate::error::CliError;

/// Print record counts and watermarks for every cached tile.
pub fn run() -> Result<(), CliError> {
    let config = ConfigFile::load()?.to_sync_config();
    let path = config.store_path();
    let store = MemoryTileStore::load(&path)?;

    println!("Store: {}", path.display());
    println!("Version: {}", store.version());
    println!();

    let tiles = store.tiles();
    if tiles.is_empty() {
        println!("No cached tiles.");
        return Ok(());
    }

    println!(
        "{:<10} {:>8} {:>8}  {:<26} {:<26}",
        "TILE", "MARKERS", "REVIEWS", "MARKER TOKEN", "REVIEW TOKEN"
    );
    for tile in tiles {
        let info = store.last_update_info(tile)?;
        println!(
            "{:<10} {:>8} {:>8}  {:<26} {:<26}",
            tile.to_string(),
            store.record_count(tile, EntityKind::Markers),
            store.record_count(tile, EntityKind::Reviews),
            token_or_dash(info.token(EntityKind::Markers)),
            token_or_dash(info.token(EntityKind::Reviews)),
        );
    }
    println!();
    println!("{} tiles", store.tile_count());
    Ok(())
}

fn token_or_dash(token: Option<&tilesync::sync::VersionToken>) -> &str {
    token.map(|t| t.as_str()).unwrap_or("-")
}
