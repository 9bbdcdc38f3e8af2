//! Tiles command - show which grid tiles an area covers.

use std::collections::BTreeSet;

use tilesync::config::ConfigFile;
use tilesync::coord::{tile_bounds, tiles_in_box, BoundingBox};

use crate::error::CliError;

/// Print each covered tile with its extent. Without `--box`, uses the
/// configured area.
pub fn run(boxes: &[BoundingBox]) -> Result<(), CliError> {
    let configured;
    let boxes = if boxes.is_empty() {
        configured = ConfigFile::load()?.boxes;
        configured.as_slice()
    } else {
        boxes
    };

    if boxes.is_empty() {
        return Err(CliError::Config(
            "No area given. Use --box or set area.boxes in config.ini.".to_string(),
        ));
    }

    let tiles: BTreeSet<_> = boxes.iter().flat_map(tiles_in_box).collect();
    for tile in &tiles {
        println!("{:<10} {}", tile.to_string(), tile_bounds(tile));
    }
    println!("{} tiles", tiles.len());
    Ok(())
}
