//! Coordinate conversion module
//!
//! Maps geographic coordinates onto the fixed 16×16 tile grid. The grid is
//! equirectangular: every tile spans 22.5° of longitude and 11.25° of
//! latitude, columns counted eastward from -180° and rows northward from -90°.

mod types;

pub use types::{
    BoundingBox, CoordError, GeoCoordinate, TileCoordinate, GRID_SIZE, MAX_LAT, MAX_LON, MIN_LAT,
    MIN_LON, TILE_COUNT,
};

/// Width of one tile in degrees of longitude.
pub const TILE_SPAN_LON: f64 = (MAX_LON - MIN_LON) / GRID_SIZE as f64;

/// Height of one tile in degrees of latitude.
pub const TILE_SPAN_LAT: f64 = (MAX_LAT - MIN_LAT) / GRID_SIZE as f64;

/// Column containing a longitude. The east edge (180°) belongs to the last column.
#[inline]
fn column_for(lon: f64) -> u8 {
    let col = ((lon - MIN_LON) / TILE_SPAN_LON).floor() as i64;
    col.clamp(0, GRID_SIZE as i64 - 1) as u8
}

/// Row containing a latitude. The north pole belongs to the last row.
#[inline]
fn row_for(lat: f64) -> u8 {
    let row = ((lat - MIN_LAT) / TILE_SPAN_LAT).floor() as i64;
    row.clamp(0, GRID_SIZE as i64 - 1) as u8
}

/// Converts a geographic coordinate to the tile containing it.
///
/// # Errors
///
/// Returns an error if latitude or longitude is out of range.
pub fn to_tile(lat: f64, lon: f64) -> Result<TileCoordinate, CoordError> {
    let geo = GeoCoordinate::new(lat, lon)?;
    TileCoordinate::new(column_for(geo.longitude), row_for(geo.latitude))
}

/// Returns every tile a bounding box overlaps, without duplicates, in
/// `TileCoordinate` order.
///
/// A box crossing the antimeridian covers the columns from its west edge to
/// the end of the grid plus the columns from the start of the grid to its
/// east edge.
pub fn tiles_in_box(bbox: &BoundingBox) -> Vec<TileCoordinate> {
    let south = row_for(bbox.south());
    let north = row_for(bbox.north());
    let west = column_for(bbox.west());
    let east = column_for(bbox.east());

    let columns: Vec<u8> = if bbox.wraps() {
        (west..GRID_SIZE).chain(0..=east).collect()
    } else {
        (west..=east).collect()
    };

    let mut tiles = Vec::with_capacity(columns.len() * (north.saturating_sub(south) as usize + 1));
    for y in south..=north {
        for &x in &columns {
            if let Ok(tile) = TileCoordinate::new(x, y) {
                tiles.push(tile);
            }
        }
    }
    tiles.sort();
    tiles.dedup();
    tiles
}

/// The geographic extent of a tile.
pub fn tile_bounds(tile: &TileCoordinate) -> BoundingBox {
    let west = MIN_LON + tile.x() as f64 * TILE_SPAN_LON;
    let south = MIN_LAT + tile.y() as f64 * TILE_SPAN_LAT;
    BoundingBox {
        southwest_corner: GeoCoordinate {
            latitude: south,
            longitude: west,
        },
        northeast_corner: GeoCoordinate {
            latitude: south + TILE_SPAN_LAT,
            longitude: west + TILE_SPAN_LON,
        },
    }
}
