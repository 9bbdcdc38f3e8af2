//! Coordinate types for the tile grid.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of tiles along each axis of the world grid.
pub const GRID_SIZE: u8 = 16;

/// Total number of tiles in the world grid.
pub const TILE_COUNT: usize = GRID_SIZE as usize * GRID_SIZE as usize;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;

/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;

/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;

/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Errors produced while building coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Tile index outside `0..GRID_SIZE`.
    #[error("tile coordinate out of range: ({x}, {y})")]
    TileOutOfRange { x: i64, y: i64 },

    /// Latitude outside [-90, 90].
    #[error("invalid latitude: {0}")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180].
    #[error("invalid longitude: {0}")]
    InvalidLongitude(f64),

    /// South edge lies north of the north edge.
    #[error("bounding box south edge {south} is north of north edge {north}")]
    InvertedBox { south: f64, north: f64 },

    /// Bounding box text could not be parsed.
    #[error("invalid bounding box '{0}': expected south,west,north,east")]
    Parse(String),
}

/// One cell of the fixed 16×16 world partition.
///
/// `x` grows eastward from the antimeridian, `y` grows northward from the
/// south pole. Both are always in `0..16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "WireTile", into = "WireTile")]
pub struct TileCoordinate {
    x: u8,
    y: u8,
}

impl TileCoordinate {
    /// Create a tile coordinate, rejecting indices outside the grid.
    pub fn new(x: u8, y: u8) -> Result<Self, CoordError> {
        if x >= GRID_SIZE || y >= GRID_SIZE {
            return Err(CoordError::TileOutOfRange {
                x: x as i64,
                y: y as i64,
            });
        }
        Ok(Self { x, y })
    }

    /// Create a tile coordinate from wire integers, which may be negative or
    /// otherwise out of range.
    pub fn from_wire(x: i64, y: i64) -> Result<Self, CoordError> {
        let out_of_range = || CoordError::TileOutOfRange { x, y };
        let col = u8::try_from(x).map_err(|_| out_of_range())?;
        let row = u8::try_from(y).map_err(|_| out_of_range())?;
        TileCoordinate::new(col, row).map_err(|_| out_of_range())
    }

    /// Column index (0 = westernmost).
    #[inline]
    pub fn x(&self) -> u8 {
        self.x
    }

    /// Row index (0 = southernmost).
    #[inline]
    pub fn y(&self) -> u8 {
        self.y
    }

    /// Iterate over all 256 tiles in row-major order.
    pub fn all() -> impl Iterator<Item = TileCoordinate> {
        (0..GRID_SIZE).flat_map(|y| (0..GRID_SIZE).map(move |x| TileCoordinate { x, y }))
    }

    /// Stem used for per-tile file names, e.g. `tile_7_3`.
    pub fn file_stem(&self) -> String {
        format!("tile_{}_{}", self.x, self.y)
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Wire form of a tile: `{"tileX": 7, "tileY": 3}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireTile {
    tile_x: i64,
    tile_y: i64,
}

impl TryFrom<WireTile> for TileCoordinate {
    type Error = CoordError;

    fn try_from(wire: WireTile) -> Result<Self, Self::Error> {
        TileCoordinate::from_wire(wire.tile_x, wire.tile_y)
    }
}

impl From<TileCoordinate> for WireTile {
    fn from(tile: TileCoordinate) -> Self {
        Self {
            tile_x: tile.x as i64,
            tile_y: tile.y as i64,
        }
    }
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    /// Create a validated coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordError> {
        if !(MIN_LAT..=MAX_LAT).contains(&latitude) {
            return Err(CoordError::InvalidLatitude(latitude));
        }
        if !(MIN_LON..=MAX_LON).contains(&longitude) {
            return Err(CoordError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// A geographic rectangle selecting tiles of interest.
///
/// A box whose west edge is east of its east edge crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub southwest_corner: GeoCoordinate,
    pub northeast_corner: GeoCoordinate,
}

impl BoundingBox {
    /// Create a bounding box from its edges in degrees.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self, CoordError> {
        if south > north {
            return Err(CoordError::InvertedBox { south, north });
        }
        Ok(Self {
            southwest_corner: GeoCoordinate::new(south, west)?,
            northeast_corner: GeoCoordinate::new(north, east)?,
        })
    }

    /// The whole world.
    pub fn world() -> Self {
        Self {
            southwest_corner: GeoCoordinate {
                latitude: MIN_LAT,
                longitude: MIN_LON,
            },
            northeast_corner: GeoCoordinate {
                latitude: MAX_LAT,
                longitude: MAX_LON,
            },
        }
    }

    pub fn south(&self) -> f64 {
        self.southwest_corner.latitude
    }

    pub fn west(&self) -> f64 {
        self.southwest_corner.longitude
    }

    pub fn north(&self) -> f64 {
        self.northeast_corner.latitude
    }

    pub fn east(&self) -> f64 {
        self.northeast_corner.longitude
    }

    /// Whether this box crosses the antimeridian.
    pub fn wraps(&self) -> bool {
        self.west() > self.east()
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.south(),
            self.west(),
            self.north(),
            self.east()
        )
    }
}

impl FromStr for BoundingBox {
    type Err = CoordError;

    /// Parse `south,west,north,east`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| CoordError::Parse(s.to_string()))?;

        match parts.as_slice() {
            [south, west, north, east] => BoundingBox::new(*south, *west, *north, *east),
            _ => Err(CoordError::Parse(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_new_rejects_out_of_range() {
        assert!(TileCoordinate::new(15, 15).is_ok());
        assert_eq!(
            TileCoordinate::new(16, 0),
            Err(CoordError::TileOutOfRange { x: 16, y: 0 })
        );
        assert!(TileCoordinate::new(0, 16).is_err());
    }

    #[test]
    fn test_all_tiles_unique_and_complete() {
        let tiles: std::collections::HashSet<_> = TileCoordinate::all().collect();
        assert_eq!(tiles.len(), TILE_COUNT);
    }

    #[test]
    fn test_tile_wire_format() {
        let tile = TileCoordinate::new(7, 3).unwrap();
        let json = serde_json::to_string(&tile).unwrap();
        assert_eq!(json, r#"{"tileX":7,"tileY":3}"#);

        let back: TileCoordinate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tile);
    }

    #[test]
    fn test_tile_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<TileCoordinate>(r#"{"tileX":16,"tileY":0}"#).is_err());
        assert!(serde_json::from_str::<TileCoordinate>(r#"{"tileX":-1,"tileY":0}"#).is_err());
    }

    #[test]
    fn test_bounding_box_wire_format() {
        let bbox = BoundingBox::new(10.0, 20.0, 30.0, 40.0).unwrap();
        let value = serde_json::to_value(bbox).unwrap();
        assert_eq!(value["southwestCorner"]["latitude"], 10.0);
        assert_eq!(value["southwestCorner"]["longitude"], 20.0);
        assert_eq!(value["northeastCorner"]["latitude"], 30.0);
        assert_eq!(value["northeastCorner"]["longitude"], 40.0);
    }

    #[test]
    fn test_bounding_box_validation() {
        assert!(matches!(
            BoundingBox::new(40.0, 0.0, 30.0, 10.0),
            Err(CoordError::InvertedBox { .. })
        ));
        assert!(matches!(
            BoundingBox::new(-91.0, 0.0, 30.0, 10.0),
            Err(CoordError::InvalidLatitude(_))
        ));
        assert!(matches!(
            BoundingBox::new(0.0, 0.0, 30.0, 181.0),
            Err(CoordError::InvalidLongitude(_))
        ));
    }

    #[test]
    fn test_bounding_box_parse() {
        let bbox: BoundingBox = "26.0, -81.0, 27.5, -79.5".parse().unwrap();
        assert_eq!(bbox.south(), 26.0);
        assert_eq!(bbox.west(), -81.0);
        assert_eq!(bbox.north(), 27.5);
        assert_eq!(bbox.east(), -79.5);
        assert!(!bbox.wraps());

        assert!("1,2,3".parse::<BoundingBox>().is_err());
        assert!("a,b,c,d".parse::<BoundingBox>().is_err());
    }
}
