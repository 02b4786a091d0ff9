//! Tile identity types.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{GeoBoundingBox, GeoError};

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.051_128_779_806_6;
pub const MAX_LAT: f64 = 85.051_128_779_806_6;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Deepest zoom level any divider will produce.
pub const MAX_ZOOM: u32 = 30;

/// Errors from tile coordinate math and key parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude is outside the Web Mercator range.
    #[error("Invalid latitude: {0} (must be between {} and {})", MIN_LAT, MAX_LAT)]
    InvalidLatitude(f64),

    /// Longitude is outside [-180, 180].
    #[error("Invalid longitude: {0} (must be between {} and {})", MIN_LON, MAX_LON)]
    InvalidLongitude(f64),

    /// Zoom level is beyond what the tile math supports.
    #[error("Invalid zoom level: {0} (must be at most {})", MAX_ZOOM)]
    InvalidZoom(u32),

    /// Row or column is outside the grid at this zoom.
    #[error("Tile {row}/{column} is outside the grid at zoom {zoom}")]
    OutOfGrid { zoom: u32, row: u32, column: u32 },

    /// Tile identifier string is malformed.
    #[error("Invalid tile id: '{0}' (expected <zoom>_<row>_<column>)")]
    InvalidTileId(String),

    /// Derived bounds were not a valid box.
    #[error("Invalid tile bounds: {0}")]
    Bounds(#[from] GeoError),
}

/// Projection used to lay out a layer's tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileProjection {
    /// EPSG:3857 slippy-map tiles.
    WebMercator,
    /// EPSG:4326 equirectangular tiles.
    Wgs84,
}

impl TileProjection {
    /// EPSG code of the projection.
    pub fn epsg(&self) -> u32 {
        match self {
            TileProjection::WebMercator => 3857,
            TileProjection::Wgs84 => 4326,
        }
    }
}

impl fmt::Display for TileProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// Immutable identity of one tile in a pyramid.
///
/// Equality and hashing only consider `(zoom, row, column)`. The bounding box
/// is derived from those three values by the layer's projection and carried
/// along so children and renderers never have to recompute it.
#[derive(Debug, Clone, Copy)]
pub struct TileKey {
    zoom: u32,
    row: u32,
    column: u32,
    bounds: GeoBoundingBox,
}

impl TileKey {
    /// Create a key from its identity and pre-computed bounds.
    pub fn new(zoom: u32, row: u32, column: u32, bounds: GeoBoundingBox) -> Self {
        Self {
            zoom,
            row,
            column,
            bounds,
        }
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn bounds(&self) -> &GeoBoundingBox {
        &self.bounds
    }

    /// Stable string identifier, `"<zoom>_<row>_<column>"`.
    pub fn id(&self) -> String {
        format!("{}_{}_{}", self.zoom, self.row, self.column)
    }

    /// Parse an identifier produced by [`TileKey::id`] into
    /// `(zoom, row, column)`.
    pub fn parse_id(id: &str) -> Result<(u32, u32, u32), CoordError> {
        let invalid = || CoordError::InvalidTileId(id.to_string());
        let mut parts = id.split('_');
        let mut next = || -> Result<u32, CoordError> {
            parts
                .next()
                .and_then(|p| p.parse::<u32>().ok())
                .ok_or_else(invalid)
        };
        let zoom = next()?;
        let row = next()?;
        let column = next()?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok((zoom, row, column))
    }

    /// Returns true if this key names the given tile.
    pub fn same_tile(&self, zoom: u32, row: u32, column: u32) -> bool {
        self.zoom == zoom && self.row == row && self.column == column
    }
}

impl PartialEq for TileKey {
    fn eq(&self, other: &Self) -> bool {
        self.same_tile(other.zoom, other.row, other.column)
    }
}

impl Eq for TileKey {}

impl Hash for TileKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.zoom.hash(state);
        self.row.hash(state);
        self.column.hash(state);
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.zoom, self.row, self.column)
    }
}
