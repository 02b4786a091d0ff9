//! Tile coordinate module
//!
//! Provides the immutable [`TileKey`] identity and the projection math that
//! turns `(zoom, row, column)` into geographic bounds for Web Mercator
//! (slippy-map) and WGS84 (equirectangular) tile grids.
//!
//! Row numbering follows the XYZ convention (row 0 at the north edge) unless a
//! `tms` flag is passed, in which case row 0 is at the south edge.

mod types;

pub use types::{
    CoordError, TileKey, TileProjection, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
};

use std::f64::consts::PI;

use crate::geo::GeoBoundingBox;

/// Number of tiles along one axis of a Web Mercator grid at `zoom`.
#[inline]
pub fn tiles_per_axis(zoom: u32) -> u64 {
    1u64 << zoom
}

/// Latitude in degrees of the northern edge of Web Mercator row `y`.
///
/// `lat(y, z) = atan(sinh(π − 2π·y/2^z))`
#[inline]
pub fn tile2lat(y: u64, zoom: u32) -> f64 {
    let n = tiles_per_axis(zoom) as f64;
    let lat_rad = (PI - 2.0 * PI * y as f64 / n).sinh().atan();
    lat_rad.to_degrees()
}

/// Longitude in degrees of the western edge of column `x`.
///
/// `lon(x, z) = x/2^z · 360 − 180`
#[inline]
pub fn tile2lon(x: u64, zoom: u32) -> f64 {
    let n = tiles_per_axis(zoom) as f64;
    x as f64 / n * 360.0 - 180.0
}

/// Flip a row between the XYZ and TMS conventions at `zoom`.
#[inline]
pub fn flip_row(row: u32, zoom: u32) -> u32 {
    (tiles_per_axis(zoom) - 1 - row as u64) as u32
}

/// Converts geographic coordinates to Web Mercator `(row, column)` at `zoom`.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (within the Web Mercator range)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to [`MAX_ZOOM`])
/// * `tms` - Return the row in TMS (south-origin) numbering
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u32, tms: bool) -> Result<(u32, u32), CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let n = tiles_per_axis(zoom) as f64;
    let max_index = tiles_per_axis(zoom) - 1;

    let col = (((lon + 180.0) / 360.0 * n) as u64).min(max_index) as u32;

    let lat_rad = lat.to_radians();
    let row = (((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as u64).min(max_index) as u32;

    let row = if tms { flip_row(row, zoom) } else { row };
    Ok((row, col))
}

/// Bounds of a Web Mercator tile.
pub fn mercator_bounds(
    zoom: u32,
    row: u32,
    column: u32,
    tms: bool,
) -> Result<GeoBoundingBox, CoordError> {
    check_grid(zoom, row, column, tiles_per_axis(zoom), tiles_per_axis(zoom))?;
    let xyz_row = if tms { flip_row(row, zoom) } else { row } as u64;
    let north = tile2lat(xyz_row, zoom);
    let south = tile2lat(xyz_row + 1, zoom);
    let west = tile2lon(column as u64, zoom);
    let east = tile2lon(column as u64 + 1, zoom);
    Ok(GeoBoundingBox::from_edges(south, west, north, east)?)
}

/// Web Mercator tile key with its bounds.
pub fn mercator_key(zoom: u32, row: u32, column: u32, tms: bool) -> Result<TileKey, CoordError> {
    Ok(TileKey::new(
        zoom,
        row,
        column,
        mercator_bounds(zoom, row, column, tms)?,
    ))
}

/// Bounds of a tile in the standard EPSG:4326 grid (2×1 tiles at zoom 0).
pub fn wgs84_bounds(
    zoom: u32,
    row: u32,
    column: u32,
    tms: bool,
) -> Result<GeoBoundingBox, CoordError> {
    let rows = tiles_per_axis(zoom);
    let columns = rows * 2;
    check_grid(zoom, row, column, rows, columns)?;

    let size = 180.0 / rows as f64;
    let west = -180.0 + column as f64 * size;
    let (south, north) = if tms {
        let south = -90.0 + row as f64 * size;
        (south, south + size)
    } else {
        let north = 90.0 - row as f64 * size;
        (north - size, north)
    };
    Ok(GeoBoundingBox::from_edges(
        south.max(-90.0),
        west,
        north.min(90.0),
        (west + size).min(180.0),
    )?)
}

/// WGS84 tile key with its bounds.
pub fn wgs84_key(zoom: u32, row: u32, column: u32, tms: bool) -> Result<TileKey, CoordError> {
    Ok(TileKey::new(
        zoom,
        row,
        column,
        wgs84_bounds(zoom, row, column, tms)?,
    ))
}

/// Bounds for a tile in the given projection.
pub fn tile_bounds(
    projection: TileProjection,
    zoom: u32,
    row: u32,
    column: u32,
    tms: bool,
) -> Result<GeoBoundingBox, CoordError> {
    match projection {
        TileProjection::WebMercator => mercator_bounds(zoom, row, column, tms),
        TileProjection::Wgs84 => wgs84_bounds(zoom, row, column, tms),
    }
}

fn check_grid(zoom: u32, row: u32, column: u32, rows: u64, columns: u64) -> Result<(), CoordError> {
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }
    if row as u64 >= rows || column as u64 >= columns {
        return Err(CoordError::OutOfGrid { zoom, row, column });
    }
    Ok(())
}
