//! CLI command implementations.
//!
//! - [`config`] - Configuration file (show, init, path)
//! - [`key`] - Bounds and children of a single tile
//! - [`tiles`] - Build a layer pyramid and list its tiles

pub mod config;
pub mod key;
pub mod tiles;

use tilelayer::coord::TileKey;

/// One output line per tile: id, then S/W/N/E edges.
pub(crate) fn format_tile(key: &TileKey) -> String {
    let b = key.bounds();
    format!(
        "{:<16} {:>12.6} {:>12.6} {:>12.6} {:>12.6}",
        key.id(),
        b.south(),
        b.west(),
        b.north(),
        b.east()
    )
}

pub(crate) fn tile_header() -> String {
    format!(
        "{:<16} {:>12} {:>12} {:>12} {:>12}",
        "TILE", "SOUTH", "WEST", "NORTH", "EAST"
    )
}
