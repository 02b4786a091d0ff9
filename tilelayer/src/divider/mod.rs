//! Divider strategies
//!
//! A [`Divider`] computes the four children of a tile. Each layer owns exactly
//! one divider per projection; dividers are stateless apart from the
//! immutable layer settings they close over, so a single instance is shared
//! by every node of the layer's tree (see [`DividerRegistry`]).
//!
//! # Child ordering
//!
//! Every divider documents the order in which it returns children. Callers
//! never have to infer a child's `(row, column)` from its position: each
//! [`ChildTile`] carries its own row and column next to its bounds.
//!
//! | Divider | Order |
//! |---|---|
//! | [`WebMercatorDivider`] | first iterated row (west, east), then second row; TMS reverses the row iteration |
//! | [`Wgs84Divider`] (TMS) | lower-left, lower-right, upper-left, upper-right |
//! | [`Wgs84Divider`] (XYZ) | upper-left, upper-right, lower-left, lower-right |
//! | [`MatrixDivider`] | north row (west, east), then south row |

mod matrix;
mod mercator;
mod registry;
mod wgs84;

pub use matrix::{MatrixDivider, TileMatrix, TileMatrixSet};
pub use mercator::WebMercatorDivider;
pub use registry::DividerRegistry;
pub use wgs84::Wgs84Divider;

use std::fmt::Debug;

use thiserror::Error;

use crate::coord::{CoordError, TileKey, TileProjection};
use crate::geo::{GeoBoundingBox, GeoError};

/// Errors returned by dividers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DividerError {
    /// The children would be deeper than the layer allows.
    #[error("Cannot divide tile at zoom {zoom}: layer maximum is {max}")]
    MaxDepthExceeded { zoom: u32, max: u32 },

    /// The tile matrix has no level for the requested zoom.
    #[error("Tile matrix has no level {0}")]
    MissingMatrixLevel(u32),

    /// The next matrix level does not split this tile into 2×2 cells.
    #[error("Tile matrix level {zoom} splits tile into {rows}x{columns} cells, expected 2x2")]
    IrregularMatrix { zoom: u32, rows: u32, columns: u32 },

    /// Partial-cell indices at this level do not fit in a `u32`.
    #[error("Tile matrix level {zoom} is too large to index partial cells")]
    GridTooLarge { zoom: u32 },

    /// Coordinate math failed.
    #[error(transparent)]
    Coord(#[from] CoordError),

    /// A child box was invalid.
    #[error(transparent)]
    Geo(#[from] GeoError),
}

/// One child produced by a division.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChildTile {
    pub row: u32,
    pub column: u32,
    pub bounds: GeoBoundingBox,
}

impl ChildTile {
    /// Key for this child at `zoom`.
    pub fn key(&self, zoom: u32) -> TileKey {
        TileKey::new(zoom, self.row, self.column, self.bounds)
    }
}

/// Result of dividing one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct Division {
    /// Child rows in iteration order.
    pub rows: [u32; 2],
    /// Child columns in iteration order.
    pub columns: [u32; 2],
    /// Zoom level of the children.
    pub zoom: u32,
    /// Children in the divider's declared order.
    pub children: [ChildTile; 4],
}

impl Division {
    /// Child keys in the divider's declared order.
    pub fn keys(&self) -> [TileKey; 4] {
        self.children.map(|c| c.key(self.zoom))
    }

    /// Union of the children's bounds.
    pub fn union(&self) -> GeoBoundingBox {
        let [a, b, c, d] = self.children;
        a.bounds.merge(&b.bounds).merge(&c.bounds).merge(&d.bounds)
    }
}

/// Strategy for computing a tile's children.
pub trait Divider: Debug + Send + Sync {
    /// Projection of the grid this divider works on.
    fn projection(&self) -> TileProjection;

    /// Deepest zoom level this divider will produce.
    fn max_zoom(&self) -> u32;

    /// Compute the four children of `parent`.
    ///
    /// # Errors
    ///
    /// [`DividerError::MaxDepthExceeded`] if `parent.zoom() + 1` is deeper than
    /// [`Divider::max_zoom`].
    fn divide(&self, parent: &TileKey) -> Result<Division, DividerError>;

    /// Returns true if tiles at `zoom` can be divided.
    fn can_divide(&self, zoom: u32) -> bool {
        zoom < self.max_zoom()
    }
}

/// Shared depth check used by all dividers.
pub(crate) fn check_depth(zoom: u32, max: u32) -> Result<u32, DividerError> {
    let next = zoom + 1;
    if next > max {
        return Err(DividerError::MaxDepthExceeded { zoom, max });
    }
    Ok(next)
}
