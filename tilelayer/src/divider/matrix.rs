//! Tile-matrix-set divider.
//!
//! Supports layers whose grid is described by explicit per-level matrix
//! dimensions over a fixed extent, as published by WMTS-style services.
//! Levels do not have to double in size; any level-to-level scale factor in
//! `(1, 2]` along each axis yields a 2×2 split.
//!
//! # Partial cells
//!
//! When the scale factor is not two, a parent boundary can cut through a
//! next-level cell. The child covering the cut part of cell `k` cannot be
//! called `k` (the neighbouring parent holds the other part), so it gets an
//! index past the end of the grid: `n + 2k` for the leading part of the cell
//! (north or west side) and `n + 2k + 1` for the trailing part, where `n` is
//! the level's row or column count. Keys inside the grid always carry
//! [`TileMatrixSet::cell_bounds`]; [`TileMatrixSet::image_cell`] maps any key
//! back to the cell whose imagery covers it.

use serde::{Deserialize, Serialize};

use crate::coord::{CoordError, TileKey, TileProjection};
use crate::geo::GeoBoundingBox;

use super::{check_depth, ChildTile, Divider, DividerError, Division};

/// Tolerance, in fractions of a next-level cell, when matching a parent edge
/// to a cell boundary.
const EDGE_TOLERANCE: f64 = 1e-6;

/// One level of a tile matrix set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMatrix {
    pub zoom: u32,
    pub matrix_width: u32,
    pub matrix_height: u32,
}

/// A tile grid defined level by level over a fixed extent.
///
/// Rows count southward from the extent's north edge; columns count
/// eastward from its west edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMatrixSet {
    pub projection: TileProjection,
    pub extent: GeoBoundingBox,
    pub levels: Vec<TileMatrix>,
}

impl TileMatrixSet {
    /// Level definition for `zoom`.
    pub fn level(&self, zoom: u32) -> Result<&TileMatrix, DividerError> {
        self.levels
            .iter()
            .find(|m| m.zoom == zoom)
            .ok_or(DividerError::MissingMatrixLevel(zoom))
    }

    /// Shallowest level.
    pub fn first_level(&self) -> Option<&TileMatrix> {
        self.levels.iter().min_by_key(|m| m.zoom)
    }

    /// Deepest level.
    pub fn last_zoom(&self) -> Option<u32> {
        self.levels.iter().map(|m| m.zoom).max()
    }

    /// Bounds of one cell, unclipped.
    pub fn cell_bounds(&self, zoom: u32, row: u32, column: u32) -> Result<GeoBoundingBox, DividerError> {
        let level = self.level(zoom)?;
        if row >= level.matrix_height || column >= level.matrix_width {
            return Err(CoordError::OutOfGrid { zoom, row, column }.into());
        }

        let west = self.column_edge(level, column);
        let east = if column + 1 == level.matrix_width {
            self.extent.east()
        } else {
            self.column_edge(level, column + 1)
        };
        let north = self.row_edge(level, row);
        let south = if row + 1 == level.matrix_height {
            self.extent.south()
        } else {
            self.row_edge(level, row + 1)
        };

        Ok(GeoBoundingBox::from_edges(south, west, north, east)?)
    }

    /// Key for one cell.
    pub fn key(&self, zoom: u32, row: u32, column: u32) -> Result<TileKey, DividerError> {
        Ok(TileKey::new(zoom, row, column, self.cell_bounds(zoom, row, column)?))
    }

    /// Returns true if `key` names a whole cell of its level.
    pub fn is_grid_cell(&self, key: &TileKey) -> bool {
        self.level(key.zoom())
            .is_ok_and(|l| key.row() < l.matrix_height && key.column() < l.matrix_width)
    }

    /// The whole cell whose imagery covers `key`.
    ///
    /// Grid cells map to themselves; partial cells map to the cell they
    /// were cut from.
    pub fn image_cell(&self, key: &TileKey) -> Result<TileKey, DividerError> {
        let level = self.level(key.zoom())?;
        let unpack = |index: u32, len: u32| if index < len { index } else { (index - len) / 2 };
        self.key(
            key.zoom(),
            unpack(key.row(), level.matrix_height),
            unpack(key.column(), level.matrix_width),
        )
    }

    /// Latitude of the north edge of `row`.
    fn row_edge(&self, level: &TileMatrix, row: u32) -> f64 {
        self.extent.north() - row as f64 * (self.extent.height() / level.matrix_height as f64)
    }

    /// Longitude of the west edge of `column`.
    fn column_edge(&self, level: &TileMatrix, column: u32) -> f64 {
        self.extent.west() + column as f64 * (self.extent.width() / level.matrix_width as f64)
    }
}

/// Divides tiles using the next level of a [`TileMatrixSet`].
///
/// Children are returned north row first, west column first. The four
/// children always partition the parent. A child that covers only part of a
/// next-level cell gets an index past the end of the grid (see the module
/// docs), so no key is ever produced under two parents.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixDivider {
    matrix: TileMatrixSet,
    max_zoom: u32,
}

impl MatrixDivider {
    /// Create a divider. The effective maximum zoom is the smaller of
    /// `max_zoom` and the deepest matrix level.
    pub fn new(matrix: TileMatrixSet, max_zoom: u32) -> Self {
        let max_zoom = matrix.last_zoom().map_or(0, |last| last.min(max_zoom));
        Self { matrix, max_zoom }
    }

    pub fn matrix(&self) -> &TileMatrixSet {
        &self.matrix
    }
}

/// One half of a parent along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisPiece {
    /// Grid index, or the partial-cell index past the end of the grid.
    index: u32,
    /// True if the piece spans its whole cell.
    whole: bool,
}

/// Where next-level cell boundaries cut a parent along one axis.
///
/// `lo` and `hi` are the parent's edges as fractions of the extent, counted
/// in index direction. Returns the index of the single interior boundary,
/// or the number of pieces the parent would be cut into.
fn interior_boundary(lo: f64, hi: f64, cells: u32) -> Result<u32, u32> {
    let n = cells as f64;
    let first = (lo * n + EDGE_TOLERANCE).floor() as i64 + 1;
    let last = (hi * n - EDGE_TOLERANCE).ceil() as i64 - 1;
    let interior = (last - first + 1).max(0);
    if interior == 1 {
        Ok(first as u32)
    } else {
        Err(interior as u32 + 1)
    }
}

/// Split a parent at boundary `b` into its leading and trailing pieces.
fn split_axis(lo: f64, hi: f64, b: u32, cells: u32, zoom: u32) -> Result<[AxisPiece; 2], DividerError> {
    let n = cells as f64;
    let partial = |cell: u32, trailing: bool| -> Result<u32, DividerError> {
        let index = cells as u64 + 2 * cell as u64 + u64::from(trailing);
        u32::try_from(index).map_err(|_| DividerError::GridTooLarge { zoom })
    };

    let leading_whole = (lo * n - (b - 1) as f64).abs() < EDGE_TOLERANCE;
    let trailing_whole = (hi * n - (b + 1) as f64).abs() < EDGE_TOLERANCE;
    Ok([
        AxisPiece {
            index: if leading_whole { b - 1 } else { partial(b - 1, true)? },
            whole: leading_whole,
        },
        AxisPiece {
            index: if trailing_whole { b } else { partial(b, false)? },
            whole: trailing_whole,
        },
    ])
}

impl Divider for MatrixDivider {
    fn projection(&self) -> TileProjection {
        self.matrix.projection
    }

    fn max_zoom(&self) -> u32 {
        self.max_zoom
    }

    fn divide(&self, parent: &TileKey) -> Result<Division, DividerError> {
        let zoom = check_depth(parent.zoom(), self.max_zoom)?;
        self.matrix.level(parent.zoom())?;
        let to = *self.matrix.level(zoom)?;

        let extent = &self.matrix.extent;
        let bounds = parent.bounds();
        let row_lo = (extent.north() - bounds.north()) / extent.height();
        let row_hi = (extent.north() - bounds.south()) / extent.height();
        let col_lo = (bounds.west() - extent.west()) / extent.width();
        let col_hi = (bounds.east() - extent.west()) / extent.width();

        let (row_b, col_b) = match (
            interior_boundary(row_lo, row_hi, to.matrix_height),
            interior_boundary(col_lo, col_hi, to.matrix_width),
        ) {
            (Ok(r), Ok(c)) => (r, c),
            (r, c) => {
                let count = |split: Result<u32, u32>| split.map_or_else(|n| n, |_| 2);
                return Err(DividerError::IrregularMatrix {
                    zoom,
                    rows: count(r),
                    columns: count(c),
                });
            }
        };

        let row_pieces = split_axis(row_lo, row_hi, row_b, to.matrix_height, zoom)?;
        let col_pieces = split_axis(col_lo, col_hi, col_b, to.matrix_width, zoom)?;

        // Outer edges come from the parent, the cut from the grid.
        let cut_lat = self.matrix.row_edge(&to, row_b);
        let cut_lon = self.matrix.column_edge(&to, col_b);
        let lats = [(bounds.north(), cut_lat), (cut_lat, bounds.south())];
        let lons = [(bounds.west(), cut_lon), (cut_lon, bounds.east())];

        let child = |r: usize, c: usize| -> Result<ChildTile, DividerError> {
            let (row, column) = (row_pieces[r], col_pieces[c]);
            let bounds = if row.whole && column.whole {
                self.matrix.cell_bounds(zoom, row.index, column.index)?
            } else {
                let (north, south) = lats[r];
                let (west, east) = lons[c];
                GeoBoundingBox::from_edges(south, west, north, east)?
            };
            Ok(ChildTile {
                row: row.index,
                column: column.index,
                bounds,
            })
        };

        Ok(Division {
            rows: [row_pieces[0].index, row_pieces[1].index],
            columns: [col_pieces[0].index, col_pieces[1].index],
            zoom,
            children: [child(0, 0)?, child(0, 1)?, child(1, 0)?, child(1, 1)?],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::divider::test_support::assert_partition;
    use std::collections::HashSet;

    fn matrix(levels: &[(u32, u32, u32)]) -> TileMatrixSet {
        TileMatrixSet {
            projection: TileProjection::Wgs84,
            extent: GeoBoundingBox::from_edges(-90.0, -180.0, 90.0, 180.0).unwrap(),
            levels: levels
                .iter()
                .map(|&(zoom, matrix_width, matrix_height)| TileMatrix {
                    zoom,
                    matrix_width,
                    matrix_height,
                })
                .collect(),
        }
    }

    #[test]
    fn test_interior_boundary() {
        assert_eq!(interior_boundary(0.0, 0.5, 4), Ok(1));
        assert_eq!(interior_boundary(0.5, 1.0, 4), Ok(3));
        assert_eq!(interior_boundary(0.5, 1.0, 3), Ok(2));
        // Whole cell of the next level: nothing to cut.
        assert_eq!(interior_boundary(0.0, 0.5, 2), Err(1));
        assert_eq!(interior_boundary(0.0, 1.0, 4), Err(4));
    }

    #[test]
    fn test_doubling_levels() {
        let set = matrix(&[(0, 2, 1), (1, 4, 2), (2, 8, 4)]);
        let divider = MatrixDivider::new(set.clone(), 10);
        assert_eq!(divider.max_zoom(), 2);

        let parent = set.key(0, 0, 1).unwrap();
        let division = divider.divide(&parent).unwrap();
        assert_eq!(division.rows, [0, 1]);
        assert_eq!(division.columns, [2, 3]);
        assert_partition(parent.bounds(), &division, 1e-12);

        // North row first.
        assert!(division.children[0].bounds.north() > division.children[2].bounds.north());
    }

    #[test]
    fn test_non_power_of_two_scale() {
        // 2x2 -> 3x3 is a factor of 1.5 along both axes.
        let set = matrix(&[(0, 2, 2), (1, 3, 3)]);
        let divider = MatrixDivider::new(set.clone(), 1);

        let mut seen = HashSet::new();
        for row in 0..2 {
            for column in 0..2 {
                let parent = set.key(0, row, column).unwrap();
                let division = divider.divide(&parent).unwrap();
                assert_partition(parent.bounds(), &division, 1e-9);

                for key in division.keys() {
                    assert!(seen.insert(key.id()), "{} produced twice", key);
                    if set.is_grid_cell(&key) {
                        let cell = set.cell_bounds(key.zoom(), key.row(), key.column()).unwrap();
                        assert_eq!(*key.bounds(), cell);
                    } else {
                        let cell = *set.image_cell(&key).unwrap().bounds();
                        let piece = key.bounds();
                        assert!(piece.north() <= cell.north() + 1e-9 && piece.south() >= cell.south() - 1e-9);
                        assert!(piece.west() >= cell.west() - 1e-9 && piece.east() <= cell.east() + 1e-9);
                    }
                }
            }
        }
        assert_eq!(seen.len(), 16);
    }

    #[test]
    fn test_cut_cells_get_indices_past_the_grid() {
        let set = matrix(&[(0, 2, 2), (1, 3, 3)]);
        let divider = MatrixDivider::new(set.clone(), 1);

        // Column cell 1 spans both parents: west part under 0_0_0, east part
        // under 0_0_1.
        let west = divider.divide(&set.key(0, 0, 0).unwrap()).unwrap();
        assert_eq!(west.rows, [0, 5]);
        assert_eq!(west.columns, [0, 5]);
        let east = divider.divide(&set.key(0, 0, 1).unwrap()).unwrap();
        assert_eq!(east.columns, [6, 2]);

        let west_half = west.children[1].key(1);
        let east_half = east.children[0].key(1);
        assert_eq!(west_half.id(), "1_0_5");
        assert_eq!(east_half.id(), "1_0_6");
        assert!(!set.is_grid_cell(&west_half));

        let cell = set.key(1, 0, 1).unwrap();
        assert_eq!(set.image_cell(&west_half).unwrap(), cell);
        assert_eq!(set.image_cell(&east_half).unwrap(), cell);
        assert!((west_half.bounds().east() - east_half.bounds().west()).abs() < 1e-12);
        assert!((west_half.bounds().west() - cell.bounds().west()).abs() < 1e-9);
        assert!((east_half.bounds().east() - cell.bounds().east()).abs() < 1e-9);

        // Whole cells map to themselves.
        let corner = west.children[0].key(1);
        assert_eq!(set.image_cell(&corner).unwrap(), corner);
    }

    #[test]
    fn test_irregular_matrix_rejected() {
        let set = matrix(&[(0, 2, 2), (1, 2, 4)]);
        let divider = MatrixDivider::new(set.clone(), 1);
        let parent = set.key(0, 0, 0).unwrap();
        assert_eq!(
            divider.divide(&parent),
            Err(DividerError::IrregularMatrix {
                zoom: 1,
                rows: 2,
                columns: 1
            })
        );
    }

    #[test]
    fn test_missing_level() {
        let set = matrix(&[(0, 1, 1), (2, 4, 4)]);
        let divider = MatrixDivider::new(set.clone(), 2);
        let parent = set.key(0, 0, 0).unwrap();
        assert_eq!(
            divider.divide(&parent),
            Err(DividerError::MissingMatrixLevel(1))
        );
    }

    #[test]
    fn test_max_zoom_from_config() {
        let set = matrix(&[(0, 1, 1), (1, 2, 2), (2, 4, 4)]);
        let divider = MatrixDivider::new(set.clone(), 1);
        let tile = set.key(1, 0, 0).unwrap();
        assert_eq!(
            divider.divide(&tile),
            Err(DividerError::MaxDepthExceeded { zoom: 1, max: 1 })
        );
    }

    #[test]
    fn test_cell_out_of_grid() {
        let set = matrix(&[(0, 2, 1)]);
        assert!(set.cell_bounds(0, 1, 0).is_err());
        assert!(set.cell_bounds(0, 0, 1).is_ok());
    }
}
