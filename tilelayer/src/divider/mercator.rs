//! Web Mercator quadtree divider.

use crate::coord::{mercator_bounds, TileKey, TileProjection, MAX_ZOOM};

use super::{check_depth, ChildTile, Divider, DividerError, Division};

/// Divides slippy-map tiles into their four quadtree children.
///
/// The children of `(z, row, column)` are rows `2·row + {0, 1}` and columns
/// `2·column + {0, 1}` at `z + 1`. With XYZ numbering rows are visited in
/// ascending order; with TMS numbering the row iteration is reversed so
/// children still come out north row first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebMercatorDivider {
    max_zoom: u32,
    tms: bool,
}

impl WebMercatorDivider {
    /// Create a divider.
    ///
    /// # Arguments
    ///
    /// * `max_zoom` - Deepest zoom level, clamped to [`MAX_ZOOM`]
    /// * `tms` - Rows are numbered from the south edge
    pub fn new(max_zoom: u32, tms: bool) -> Self {
        Self {
            max_zoom: max_zoom.min(MAX_ZOOM),
            tms,
        }
    }

    pub fn is_tms(&self) -> bool {
        self.tms
    }
}

impl Divider for WebMercatorDivider {
    fn projection(&self) -> TileProjection {
        TileProjection::WebMercator
    }

    fn max_zoom(&self) -> u32 {
        self.max_zoom
    }

    fn divide(&self, parent: &TileKey) -> Result<Division, DividerError> {
        let zoom = check_depth(parent.zoom(), self.max_zoom)?;

        let first = parent.row() * 2;
        let rows = if self.tms {
            [first + 1, first]
        } else {
            [first, first + 1]
        };
        let columns = [parent.column() * 2, parent.column() * 2 + 1];

        let child = |row: u32, column: u32| -> Result<ChildTile, DividerError> {
            Ok(ChildTile {
                row,
                column,
                bounds: mercator_bounds(zoom, row, column, self.tms)?,
            })
        };

        Ok(Division {
            rows,
            columns,
            zoom,
            children: [
                child(rows[0], columns[0])?,
                child(rows[0], columns[1])?,
                child(rows[1], columns[0])?,
                child(rows[1], columns[1])?,
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{flip_row, mercator_key};
    use crate::divider::test_support::assert_partition;

    #[test]
    fn test_root_children() {
        let divider = WebMercatorDivider::new(5, false);
        let root = mercator_key(0, 0, 0, false).unwrap();
        let division = divider.divide(&root).unwrap();

        assert_eq!(division.zoom, 1);
        assert_eq!(division.rows, [0, 1]);
        assert_eq!(division.columns, [0, 1]);

        let nw = &division.children[0];
        assert_eq!((nw.row, nw.column), (0, 0));
        assert!((nw.bounds.north() - 85.0511287798066).abs() < 1e-9);
        assert!((nw.bounds.south() - 0.0).abs() < 1e-9);
        assert!((nw.bounds.west() + 180.0).abs() < 1e-9);
        assert!((nw.bounds.east() - 0.0).abs() < 1e-9);

        assert_partition(root.bounds(), &division, 1e-9);
    }

    #[test]
    fn test_children_partition_deep_tile() {
        let divider = WebMercatorDivider::new(20, false);
        let parent = mercator_key(10, 395, 163, false).unwrap();
        let division = divider.divide(&parent).unwrap();
        assert_partition(parent.bounds(), &division, 1e-9);
        assert_eq!(division.rows, [790, 791]);
        assert_eq!(division.columns, [326, 327]);
    }

    #[test]
    fn test_tms_reverses_row_traversal() {
        let xyz = WebMercatorDivider::new(10, false);
        let tms = WebMercatorDivider::new(10, true);

        let parent_xyz = mercator_key(3, 2, 5, false).unwrap();
        let parent_tms = mercator_key(3, flip_row(2, 3), 5, true).unwrap();
        assert!(parent_xyz.bounds().approx_eq(parent_tms.bounds(), 1e-12));

        let a = xyz.divide(&parent_xyz).unwrap();
        let b = tms.divide(&parent_tms).unwrap();

        assert!(a.rows[0] < a.rows[1]);
        assert!(b.rows[0] > b.rows[1]);

        // Same boxes, same geographic order.
        for (x, t) in a.children.iter().zip(b.children.iter()) {
            assert!(x.bounds.approx_eq(&t.bounds, 1e-12));
            assert_eq!(t.row, flip_row(x.row, 4));
            assert_eq!(t.column, x.column);
        }
    }

    #[test]
    fn test_max_depth() {
        let divider = WebMercatorDivider::new(2, false);
        let tile = mercator_key(2, 1, 1, false).unwrap();
        assert_eq!(
            divider.divide(&tile),
            Err(DividerError::MaxDepthExceeded { zoom: 2, max: 2 })
        );
        assert!(divider.can_divide(1));
        assert!(!divider.can_divide(2));
    }

    #[test]
    fn test_max_zoom_clamped() {
        assert_eq!(WebMercatorDivider::new(99, false).max_zoom(), MAX_ZOOM);
    }

    #[test]
    fn test_child_keys_carry_bounds() {
        let divider = WebMercatorDivider::new(4, false);
        let root = mercator_key(0, 0, 0, false).unwrap();
        let keys = divider.divide(&root).unwrap().keys();
        for key in keys {
            let expected = mercator_bounds(1, key.row(), key.column(), false).unwrap();
            assert_eq!(*key.bounds(), expected);
        }
    }
}
