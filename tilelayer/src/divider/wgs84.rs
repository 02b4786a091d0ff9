//! Equirectangular (EPSG:4326) divider.

use crate::coord::{TileKey, TileProjection, MAX_ZOOM};
use crate::geo::GeoBoundingBox;

use super::{check_depth, ChildTile, Divider, DividerError, Division};

/// Splits a WGS84 tile into quadrants at its center.
///
/// Child rows are `2·row + {0, 1}` and columns `2·column + {0, 1}`. Which row
/// is the upper one depends on the numbering:
///
/// - TMS: row `2·row` is the lower row; children are returned lower-left,
///   lower-right, upper-left, upper-right.
/// - XYZ: row `2·row` is the upper row; children are returned upper-left,
///   upper-right, lower-left, lower-right.
///
/// In both cases the children come out in ascending `(row, column)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wgs84Divider {
    max_zoom: u32,
    tms: bool,
}

impl Wgs84Divider {
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

impl Divider for Wgs84Divider {
    fn projection(&self) -> TileProjection {
        TileProjection::Wgs84
    }

    fn max_zoom(&self) -> u32 {
        self.max_zoom
    }

    fn divide(&self, parent: &TileKey) -> Result<Division, DividerError> {
        let zoom = check_depth(parent.zoom(), self.max_zoom)?;
        let b = parent.bounds();

        let mid_lat = (b.south() + b.north()) / 2.0;
        let mid_lon = if b.wraps() {
            b.center().lon
        } else {
            (b.west() + b.east()) / 2.0
        };

        let upper_left = GeoBoundingBox::from_edges(mid_lat, b.west(), b.north(), mid_lon)?;
        let upper_right = GeoBoundingBox::from_edges(mid_lat, mid_lon, b.north(), b.east())?;
        let lower_left = GeoBoundingBox::from_edges(b.south(), b.west(), mid_lat, mid_lon)?;
        let lower_right = GeoBoundingBox::from_edges(b.south(), mid_lon, mid_lat, b.east())?;

        let rows = [parent.row() * 2, parent.row() * 2 + 1];
        let columns = [parent.column() * 2, parent.column() * 2 + 1];

        let (first, second) = if self.tms {
            ([lower_left, lower_right], [upper_left, upper_right])
        } else {
            ([upper_left, upper_right], [lower_left, lower_right])
        };

        Ok(Division {
            rows,
            columns,
            zoom,
            children: [
                ChildTile {
                    row: rows[0],
                    column: columns[0],
                    bounds: first[0],
                },
                ChildTile {
                    row: rows[0],
                    column: columns[1],
                    bounds: first[1],
                },
                ChildTile {
                    row: rows[1],
                    column: columns[0],
                    bounds: second[0],
                },
                ChildTile {
                    row: rows[1],
                    column: columns[1],
                    bounds: second[1],
                },
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::wgs84_key;
    use crate::divider::test_support::assert_partition;

    #[test]
    fn test_tms_order_lower_first() {
        let divider = Wgs84Divider::new(4, true);
        // Eastern hemisphere at zoom 0.
        let parent = wgs84_key(0, 0, 1, true).unwrap();
        let division = divider.divide(&parent).unwrap();

        let [ll, lr, ul, ur] = division.children;
        assert_eq!((ll.row, ll.column), (0, 2));
        assert_eq!((lr.row, lr.column), (0, 3));
        assert_eq!((ul.row, ul.column), (1, 2));
        assert_eq!((ur.row, ur.column), (1, 3));

        assert_eq!(ll.bounds, GeoBoundingBox::from_edges(-90.0, 0.0, 0.0, 90.0).unwrap());
        assert_eq!(ur.bounds, GeoBoundingBox::from_edges(0.0, 90.0, 90.0, 180.0).unwrap());
        assert_partition(parent.bounds(), &division, 1e-12);
    }

    #[test]
    fn test_xyz_order_upper_first() {
        let divider = Wgs84Divider::new(4, false);
        let parent = wgs84_key(0, 0, 0, false).unwrap();
        let division = divider.divide(&parent).unwrap();

        let [ul, ur, ll, lr] = division.children;
        assert_eq!(ul.bounds, GeoBoundingBox::from_edges(0.0, -180.0, 90.0, -90.0).unwrap());
        assert_eq!(ur.bounds, GeoBoundingBox::from_edges(0.0, -90.0, 90.0, 0.0).unwrap());
        assert_eq!(ll.bounds, GeoBoundingBox::from_edges(-90.0, -180.0, 0.0, -90.0).unwrap());
        assert_eq!(lr.bounds, GeoBoundingBox::from_edges(-90.0, -90.0, 0.0, 0.0).unwrap());
        assert_eq!((ul.row, ll.row), (0, 1));
    }

    #[test]
    fn test_children_match_grid_bounds() {
        for tms in [false, true] {
            let divider = Wgs84Divider::new(8, tms);
            let parent = wgs84_key(3, 5, 9, tms).unwrap();
            for child in divider.divide(&parent).unwrap().children {
                let expected = wgs84_key(4, child.row, child.column, tms).unwrap();
                assert!(
                    child.bounds.approx_eq(expected.bounds(), 1e-12),
                    "tms={} child {} vs grid {}",
                    tms,
                    child.bounds,
                    expected.bounds()
                );
            }
        }
    }

    #[test]
    fn test_wrapping_parent_splits_on_antimeridian() {
        let divider = Wgs84Divider::new(4, false);
        let bounds = GeoBoundingBox::from_edges(0.0, 170.0, 10.0, -170.0).unwrap();
        let parent = TileKey::new(1, 0, 0, bounds);
        let division = divider.divide(&parent).unwrap();
        let [ul, ur, _, _] = division.children;
        assert!((ul.bounds.width() - 10.0).abs() < 1e-12);
        assert!((ur.bounds.width() - 10.0).abs() < 1e-12);
        assert_partition(&bounds, &division, 1e-9);
    }

    #[test]
    fn test_max_depth() {
        let divider = Wgs84Divider::new(0, true);
        let root = wgs84_key(0, 0, 0, true).unwrap();
        assert!(matches!(
            divider.divide(&root),
            Err(DividerError::MaxDepthExceeded { zoom: 0, max: 0 })
        ));
    }
}
