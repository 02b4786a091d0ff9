//! Geographic bounding boxes.
//!
//! A [`GeoBoundingBox`] is defined by its south-west and north-east corners.
//! Latitude never wraps, so `south <= north` is enforced at construction.
//! Longitude may wrap across the antimeridian: a box whose `west` is greater
//! than its `east` covers `[west, 180] ∪ [-180, east]`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::LatLonAlt;

/// Errors raised when constructing geographic values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// South edge is north of the north edge.
    #[error("Inverted bounding box: south {south} > north {north}")]
    Inverted { south: f64, north: f64 },

    /// Latitude outside [-90, 90].
    #[error("Invalid latitude: {0} (must be -90 to 90)")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180].
    #[error("Invalid longitude: {0} (must be -180 to 180)")]
    InvalidLongitude(f64),
}

/// Axis-aligned geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBoundingBox {
    south_west: LatLonAlt,
    north_east: LatLonAlt,
}

impl GeoBoundingBox {
    /// Create a bounding box from its south-west and north-east corners.
    ///
    /// # Errors
    ///
    /// Fails if either latitude is outside `[-90, 90]`, either longitude is
    /// outside `[-180, 180]`, or the south edge lies north of the north edge.
    pub fn new(south_west: LatLonAlt, north_east: LatLonAlt) -> Result<Self, GeoError> {
        for lat in [south_west.lat, north_east.lat] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(GeoError::InvalidLatitude(lat));
            }
        }
        for lon in [south_west.lon, north_east.lon] {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(GeoError::InvalidLongitude(lon));
            }
        }
        if south_west.lat > north_east.lat {
            return Err(GeoError::Inverted {
                south: south_west.lat,
                north: north_east.lat,
            });
        }
        Ok(Self {
            south_west,
            north_east,
        })
    }

    /// Create a bounding box from its four edges.
    pub fn from_edges(south: f64, west: f64, north: f64, east: f64) -> Result<Self, GeoError> {
        Self::new(LatLonAlt::new(south, west), LatLonAlt::new(north, east))
    }

    /// The whole globe.
    pub fn world() -> Self {
        Self {
            south_west: LatLonAlt::new(-90.0, -180.0),
            north_east: LatLonAlt::new(90.0, 180.0),
        }
    }

    pub fn south_west(&self) -> LatLonAlt {
        self.south_west
    }

    pub fn north_east(&self) -> LatLonAlt {
        self.north_east
    }

    pub fn south(&self) -> f64 {
        self.south_west.lat
    }

    pub fn north(&self) -> f64 {
        self.north_east.lat
    }

    pub fn west(&self) -> f64 {
        self.south_west.lon
    }

    pub fn east(&self) -> f64 {
        self.north_east.lon
    }

    /// Returns true if the box crosses the antimeridian.
    pub fn wraps(&self) -> bool {
        self.west() > self.east()
    }

    /// Longitudinal extent in degrees, accounting for antimeridian wrap.
    pub fn width(&self) -> f64 {
        if self.wraps() {
            self.east() + 360.0 - self.west()
        } else {
            self.east() - self.west()
        }
    }

    /// Latitudinal extent in degrees.
    pub fn height(&self) -> f64 {
        self.north() - self.south()
    }

    /// Area in square degrees (planar, used for partition checks).
    pub fn area_deg2(&self) -> f64 {
        self.width() * self.height()
    }

    /// Geographic center of the box.
    pub fn center(&self) -> LatLonAlt {
        let lat = (self.south() + self.north()) / 2.0;
        let lon = normalize_lon(self.west() + self.width() / 2.0);
        LatLonAlt::new(lat, lon)
    }

    /// Returns true if the point lies inside or on the edge of the box.
    pub fn contains(&self, point: &LatLonAlt) -> bool {
        if point.lat < self.south() || point.lat > self.north() {
            return false;
        }
        if self.wraps() {
            point.lon >= self.west() || point.lon <= self.east()
        } else {
            point.lon >= self.west() && point.lon <= self.east()
        }
    }

    /// Returns true if the two boxes share a region of non-zero area.
    ///
    /// Boxes that merely touch along an edge do not intersect.
    pub fn intersects(&self, other: &Self) -> bool {
        if self.south() >= other.north() || other.south() >= self.north() {
            return false;
        }
        self.lon_ranges().iter().any(|(w1, e1)| {
            other
                .lon_ranges()
                .iter()
                .any(|(w2, e2)| w1 < e2 && w2 < e1)
        })
    }

    /// The smallest box containing both boxes.
    ///
    /// Longitude union picks the shorter of the two arcs that cover both
    /// inputs, so merging boxes on either side of the antimeridian yields a
    /// wrapping box rather than a near-global one.
    pub fn merge(&self, other: &Self) -> Self {
        let south = self.south().min(other.south());
        let north = self.north().max(other.north());

        let from_self = covering_arc(self.west(), self.width(), other.west(), other.width());
        let from_other = covering_arc(other.west(), other.width(), self.west(), self.width());
        let (start, width) = if from_self.1 <= from_other.1 {
            from_self
        } else {
            from_other
        };

        let (west, east) = if width >= 360.0 {
            (-180.0, 180.0)
        } else {
            let mut east = start + width;
            if east > 180.0 {
                east -= 360.0;
            }
            (start, east)
        };

        Self {
            south_west: LatLonAlt::new(south, west),
            north_east: LatLonAlt::new(north, east),
        }
    }

    /// Compare edges within `tolerance` degrees.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.south_west.approx_eq(&other.south_west, tolerance)
            && self.north_east.approx_eq(&other.north_east, tolerance)
    }

    /// Non-wrapping longitude intervals covered by the box.
    fn lon_ranges(&self) -> Vec<(f64, f64)> {
        if self.wraps() {
            vec![(self.west(), 180.0), (-180.0, self.east())]
        } else {
            vec![(self.west(), self.east())]
        }
    }
}

impl std::fmt::Display for GeoBoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[S {:.6}, W {:.6}, N {:.6}, E {:.6}]",
            self.south(),
            self.west(),
            self.north(),
            self.east()
        )
    }
}

/// Arc starting at `start` that covers both `[start, start + width]` and the
/// other interval, returned as `(start, width)`.
fn covering_arc(start: f64, width: f64, other_start: f64, other_width: f64) -> (f64, f64) {
    let mut shifted = other_start;
    while shifted < start {
        shifted += 360.0;
    }
    while shifted >= start + 360.0 {
        shifted -= 360.0;
    }
    let end = (start + width).max(shifted + other_width);
    (start, end - start)
}

/// Normalize a longitude into `[-180, 180]`.
fn normalize_lon(lon: f64) -> f64 {
    let mut lon = lon;
    while lon > 180.0 {
        lon -= 360.0;
    }
    while lon < -180.0 {
        lon += 360.0;
    }
    lon
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(s: f64, w: f64, n: f64, e: f64) -> GeoBoundingBox {
        GeoBoundingBox::from_edges(s, w, n, e).unwrap()
    }

    #[test]
    fn test_inverted_box_rejected() {
        let result = GeoBoundingBox::from_edges(10.0, 0.0, -10.0, 5.0);
        assert!(matches!(result, Err(GeoError::Inverted { .. })));
    }

    #[test]
    fn test_invalid_latitude_rejected() {
        let result = GeoBoundingBox::from_edges(-91.0, 0.0, 10.0, 5.0);
        assert!(matches!(result, Err(GeoError::InvalidLatitude(_))));
    }

    #[test]
    fn test_center_simple() {
        let b = bbox(-10.0, 20.0, 10.0, 40.0);
        let c = b.center();
        assert_eq!(c.lat, 0.0);
        assert_eq!(c.lon, 30.0);
    }

    #[test]
    fn test_center_wrapping() {
        let b = bbox(0.0, 170.0, 10.0, -170.0);
        assert!(b.wraps());
        assert_eq!(b.width(), 20.0);
        assert!((b.center().lon.abs() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_contains_wrapping() {
        let b = bbox(0.0, 170.0, 10.0, -170.0);
        assert!(b.contains(&LatLonAlt::new(5.0, 175.0)));
        assert!(b.contains(&LatLonAlt::new(5.0, -175.0)));
        assert!(!b.contains(&LatLonAlt::new(5.0, 0.0)));
    }

    #[test]
    fn test_merge_disjoint() {
        let merged = bbox(0.0, 10.0, 5.0, 20.0).merge(&bbox(-5.0, 30.0, 2.0, 40.0));
        assert!(merged.approx_eq(&bbox(-5.0, 10.0, 5.0, 40.0), 1e-12));
    }

    #[test]
    fn test_merge_halves_gives_world_longitude() {
        let merged = bbox(-90.0, -180.0, 90.0, 0.0).merge(&bbox(-90.0, 0.0, 90.0, 180.0));
        assert!(merged.approx_eq(&GeoBoundingBox::world(), 1e-12));
    }

    #[test]
    fn test_merge_across_antimeridian() {
        let merged = bbox(0.0, 170.0, 10.0, 175.0).merge(&bbox(0.0, -175.0, 10.0, -170.0));
        assert!(merged.wraps());
        assert_eq!(merged.west(), 170.0);
        assert_eq!(merged.east(), -170.0);
    }

    #[test]
    fn test_intersects_edge_touch_is_not_overlap() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        let b = bbox(0.0, 10.0, 10.0, 20.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&bbox(5.0, 5.0, 15.0, 15.0)));
    }

    #[test]
    fn test_intersects_wrapping() {
        let a = bbox(0.0, 170.0, 10.0, -170.0);
        assert!(a.intersects(&bbox(0.0, -180.0, 10.0, -175.0)));
        assert!(!a.intersects(&bbox(0.0, 0.0, 10.0, 10.0)));
    }
}
