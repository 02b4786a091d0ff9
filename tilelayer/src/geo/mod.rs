//! Geographic primitives shared by the tiling and constraint engines.
//!
//! Everything here is expressed in degrees (latitude/longitude) and meters
//! (altitude). Model-space positions are opaque `x/y/z` triples produced by a
//! [`crate::constraint::Projection`]; this module only knows how to measure
//! their distance from the model origin.

mod bounds;

pub use bounds::{GeoBoundingBox, GeoError};

use serde::{Deserialize, Serialize};

/// Default tolerance (degrees) for comparing tile edges.
pub const EDGE_TOLERANCE_DEG: f64 = 1e-9;

/// A geographic position in degrees with an altitude in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLonAlt {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
    /// Altitude in meters.
    #[serde(default)]
    pub alt: f64,
}

impl LatLonAlt {
    /// Create a position at zero altitude.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon, alt: 0.0 }
    }

    /// Create a position with an altitude.
    pub fn with_alt(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }

    /// Returns true if both coordinates are within `tolerance` degrees.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        (self.lat - other.lat).abs() <= tolerance && (self.lon - other.lon).abs() <= tolerance
    }
}

impl std::fmt::Display for LatLonAlt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6}, {:.1}m)", self.lat, self.lon, self.alt)
    }
}

/// A point in the renderer's model coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModelPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ModelPosition {
    /// Create a new model position.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Distance from the model origin.
    pub fn distance_from_origin(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_from_origin() {
        let p = ModelPosition::new(3.0, 4.0, 12.0);
        assert!((p.distance_from_origin() - 13.0).abs() < 1e-12);
    }

    #[test]
    fn test_lat_lon_alt_approx_eq() {
        let a = LatLonAlt::new(10.0, 20.0);
        let b = LatLonAlt::new(10.0 + 1e-12, 20.0 - 1e-12);
        assert!(a.approx_eq(&b, EDGE_TOLERANCE_DEG));
        assert!(!a.approx_eq(&LatLonAlt::new(10.1, 20.0), EDGE_TOLERANCE_DEG));
    }
}
