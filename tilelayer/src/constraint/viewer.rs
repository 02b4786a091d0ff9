//! Viewer-position constraints.
//!
//! Gates rendering on how far the viewer is from the model origin. Each
//! altitude bound can be expressed relative to the ellipsoid, the terrain or
//! the model origin; the supplied [`MapProjection`] turns the first two into
//! model-space distances at the viewer's current location.

use serde::{Deserialize, Serialize};

use crate::geo::{LatLonAlt, ModelPosition};

/// What an altitude is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AltitudeReference {
    /// Height above the reference ellipsoid.
    Ellipsoid,
    /// Height above the terrain surface.
    Terrain,
    /// Distance from the model origin, in model units.
    Origin,
}

/// An altitude bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Altitude {
    pub meters: f64,
    pub reference: AltitudeReference,
}

impl Altitude {
    pub fn new(meters: f64, reference: AltitudeReference) -> Self {
        Self { meters, reference }
    }
}

/// Conversions between geographic and model coordinates.
///
/// Implemented by the renderer's projection; this crate only consumes it.
pub trait MapProjection: Send + Sync {
    /// Geographic location of a model-space position.
    fn to_lat_lon_alt(&self, position: &ModelPosition) -> LatLonAlt;

    /// Model-space position of a location whose altitude is relative to
    /// `reference`.
    fn to_model(&self, location: &LatLonAlt, reference: AltitudeReference) -> ModelPosition;
}

/// Passes when the viewer's distance from origin is within the bounds.
///
/// Missing bounds are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewerPositionConstraint {
    pub min_altitude: Option<Altitude>,
    pub max_altitude: Option<Altitude>,
}

impl ViewerPositionConstraint {
    pub fn new(min_altitude: Option<Altitude>, max_altitude: Option<Altitude>) -> Self {
        Self {
            min_altitude,
            max_altitude,
        }
    }

    /// Check a viewer position against the bounds.
    ///
    /// The viewer's geographic location is computed at most once, and only if
    /// a bound is relative to the ellipsoid or terrain.
    pub fn check(&self, viewer: &ModelPosition, projection: &dyn MapProjection) -> bool {
        let distance = viewer.distance_from_origin();
        let mut location: Option<LatLonAlt> = None;

        let mut bound_distance = |altitude: &Altitude| -> f64 {
            match altitude.reference {
                AltitudeReference::Origin => altitude.meters,
                reference => {
                    let here = *location.get_or_insert_with(|| projection.to_lat_lon_alt(viewer));
                    let at = LatLonAlt::with_alt(here.lat, here.lon, altitude.meters);
                    projection.to_model(&at, reference).distance_from_origin()
                }
            }
        };

        if let Some(min) = &self.min_altitude {
            if distance < bound_distance(min) {
                return false;
            }
        }
        if let Some(max) = &self.max_altitude {
            if distance > bound_distance(max) {
                return false;
            }
        }
        true
    }
}
