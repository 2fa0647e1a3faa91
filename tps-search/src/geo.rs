//! Geospatial candidate box and distance refinement
//!
//! Location search runs in two phases: a cheap coordinate range check that
//! over-approximates the search circle, then an exact haversine distance
//! that discards the false positives.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Approximate miles per degree of latitude
pub const MILES_PER_DEGREE: f64 = 69.0;

/// Boxes reaching past this latitude get a warning (longitude compression)
const HIGH_LATITUDE_WARNING: f64 = 60.0;

/// Radii above this get a warning (flat-degree approximation)
const LARGE_RADIUS_WARNING_MILES: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both coordinates or nothing
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lng)) => Some(Self::new(lat, lng)),
            _ => None,
        }
    }
}

/// Axis-aligned coordinate range containing the search circle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    /// Box around `center` that contains every point within `radius_miles`.
    ///
    /// Latitude delta is `radius / 69`. The longitude delta is widened by
    /// `1 / cos` of the most poleward latitude in the box, so the box stays a
    /// superset of the circle away from the equator. Boxes touching a pole or
    /// crossing the antimeridian span every longitude.
    pub fn around(center: GeoPoint, radius_miles: f64) -> Self {
        let lat_delta = radius_miles / MILES_PER_DEGREE;
        let poleward = center.latitude.abs() + lat_delta;

        if poleward > HIGH_LATITUDE_WARNING || radius_miles > LARGE_RADIUS_WARNING_MILES {
            warn!(
                latitude = center.latitude,
                radius_miles, "Bounding box approximation is coarse at this latitude/radius"
            );
        }

        let (min_longitude, max_longitude) = if poleward >= 90.0 {
            (-180.0, 180.0)
        } else {
            let lng_delta = lat_delta / poleward.to_radians().cos();
            let min = center.longitude - lng_delta;
            let max = center.longitude + lng_delta;
            if min < -180.0 || max > 180.0 {
                (-180.0, 180.0)
            } else {
                (min, max)
            }
        };

        Self {
            min_latitude: (center.latitude - lat_delta).max(-90.0),
            max_latitude: (center.latitude + lat_delta).min(90.0),
            min_longitude,
            max_longitude,
        }
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&point.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&point.longitude)
    }
}

/// Great-circle distance in miles
pub fn haversine_miles(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Keep the candidates whose exact distance is within the radius (inclusive).
///
/// Candidates without a position are dropped. Input order is preserved.
pub fn refine<T>(
    center: GeoPoint,
    radius_miles: f64,
    candidates: impl IntoIterator<Item = T>,
    position: impl Fn(&T) -> Option<GeoPoint>,
) -> Vec<(T, f64)> {
    candidates
        .into_iter()
        .filter_map(|candidate| {
            let point = position(&candidate)?;
            let distance = haversine_miles(center, point);
            (distance <= radius_miles).then_some((candidate, distance))
        })
        .collect()
}
