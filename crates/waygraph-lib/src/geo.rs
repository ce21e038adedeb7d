//! Coordinate helpers: great-circle distances, rectangles, and path points.
//!
//! All coordinates are WGS84 degrees stored as `(lon, lat)`.

use serde::Serialize;

use crate::db::NodeId;
use crate::error::{Error, Result};

/// Mean earth radius in meters used for every stored edge length.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Squared planar distance in degree space.
    ///
    /// Used for nearest-node snapping only; no projection correction is applied.
    pub fn planar_distance_sq(&self, other: &Self) -> f64 {
        let dlon = self.lon - other.lon;
        let dlat = self.lat - other.lat;
        dlon * dlon + dlat * dlat
    }
}

/// Great-circle distance between two coordinates in degrees, in meters.
///
/// Identical points return exactly `0.0` without evaluating `acos`, whose
/// argument can round to slightly above 1 for equal inputs.
pub fn great_circle_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    if lon1 == lon2 && lat1 == lat2 {
        return 0.0;
    }
    let lon1 = lon1.to_radians();
    let lat1 = lat1.to_radians();
    let lon2 = lon2.to_radians();
    let lat2 = lat2.to_radians();
    let cosine = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * (lon2 - lon1).cos();
    cosine.clamp(-1.0, 1.0).acos() * EARTH_RADIUS_M
}

/// Round a distance to whole meters for storage.
pub fn round_meters(distance: f64) -> u32 {
    distance.round().clamp(0.0, u32::MAX as f64) as u32
}

/// Axis-aligned rectangle in degree space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a rectangle, rejecting inverted or non-finite bounds.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self> {
        let bounds = [min_lon, min_lat, max_lon, max_lat];
        if bounds.iter().any(|value| !value.is_finite()) {
            return Err(Error::InvalidBoundingBox {
                reason: "bounds must be finite".to_string(),
            });
        }
        if min_lon > max_lon || min_lat > max_lat {
            return Err(Error::InvalidBoundingBox {
                reason: format!("min ({min_lon}, {min_lat}) > max ({max_lon}, {max_lat})"),
            });
        }
        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// Smallest rectangle containing every coordinate, or `None` when empty.
    pub fn enclosing<'a>(points: impl IntoIterator<Item = &'a Coordinate>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self {
            min_lon: first.lon,
            min_lat: first.lat,
            max_lon: first.lon,
            max_lat: first.lat,
        };
        for point in iter {
            bbox.min_lon = bbox.min_lon.min(point.lon);
            bbox.min_lat = bbox.min_lat.min(point.lat);
            bbox.max_lon = bbox.max_lon.max(point.lon);
            bbox.max_lat = bbox.max_lat.max(point.lat);
        }
        Some(bbox)
    }

    /// Square query rectangle around two points.
    ///
    /// The square is centred on the midpoint of `a` and `b`; its half-side is
    /// the larger of the two half-extents multiplied by `enlarge`.
    pub fn around_points(a: Coordinate, b: Coordinate, enlarge: f64) -> Result<Self> {
        if !enlarge.is_finite() || enlarge < 0.0 {
            return Err(Error::InvalidBoundingBox {
                reason: format!("enlarge factor {enlarge} must be finite and non-negative"),
            });
        }
        let min_lon = a.lon.min(b.lon);
        let max_lon = a.lon.max(b.lon);
        let min_lat = a.lat.min(b.lat);
        let max_lat = a.lat.max(b.lat);

        let mid_lon = (min_lon + max_lon) / 2.0;
        let mid_lat = (min_lat + max_lat) / 2.0;
        let half = (mid_lon - min_lon).max(mid_lat - min_lat) * enlarge;

        Self::new(
            mid_lon - half,
            mid_lat - half,
            mid_lon + half,
            mid_lat + half,
        )
    }

    /// True when the two rectangles share at least one point.
    pub fn intersects(&self, other: &Self) -> bool {
        self.max_lon >= other.min_lon
            && self.min_lon <= other.max_lon
            && self.max_lat >= other.min_lat
            && self.min_lat <= other.max_lat
    }
}

/// A vertex of a reconstructed path or edge polyline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathPoint {
    pub lon: f64,
    pub lat: f64,
    pub node_id: NodeId,
}

impl PathPoint {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lon, self.lat)
    }
}
