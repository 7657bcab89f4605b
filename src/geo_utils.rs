//! # Geographic Utilities
//!
//! Geometry primitives used by corner detection, simplification and the
//! route session.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`bearing`] | Initial compass bearing from one point to another |
//! | [`perpendicular_distance`] | Distance from a point to the chord through two others |
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`polyline_length`] | Total length of a GPS track in meters |
//! | [`compute_bounds`] | Bounding box of a GPS track |
//!
//! ## Example
//!
//! ```rust
//! use ride_planner::{GpsPoint, geo_utils};
//!
//! let a = GpsPoint::new(0.0, 0.0);
//! let b = GpsPoint::new(0.0, 0.001);
//!
//! // Due east
//! assert!((geo_utils::bearing(&a, &b) - 90.0).abs() < 1e-6);
//!
//! // A point 0.001 degrees north of the chord is roughly 111 m away from it
//! let p = GpsPoint::new(0.001, 0.0005);
//! let d = geo_utils::perpendicular_distance(&p, &a, &b);
//! assert!((d - 111.2).abs() < 1.0);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Perpendicular distance
//!
//! Points are projected onto a sphere of radius [`EARTH_RADIUS_M`] in an
//! Earth-centered Cartesian frame. The distance is the height of the triangle
//! (start, end, point) over the chord start-end: twice the triangle area
//! (the cross-product magnitude) divided by the chord length. For the short
//! segments found in GPS tracks the chord is indistinguishable from the
//! surface arc.
//!
//! ### Limitations
//!
//! Bearings near the poles and segments crossing the antimeridian are not
//! specially handled.

use geo::{Distance, Haversine, Point};

use crate::{Bounds, GpsPoint};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

// =============================================================================
// Direction Functions
// =============================================================================

/// Initial compass bearing from `from` to `to`, in degrees within `[0, 360)`.
///
/// Uses the standard spherical forward-azimuth formula. Identical points give
/// a bearing of 0.
///
/// # Example
///
/// ```rust
/// use ride_planner::{GpsPoint, geo_utils};
///
/// let south = GpsPoint::new(0.0, 0.0);
/// let north = GpsPoint::new(1.0, 0.0);
///
/// assert!(geo_utils::bearing(&south, &north).abs() < 1e-9);
/// assert!((geo_utils::bearing(&north, &south) - 180.0).abs() < 1e-9);
/// ```
pub fn bearing(from: &GpsPoint, to: &GpsPoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lng = (to.longitude - from.longitude).to_radians();

    let y = d_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lng.cos();

    let degrees = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can round a tiny negative angle up to exactly 360
    if degrees >= 360.0 {
        0.0
    } else {
        degrees
    }
}

/// Smallest absolute difference between two bearings, in degrees within `[0, 180]`.
#[inline]
pub fn bearing_difference(b1: f64, b2: f64) -> f64 {
    let diff = (b2 - b1).abs();
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

// =============================================================================
// Distance Functions
// =============================================================================

#[inline]
fn to_cartesian(p: &GpsPoint) -> [f64; 3] {
    let lat = p.latitude.to_radians();
    let lng = p.longitude.to_radians();
    [
        EARTH_RADIUS_M * lat.cos() * lng.cos(),
        EARTH_RADIUS_M * lat.cos() * lng.sin(),
        EARTH_RADIUS_M * lat.sin(),
    ]
}

/// Distance in meters from `point` to the chord through `line_start` and `line_end`.
///
/// Returns 0.0 for a degenerate segment (`line_start` equal to `line_end`),
/// so duplicate points never count as shape features.
///
/// # Arguments
///
/// * `point` - The point to measure
/// * `line_start` - Start of the chord
/// * `line_end` - End of the chord
pub fn perpendicular_distance(point: &GpsPoint, line_start: &GpsPoint, line_end: &GpsPoint) -> f64 {
    let p1 = to_cartesian(line_start);
    let p2 = to_cartesian(line_end);
    let p = to_cartesian(point);

    let v = [p2[0] - p1[0], p2[1] - p1[1], p2[2] - p1[2]];
    let w = [p[0] - p1[0], p[1] - p1[1], p[2] - p1[2]];

    let cross = [
        v[1] * w[2] - v[2] * w[1],
        v[2] * w[0] - v[0] * w[2],
        v[0] * w[1] - v[1] * w[0],
    ];

    let area = (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt() / 2.0;
    let line_length = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();

    if line_length == 0.0 {
        0.0
    } else {
        2.0 * area / line_length
    }
}

/// Calculate the great-circle distance between two GPS points using the Haversine formula.
///
/// Returns the distance in meters along the Earth's surface.
///
/// # Example
///
/// ```rust
/// use ride_planner::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Calculate the total length of a polyline in meters.
///
/// Sums the haversine distance between consecutive points. Empty or single-point
/// tracks return 0.0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a GPS track.
///
/// Returns `None` for empty input.
///
/// # Example
///
/// ```rust
/// use ride_planner::{GpsPoint, geo_utils};
///
/// let track = vec![
///     GpsPoint::new(51.5000, -0.1300),
///     GpsPoint::new(51.5100, -0.1200),
///     GpsPoint::new(51.5050, -0.1250),
/// ];
///
/// let bounds = geo_utils::compute_bounds(&track).unwrap();
/// assert_eq!(bounds.min_lat, 51.5000);
/// assert_eq!(bounds.max_lng, -0.1200);
/// ```
pub fn compute_bounds(points: &[GpsPoint]) -> Option<Bounds> {
    if points.is_empty() {
        return None;
    }

    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for p in points {
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
        min_lng = min_lng.min(p.longitude);
        max_lng = max_lng.max(p.longitude);
    }

    Some(Bounds { min_lat, max_lat, min_lng, max_lng })
}

// =============================================================================
// Unit Tests
// =============================================================================
