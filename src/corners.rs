//! Direction-change (corner) detection.
//!
//! A point is a corner when the bearing of the segment arriving at it and the
//! bearing of the segment leaving it differ by more than a threshold angle.

use crate::geo_utils::{bearing, bearing_difference};
use crate::GpsPoint;

/// Default corner threshold in degrees.
pub const DEFAULT_ANGLE_THRESHOLD: f64 = 30.0;

/// Indices of interior points where the direction of travel changes by more
/// than `angle_threshold` degrees.
///
/// The first and last points are never corners. Fewer than three points
/// yields an empty result. Output is ascending.
///
/// # Example
///
/// ```rust
/// use ride_planner::{GpsPoint, detect_corners};
///
/// let l_shape = vec![
///     GpsPoint::new(0.0, 0.0),
///     GpsPoint::new(0.0, 10.0),
///     GpsPoint::new(10.0, 10.0),
/// ];
/// assert_eq!(detect_corners(&l_shape, 30.0), vec![1]);
/// ```
pub fn detect_corners(points: &[GpsPoint], angle_threshold: f64) -> Vec<usize> {
    if points.len() < 3 {
        return Vec::new();
    }

    points
        .windows(3)
        .enumerate()
        .filter_map(|(i, w)| {
            let incoming = bearing(&w[0], &w[1]);
            let outgoing = bearing(&w[1], &w[2]);
            if bearing_difference(incoming, outgoing) > angle_threshold {
                Some(i + 1)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_few_points() {
        assert!(detect_corners(&[], 30.0).is_empty());
        assert!(detect_corners(&[GpsPoint::new(0.0, 0.0)], 30.0).is_empty());
        let two = [GpsPoint::new(0.0, 0.0), GpsPoint::new(1.0, 1.0)];
        assert!(detect_corners(&two, 30.0).is_empty());
    }

    #[test]
    fn test_straight_line_has_no_corners() {
        let line: Vec<GpsPoint> = (0..10)
            .map(|i| GpsPoint::new(45.0 + i as f64 * 0.001, 6.0))
            .collect();
        assert!(detect_corners(&line, 30.0).is_empty());
    }

    #[test]
    fn test_l_shape() {
        let points = vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.0, 10.0),
            GpsPoint::new(10.0, 10.0),
        ];
        assert_eq!(detect_corners(&points, 30.0), vec![1]);
    }

    #[test]
    fn test_threshold() {
        // Right-angle turn
        let points = vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.0, 0.001),
            GpsPoint::new(0.001, 0.001),
        ];
        assert_eq!(detect_corners(&points, 45.0), vec![1]);
        assert!(detect_corners(&points, 90.5).is_empty());
    }

    #[test]
    fn test_zigzag_reports_every_turn_in_order() {
        let points = vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.001, 0.0),
            GpsPoint::new(0.001, 0.001),
            GpsPoint::new(0.002, 0.001),
            GpsPoint::new(0.002, 0.002),
            GpsPoint::new(0.002, 0.003),
        ];
        assert_eq!(detect_corners(&points, 30.0), vec![1, 2, 3]);
    }

    #[test]
    fn test_u_turn_is_a_corner() {
        let points = vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.001, 0.0),
            GpsPoint::new(0.0, 0.0),
        ];
        assert_eq!(detect_corners(&points, 170.0), vec![1]);
    }
}
