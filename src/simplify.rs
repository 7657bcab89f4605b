//! # Corner-Aware Path Simplification
//!
//! Ramer-Douglas-Peucker simplification measured in meters, with an optional
//! union of detected corners.
//!
//! ## Algorithm
//! 1. Keep both endpoints of the segment under consideration
//! 2. Find the interior point furthest from the chord (see
//!    [`perpendicular_distance`](crate::geo_utils::perpendicular_distance))
//! 3. If it deviates more than `epsilon_meters`, split there and repeat on both halves
//! 4. Otherwise the two endpoints represent the whole segment
//! 5. Optionally add every corner from [`detect_corners`]
//!
//! Distance-only simplification can drop a sharp turn whose deviation from a
//! long chord is small (a hairpin in the middle of a long straight); step 5
//! keeps such turns.
//!
//! The segment recursion runs on an explicit stack so long tracks cannot
//! overflow the call stack.

use log::debug;

use crate::corners::detect_corners;
use crate::geo_utils::perpendicular_distance;
use crate::{GpsPoint, SimplifyConfig};

/// Indices of the points to keep, ascending and without duplicates.
///
/// Inputs of two points or fewer are returned whole. For non-empty input the
/// result always contains `0` and `points.len() - 1`.
///
/// # Example
///
/// ```rust
/// use ride_planner::{GpsPoint, SimplifyConfig, simplify};
///
/// let straight: Vec<GpsPoint> = (0..20)
///     .map(|i| GpsPoint::new(45.0 + i as f64 * 0.0005, 6.0))
///     .collect();
///
/// let config = SimplifyConfig { preserve_corners: false, ..Default::default() };
/// assert_eq!(simplify(&straight, &config), vec![0, 19]);
/// ```
pub fn simplify(points: &[GpsPoint], config: &SimplifyConfig) -> Vec<usize> {
    if points.len() <= 2 {
        return (0..points.len()).collect();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut segments = vec![(0usize, last)];
    while let Some((start, end)) = segments.pop() {
        if start + 1 >= end {
            continue;
        }

        let mut furthest = start;
        let mut max_distance = 0.0;
        for i in (start + 1)..end {
            let distance = perpendicular_distance(&points[i], &points[start], &points[end]);
            if distance > max_distance {
                max_distance = distance;
                furthest = i;
            }
        }

        if max_distance > config.epsilon_meters {
            keep[furthest] = true;
            segments.push((furthest, end));
            segments.push((start, furthest));
        }
    }

    if config.preserve_corners {
        for corner in detect_corners(points, config.corner_angle_threshold) {
            keep[corner] = true;
        }
    }

    let kept: Vec<usize> = keep
        .iter()
        .enumerate()
        .filter_map(|(i, &k)| if k { Some(i) } else { None })
        .collect();

    debug!(
        "[Simplify] {} -> {} points (epsilon {}m, corners {})",
        points.len(),
        kept.len(),
        config.epsilon_meters,
        config.preserve_corners
    );

    kept
}

/// Simplify a path and return the kept points rather than their indices.
pub fn simplify_points(points: &[GpsPoint], config: &SimplifyConfig) -> Vec<GpsPoint> {
    simplify(points, config)
        .into_iter()
        .map(|i| points[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_corners(epsilon_meters: f64) -> SimplifyConfig {
        SimplifyConfig {
            epsilon_meters,
            preserve_corners: false,
            corner_angle_threshold: 30.0,
        }
    }

    fn is_strictly_ascending(indices: &[usize]) -> bool {
        indices.windows(2).all(|w| w[0] < w[1])
    }

    /// Gentle sine wiggle with amplitude in degrees of latitude.
    fn wiggle(n: usize, amplitude: f64) -> Vec<GpsPoint> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                GpsPoint::new(45.0 + (t * 0.7).sin() * amplitude, 6.0 + t * 0.0005)
            })
            .collect()
    }

    #[test]
    fn test_trivial_inputs_returned_whole() {
        let config = SimplifyConfig::default();
        assert!(simplify(&[], &config).is_empty());
        assert_eq!(simplify(&[GpsPoint::new(1.0, 1.0)], &config), vec![0]);
        assert_eq!(
            simplify(&[GpsPoint::new(1.0, 1.0), GpsPoint::new(1.0, 1.0)], &config),
            vec![0, 1]
        );
    }

    #[test]
    fn test_straight_line_collapses_to_endpoints() {
        let line: Vec<GpsPoint> = (0..50).map(|i| GpsPoint::new(0.0, i as f64 * 0.001)).collect();
        assert_eq!(simplify(&line, &no_corners(10.0)), vec![0, 49]);
    }

    #[test]
    fn test_duplicate_points_are_dropped() {
        let p = GpsPoint::new(45.0, 6.0);
        let points = vec![p, p, p, p];
        assert_eq!(simplify(&points, &SimplifyConfig::default()), vec![0, 3]);
    }

    #[test]
    fn test_significant_deviation_is_kept() {
        // Middle point about 111m off the chord
        let points = vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.001, 0.001),
            GpsPoint::new(0.0, 0.002),
        ];
        assert_eq!(simplify(&points, &no_corners(10.0)), vec![0, 1, 2]);
        assert_eq!(simplify(&points, &no_corners(200.0)), vec![0, 2]);
    }

    #[test]
    fn test_jog_kept_only_with_corner_preservation() {
        // East for 1km, a ~5m jog north, then east again
        let mut points: Vec<GpsPoint> =
            (0..=10).map(|i| GpsPoint::new(0.0, i as f64 * 0.001)).collect();
        points.extend((0..=10).map(|i| GpsPoint::new(0.00005, 0.010 + i as f64 * 0.001)));

        let without = simplify(&points, &no_corners(10.0));
        assert_eq!(without, vec![0, 21]);

        let with = simplify(&points, &SimplifyConfig::default());
        assert_eq!(with, vec![0, 10, 11, 21]);
    }

    #[test]
    fn test_output_invariants_on_noisy_track() {
        for amplitude in [0.00001, 0.0001, 0.001] {
            let points = wiggle(200, amplitude);
            for config in [SimplifyConfig::default(), no_corners(10.0), no_corners(50.0)] {
                let kept = simplify(&points, &config);
                assert_eq!(kept.first(), Some(&0));
                assert_eq!(kept.last(), Some(&199));
                assert!(is_strictly_ascending(&kept));
            }
        }
    }

    #[test]
    fn test_larger_epsilon_keeps_fewer_points() {
        let points = wiggle(200, 0.0005);
        let fine = simplify(&points, &no_corners(5.0));
        let coarse = simplify(&points, &no_corners(100.0));
        assert!(coarse.len() <= fine.len());
    }

    #[test]
    fn test_simplify_points_matches_indices() {
        let points = vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.001, 0.001),
            GpsPoint::new(0.0, 0.002),
            GpsPoint::new(0.0, 0.003),
        ];
        let indices = simplify(&points, &SimplifyConfig::default());
        let kept = simplify_points(&points, &SimplifyConfig::default());
        assert_eq!(kept.len(), indices.len());
        for (p, i) in kept.iter().zip(indices) {
            assert_eq!(*p, points[i]);
        }
    }
}
