//! Track to waypoint conversion.
//!
//! Imported tracks hold thousands of points; the editor wants a handful of
//! waypoints the router can reconnect. Conversion runs in two stages:
//!
//! 1. [`extract_waypoints_from_track`] keeps the start, the end and every corner.
//! 2. [`decimated_waypoints`] simplifies that coarse set again, dropping corner
//!    points that sit within a few meters of the line between their neighbours.
//!
//! Interior waypoints are labeled `Point 1`, `Point 2`, ... in output order at
//! every stage, so numbers always follow the order of travel.

use crate::corners::detect_corners;
use crate::simplify::simplify;
use crate::{ExtractConfig, GpsPoint, SimplifyConfig, Waypoint};

/// Label `points[indices[k]]` as Start / End / `Point {k}`.
///
/// `indices` must be ascending; index 0 is the start and the last index of
/// `points` is the end.
fn label_indices(points: &[GpsPoint], indices: &[usize]) -> Vec<Waypoint> {
    let last = points.len().saturating_sub(1);
    let mut interior = 0;

    indices
        .iter()
        .map(|&index| {
            let label = if index == 0 {
                "Start".to_string()
            } else if index == last {
                "End".to_string()
            } else {
                interior += 1;
                format!("Point {}", interior)
            };
            Waypoint::with_label(points[index], label)
        })
        .collect()
}

/// Coarse waypoints: the start, every corner, and the end of `track`.
///
/// An empty track yields no waypoints; a single-point track yields one `Start`.
pub fn extract_waypoints_from_track(track: &[GpsPoint], angle_threshold: f64) -> Vec<Waypoint> {
    if track.is_empty() {
        return Vec::new();
    }

    let mut indices = Vec::with_capacity(2);
    indices.push(0);
    indices.extend(detect_corners(track, angle_threshold));
    indices.push(track.len() - 1);
    // Corners are strictly interior, so only a single-point track repeats an index
    indices.dedup();

    label_indices(track, &indices)
}

/// Simplify `points` and label the survivors as waypoints.
pub fn decimated_waypoints(points: &[GpsPoint], config: &SimplifyConfig) -> Vec<Waypoint> {
    if points.is_empty() {
        return Vec::new();
    }

    let indices = simplify(points, config);
    label_indices(points, &indices)
}

/// Full pipeline: corners first, then corner-aware simplification of the result.
///
/// Output follows the track's order of travel.
///
/// # Example
///
/// ```rust
/// use ride_planner::{GpsPoint, ExtractConfig, extract_waypoints};
///
/// assert!(extract_waypoints(&[], &ExtractConfig::default()).is_empty());
/// ```
pub fn extract_waypoints(track: &[GpsPoint], config: &ExtractConfig) -> Vec<Waypoint> {
    let coarse: Vec<GpsPoint> = extract_waypoints_from_track(track, config.angle_threshold)
        .into_iter()
        .map(|wp| wp.position)
        .collect();

    let waypoints = decimated_waypoints(&coarse, &config.decimation);

    log::debug!(
        "[Extract] track of {} points -> {} corners/endpoints -> {} waypoints",
        track.len(),
        coarse.len(),
        waypoints.len()
    );

    waypoints
}
