//! GPX import and export.
//!
//! Import keeps what the editor needs from a file: its name, any explicit
//! `<wpt>` waypoints, and the points of every track. Export writes GPX 1.1
//! with the editor's waypoints and, when a route is known, the route as a
//! single timed track.

use std::io::Read;

use gpx::{Gpx, GpxVersion, Track, TrackSegment};
use log::{debug, info, warn};
use time::OffsetDateTime;

use crate::error::{PlannerError, Result};
use crate::extract::extract_waypoints;
use crate::routing::RoutePath;
use crate::{ExtractConfig, GpsPoint, Waypoint};

/// Value of the `creator` attribute on exported files.
pub const GPX_CREATOR: &str = "ride-planner";

/// Contents of a GPX file relevant to planning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedGpx {
    /// Metadata name, else the first track's name
    pub name: Option<String>,
    /// Explicit `<wpt>` elements in file order
    pub waypoints: Vec<Waypoint>,
    /// Points of each track, segments concatenated
    pub tracks: Vec<Vec<GpsPoint>>,
}

impl ImportedGpx {
    /// Waypoints to load into the editor.
    ///
    /// A file that carries its own waypoints is taken as is. Otherwise the
    /// first track is reduced with [`extract_waypoints`].
    pub fn editor_waypoints(&self, config: &ExtractConfig) -> Vec<Waypoint> {
        if !self.waypoints.is_empty() {
            return self.waypoints.clone();
        }

        match self.tracks.first() {
            Some(track) => extract_waypoints(track, config),
            None => Vec::new(),
        }
    }
}

fn to_gps_point(wpt: &gpx::Waypoint) -> GpsPoint {
    let point = wpt.point();
    GpsPoint {
        latitude: point.y(),
        longitude: point.x(),
        elevation: wpt.elevation,
        time: wpt
            .time
            .map(|t| OffsetDateTime::from(t).unix_timestamp()),
    }
}

/// Read a GPX document.
pub fn import_gpx<R: Read>(reader: R) -> Result<ImportedGpx> {
    let data: Gpx = gpx::read(reader)?;

    let waypoints: Vec<Waypoint> = data
        .waypoints
        .iter()
        .map(|wpt| Waypoint::with_label(to_gps_point(wpt), wpt.name.clone().unwrap_or_default()))
        .collect();

    let tracks: Vec<Vec<GpsPoint>> = data
        .tracks
        .iter()
        .map(|track| {
            track
                .segments
                .iter()
                .flat_map(|segment| segment.points.iter().map(to_gps_point))
                .collect()
        })
        .collect();

    let name = data
        .metadata
        .as_ref()
        .and_then(|m| m.name.clone())
        .or_else(|| data.tracks.first().and_then(|t| t.name.clone()));

    info!(
        "[GPX] Imported {:?}: {} waypoints, {} tracks ({} points)",
        name,
        waypoints.len(),
        tracks.len(),
        tracks.iter().map(Vec::len).sum::<usize>()
    );

    Ok(ImportedGpx {
        name,
        waypoints,
        tracks,
    })
}

/// Write waypoints and an optional route as a GPX 1.1 document.
///
/// Track points are stamped `start_time + times[i]` seconds. Points past the
/// end of the route's time table, or whose time cannot be represented, carry
/// no timestamp.
pub fn export_gpx(
    waypoints: &[Waypoint],
    route: Option<&RoutePath>,
    start_time: OffsetDateTime,
) -> Result<String> {
    let mut data = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(GPX_CREATOR.to_string()),
        ..Default::default()
    };

    data.waypoints = waypoints
        .iter()
        .map(|wp| {
            let point = geo::Point::new(wp.position.longitude, wp.position.latitude);
            let mut wpt = gpx::Waypoint::new(point);
            wpt.elevation = wp.position.elevation;
            if !wp.label.is_empty() {
                wpt.name = Some(wp.label.clone());
            }
            wpt
        })
        .collect();

    if let Some(route) = route {
        let mut segment = TrackSegment::default();
        segment.points = route
            .vertices
            .iter()
            .enumerate()
            .map(|(i, vertex)| {
                let point = geo::Point::new(vertex.longitude, vertex.latitude);
                let mut wpt = gpx::Waypoint::new(point);
                wpt.elevation = vertex.elevation;
                wpt.time = route
                    .times
                    .get(i)
                    .copied()
                    .flatten()
                    .and_then(time::Duration::checked_seconds_f64)
                    .and_then(|offset| start_time.checked_add(offset))
                    .map(gpx::Time::from);
                if wpt.time.is_none() && route.times.get(i).is_some() {
                    warn!("[GPX] Dropping unrepresentable time for track point {}", i);
                }
                wpt
            })
            .collect();

        let mut track = Track::default();
        track.segments.push(segment);
        data.tracks.push(track);
    }

    let mut buffer = Vec::new();
    gpx::write(&data, &mut buffer).map_err(|e| PlannerError::GpxWrite(e.to_string()))?;
    let xml = String::from_utf8(buffer).map_err(|e| PlannerError::GpxWrite(e.to_string()))?;

    debug!(
        "[GPX] Exported {} waypoints, {} track points ({} bytes)",
        waypoints.len(),
        route.map_or(0, |r| r.vertices.len()),
        xml.len()
    );

    Ok(xml)
}
