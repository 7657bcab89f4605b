//! End-to-end: import a recorded ride, turn it into waypoints, edit and route
//! them through a session backed by files, and export the result.

use std::cell::Cell;
use std::sync::Arc;

use ride_planner::{
    export_gpx, import_gpx, ExtractConfig, FileStorage, GpsPoint, PlannerError, RoutePath,
    RouteProfile, RouteProvider, RouteSession, RouteUpdate, RouteVertex, SessionConfig,
    WaypointUpdate,
};

/// Router that draws straight lines and counts requests.
#[derive(Default)]
struct StraightLineRouter {
    calls: Cell<usize>,
}

impl RouteProvider for StraightLineRouter {
    fn fetch_route(
        &self,
        waypoints: &[GpsPoint],
        _profile: RouteProfile,
    ) -> ride_planner::Result<RoutePath> {
        self.calls.set(self.calls.get() + 1);
        if waypoints.len() < 2 {
            return Err(PlannerError::Routing("too few waypoints".to_string()));
        }
        Ok(RoutePath {
            vertices: waypoints
                .iter()
                .map(|p| RouteVertex {
                    longitude: p.longitude,
                    latitude: p.latitude,
                    elevation: Some(50.0),
                })
                .collect(),
            distance_m: ride_planner::geo_utils::polyline_length(waypoints),
            duration_s: 60.0 * waypoints.len() as f64,
            times: (0..waypoints.len()).map(|i| Some(i as f64 * 60.0)).collect(),
            ..Default::default()
        })
    }
}

/// Dense recording: 1 km east, then 1 km north, sampled every ~10 m.
fn recorded_ride() -> String {
    let mut points = Vec::new();
    for i in 0..=100 {
        points.push((45.0, 6.0 + i as f64 * 0.0001));
    }
    for i in 1..=100 {
        points.push((45.0 + i as f64 * 0.0001, 6.01));
    }

    let trkpts: String = points
        .iter()
        .map(|(lat, lon)| format!("<trkpt lat=\"{}\" lon=\"{}\"><ele>200</ele></trkpt>", lat, lon))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="recorder" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><name>Morning ride</name><trkseg>{}</trkseg></trk>
</gpx>"#,
        trkpts
    )
}

#[test]
fn import_extract_edit_route_export() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
    let router = StraightLineRouter::default();

    // Import and reduce the recording to its start, corner and end
    let imported = import_gpx(recorded_ride().as_bytes()).unwrap();
    assert_eq!(imported.name.as_deref(), Some("Morning ride"));
    let waypoints = imported.editor_waypoints(&ExtractConfig::default());
    let labels: Vec<&str> = waypoints.iter().map(|w| w.label.as_str()).collect();
    assert_eq!(labels, vec!["Start", "Point 1", "End"]);

    let mut session = RouteSession::open(storage.clone(), SessionConfig::default());
    session.replace_all(waypoints).unwrap();
    session.set_profile(RouteProfile::Trekking).unwrap();

    assert!(matches!(session.refresh(&router), RouteUpdate::Applied));
    let stats = session.stats().unwrap();
    assert!(stats.distance_m > 1500.0 && stats.distance_m < 2500.0);

    // Rename the corner: same route inputs, nothing refetched
    session.update(1, WaypointUpdate::label("Bridge")).unwrap();
    assert!(matches!(session.refresh(&router), RouteUpdate::Cached));
    assert_eq!(router.calls.get(), 1);

    // A new stop near the first leg slots in before the corner
    let index = session.insert_at_best_position(GpsPoint::new(45.0001, 6.005)).unwrap();
    assert_eq!(index, 1);
    assert!(session.current_route().is_none());
    assert!(matches!(session.refresh(&router), RouteUpdate::Applied));
    assert_eq!(session.route_line().len(), 4);

    // Everything survives a restart
    let reopened = RouteSession::open(storage, SessionConfig::default());
    assert_eq!(reopened.profile(), RouteProfile::Trekking);
    assert_eq!(reopened.waypoints(), session.waypoints());
    assert_eq!(reopened.waypoints()[2].label, "Bridge");

    // Export and read back
    let start = time::OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
    let xml = export_gpx(session.waypoints(), session.current_route(), start).unwrap();
    let exported = import_gpx(xml.as_bytes()).unwrap();
    assert_eq!(exported.waypoints.len(), 4);
    assert_eq!(exported.waypoints[2].label, "Bridge");
    assert_eq!(exported.tracks[0].len(), 4);
    assert_eq!(exported.tracks[0][3].time, Some(1_700_000_180));
}

#[test]
fn clearing_waypoints_drops_the_route() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
    let router = StraightLineRouter::default();

    let mut session = RouteSession::open(storage, SessionConfig::default());
    session.add(GpsPoint::new(45.0, 6.0)).unwrap();
    session.add(GpsPoint::new(45.01, 6.01)).unwrap();
    assert!(matches!(session.refresh(&router), RouteUpdate::Applied));

    session.clear().unwrap();
    assert!(matches!(session.refresh(&router), RouteUpdate::NotEnoughWaypoints));
    assert!(session.current_route().is_none());
    assert!(session.route_line().is_empty());
    assert_eq!(router.calls.get(), 1);
}
