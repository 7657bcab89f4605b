//! # Ride Planner
//!
//! Core of a bicycle route planner: turning recorded GPS tracks into a small set
//! of editable waypoints, and managing the waypoint list that drives route
//! requests against an external routing service.
//!
//! This library provides:
//! - Corner detection and corner-aware Ramer-Douglas-Peucker simplification
//! - Waypoint extraction from imported tracks
//! - A write-through, position-addressed waypoint store
//! - A route session with profile selection, response caching and stale-response guarding
//! - GPX import and export
//!
//! ## Features
//!
//! - **`http`** - Enable the BRouter HTTP client
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use ride_planner::{GpsPoint, ExtractConfig, extract_waypoints};
//!
//! // An L-shaped track: north, then east
//! let track = vec![
//!     GpsPoint::new(0.0, 0.0),
//!     GpsPoint::new(0.001, 0.0),
//!     GpsPoint::new(0.001, 0.002),
//! ];
//!
//! let waypoints = extract_waypoints(&track, &ExtractConfig::default());
//! assert_eq!(waypoints.len(), 3);
//! assert_eq!(waypoints[0].label, "Start");
//! assert_eq!(waypoints[2].label, "End");
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{PlannerError, Result};

// Bearings, cross-track distance, great-circle helpers
pub mod geo_utils;

// Direction-change detection
pub mod corners;
pub use corners::detect_corners;

// Corner-aware Ramer-Douglas-Peucker simplification
pub mod simplify;
pub use simplify::{simplify, simplify_points};

// Track to waypoint conversion
pub mod extract;
pub use extract::{decimated_waypoints, extract_waypoints, extract_waypoints_from_track};

// Durable key-value state
pub mod storage;
pub use storage::{FileStorage, MemoryStorage, StateStorage};

// Ordered, persisted waypoint list
pub mod waypoints;
pub use waypoints::WaypointStore;

// Routing profiles, route responses and the routing collaborator seam
pub mod routing;
pub use routing::{
    AltitudeSample, FormattedStats, RouteMessage, RoutePath, RouteProfile, RouteProvider,
    RouteStats, RouteVertex,
};

// Editing session tying waypoints, profile and routing together
pub mod session;
pub use session::{
    best_insertion_index, RouteKey, RouteRequest, RouteRequestPlan, RouteSession, RouteUpdate,
    SessionConfig,
};

// GPX import/export
pub mod gpx_file;
pub use gpx_file::{export_gpx, import_gpx, ImportedGpx};

// HTTP client for the BRouter service
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::{BrouterClient, BrouterConfig};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use ride_planner::GpsPoint;
/// let point = GpsPoint::new(48.8566, 2.3522); // Paris
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    /// Recording time (Unix timestamp, seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
}

impl GpsPoint {
    /// Create a new GPS point without elevation or time.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
            time: None,
        }
    }

    /// Create a new GPS point with elevation.
    pub fn with_elevation(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: Some(elevation),
            time: None,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// A point of interest along a route.
///
/// Waypoints have no identity of their own: within a [`WaypointStore`] they
/// are addressed by position, and reordering renumbers them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: GpsPoint,
    /// Free text, empty by default
    #[serde(default)]
    pub label: String,
}

impl Waypoint {
    /// Create an unlabeled waypoint.
    pub fn new(position: GpsPoint) -> Self {
        Self {
            position,
            label: String::new(),
        }
    }

    /// Create a labeled waypoint.
    pub fn with_label(position: GpsPoint, label: impl Into<String>) -> Self {
        Self {
            position,
            label: label.into(),
        }
    }

    /// Label to show for this waypoint at `index` in a list of `total`.
    ///
    /// Falls back to [`placeholder_label`] when the waypoint has no label.
    pub fn display_label(&self, index: usize, total: usize) -> String {
        if self.label.is_empty() {
            placeholder_label(index, total)
        } else {
            self.label.clone()
        }
    }
}

/// Default label for an unlabeled waypoint: `Start`, `End` or `Point {index}`.
pub fn placeholder_label(index: usize, total: usize) -> String {
    if index == 0 {
        "Start".to_string()
    } else if index + 1 == total {
        "End".to_string()
    } else {
        format!("Point {}", index)
    }
}

/// Partial update merged into an existing waypoint.
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaypointUpdate {
    pub position: Option<GpsPoint>,
    pub label: Option<String>,
}

impl WaypointUpdate {
    /// Update only the position.
    pub fn position(position: GpsPoint) -> Self {
        Self {
            position: Some(position),
            label: None,
        }
    }

    /// Update only the label.
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            position: None,
            label: Some(label.into()),
        }
    }

    pub(crate) fn apply_to(self, waypoint: &mut Waypoint) {
        if let Some(position) = self.position {
            waypoint.position = position;
        }
        if let Some(label) = self.label {
            waypoint.label = label;
        }
    }
}

/// Configuration for path simplification.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplifyConfig {
    /// Maximum perpendicular deviation (meters) before a point is kept.
    /// Default: 10.0
    pub epsilon_meters: f64,

    /// Always keep detected corners, even when the distance test drops them.
    /// Default: true
    pub preserve_corners: bool,

    /// Bearing change (degrees) above which a point is a corner.
    /// Default: 30.0
    pub corner_angle_threshold: f64,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self {
            epsilon_meters: 10.0,
            preserve_corners: true,
            corner_angle_threshold: corners::DEFAULT_ANGLE_THRESHOLD,
        }
    }
}

/// Configuration for track to waypoint extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractConfig {
    /// Corner threshold for the coarse corner pass (degrees).
    /// Default: 30.0
    pub angle_threshold: f64,

    /// Simplification applied to the coarse waypoint set.
    /// Default: 20m epsilon, corners preserved at 30 degrees
    pub decimation: SimplifyConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            angle_threshold: corners::DEFAULT_ANGLE_THRESHOLD,
            decimation: SimplifyConfig {
                epsilon_meters: 20.0,
                preserve_corners: true,
                corner_angle_threshold: corners::DEFAULT_ANGLE_THRESHOLD,
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
