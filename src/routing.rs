//! Routing profiles, route responses and the routing collaborator seam.
//!
//! Route computation itself happens in an external service (BRouter). This
//! module decodes its GeoJSON answer into a [`RoutePath`] and derives what the
//! editor displays from it: the line, headline stats and the elevation profile.
//!
//! BRouter reports most numeric properties as strings and prefixes the
//! `messages` table with a header row, e.g.
//!
//! ```text
//! ["Longitude", "Latitude", "Elevation", "Distance", "CostPerKm", ...]
//! ["2352200", "48856600", "35", "120", "1150", ...]
//! ```
//!
//! where `Distance` is the distance from the previous message, in meters.

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PlannerError, Result};
use crate::geo_utils::{compute_bounds, polyline_length};
use crate::{Bounds, GpsPoint};

// ============================================================================
// Profiles
// ============================================================================

/// Routing style used by the external router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteProfile {
    /// Prefers cycle infrastructure and quiet roads
    #[default]
    Safety,
    Trekking,
    FastBike,
    Shortest,
}

impl RouteProfile {
    /// Every profile, in display order.
    pub const ALL: [RouteProfile; 4] = [
        RouteProfile::Safety,
        RouteProfile::Trekking,
        RouteProfile::FastBike,
        RouteProfile::Shortest,
    ];

    /// Profile name as understood by the router.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteProfile::Safety => "safety",
            RouteProfile::Trekking => "trekking",
            RouteProfile::FastBike => "fastbike",
            RouteProfile::Shortest => "shortest",
        }
    }
}

impl fmt::Display for RouteProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteProfile {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self> {
        RouteProfile::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PlannerError::Routing(format!("unknown routing profile '{}'", s)))
    }
}

// ============================================================================
// Route path
// ============================================================================

/// One vertex of the routed polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteVertex {
    pub longitude: f64,
    pub latitude: f64,
    pub elevation: Option<f64>,
}

/// One row of the router's per-segment message table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteMessage {
    /// Elevation at the message point (meters)
    pub elevation: f64,
    /// Distance from the previous message point (meters)
    pub distance: f64,
}

/// A point of the altitude-vs-distance profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltitudeSample {
    /// Cumulative distance from the start (meters)
    pub distance: f64,
    /// Altitude (meters)
    pub altitude: f64,
}

/// Headline numbers for a route.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RouteStats {
    pub distance_m: f64,
    pub duration_s: f64,
    pub ascent_m: f64,
}

/// [`RouteStats`] rendered for display, `-` where a value is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedStats {
    /// Kilometers with two decimals, e.g. `12.35 km`
    pub distance: String,
    /// `H:MM:SS`
    pub duration: String,
    /// Whole meters, e.g. `420 m`
    pub ascent: String,
}

impl RouteStats {
    pub fn formatted(&self) -> FormattedStats {
        let distance = if self.distance_m > 0.0 {
            format!("{:.2} km", self.distance_m / 1000.0)
        } else {
            "-".to_string()
        };

        let duration = if self.duration_s > 0.0 {
            let total = self.duration_s.round() as u64;
            format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
        } else {
            "-".to_string()
        };

        let ascent = if self.ascent_m > 0.0 {
            format!("{:.0} m", self.ascent_m)
        } else {
            "-".to_string()
        };

        FormattedStats { distance, duration, ascent }
    }
}

/// A computed route as returned by the routing collaborator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoutePath {
    /// Routed polyline
    pub vertices: Vec<RouteVertex>,
    /// Total length (meters)
    pub distance_m: f64,
    /// Estimated riding time (seconds)
    pub duration_s: f64,
    /// Total climbing (meters)
    pub ascent_m: f64,
    /// Seconds from the start at each vertex, parallel to `vertices` when present.
    /// `None` where the router sent an unreadable entry.
    pub times: Vec<Option<f64>>,
    /// Per-segment messages, header row removed
    pub messages: Vec<RouteMessage>,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<Vec<f64>>,
}

/// Numbers arrive either as JSON numbers or as numeric strings.
///
/// Non-finite values (`"NaN"`, `"inf"`) are treated as unreadable.
fn number(value: Option<&Value>) -> Option<f64> {
    let parsed: Option<f64> = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn parse_messages(value: Option<&Value>) -> Vec<RouteMessage> {
    let Some(Value::Array(rows)) = value else {
        return Vec::new();
    };

    rows.iter()
        .skip(1)
        .filter_map(|row| {
            let elevation = number(row.get(2));
            let distance = number(row.get(3));
            match (elevation, distance) {
                (Some(elevation), Some(distance)) => Some(RouteMessage { elevation, distance }),
                _ => {
                    warn!("[RoutePath] Skipping unreadable message row: {}", row);
                    None
                }
            }
        })
        .collect()
}

impl RoutePath {
    /// Decode a BRouter GeoJSON `FeatureCollection`.
    ///
    /// Only the first feature is used. Fails when the document is not a
    /// feature collection, has no features, or has fewer than two vertices.
    pub fn from_geojson(json: &str) -> Result<Self> {
        let collection: FeatureCollection = serde_json::from_str(json)
            .map_err(|e| PlannerError::MalformedRoute(format!("not a feature collection: {}", e)))?;

        let feature = collection
            .features
            .into_iter()
            .next()
            .ok_or_else(|| PlannerError::MalformedRoute("no features".to_string()))?;

        let vertices: Vec<RouteVertex> = feature
            .geometry
            .coordinates
            .iter()
            .map(|c| match c.as_slice() {
                [lng, lat, ele, ..] => Ok(RouteVertex {
                    longitude: *lng,
                    latitude: *lat,
                    elevation: Some(*ele),
                }),
                [lng, lat] => Ok(RouteVertex {
                    longitude: *lng,
                    latitude: *lat,
                    elevation: None,
                }),
                _ => Err(PlannerError::MalformedRoute(format!("bad coordinate {:?}", c))),
            })
            .collect::<Result<_>>()?;

        if vertices.len() < 2 {
            return Err(PlannerError::MalformedRoute(format!(
                "route has {} vertices",
                vertices.len()
            )));
        }

        let props = &feature.properties;
        let times = match props.get("times") {
            // Kept index-aligned with the vertices
            Some(Value::Array(values)) => values.iter().map(|v| number(Some(v))).collect(),
            _ => Vec::new(),
        };
        let messages = parse_messages(props.get("messages"));

        let mut path = RoutePath {
            vertices,
            distance_m: 0.0,
            duration_s: number(props.get("total-time")).unwrap_or(0.0),
            ascent_m: number(props.get("filtered ascend"))
                .or_else(|| number(props.get("plain-ascend")))
                .unwrap_or(0.0),
            times,
            messages,
        };
        path.distance_m =
            number(props.get("track-length")).unwrap_or_else(|| path.message_distance());
        if path.distance_m == 0.0 {
            path.distance_m = polyline_length(&path.line());
        }

        Ok(path)
    }

    /// Polyline as GPS points, for drawing.
    pub fn line(&self) -> Vec<GpsPoint> {
        self.vertices
            .iter()
            .map(|v| GpsPoint {
                latitude: v.latitude,
                longitude: v.longitude,
                elevation: v.elevation,
                time: None,
            })
            .collect()
    }

    /// Sum of the per-message distance deltas.
    pub fn message_distance(&self) -> f64 {
        self.messages.iter().map(|m| m.distance).sum()
    }

    /// Altitude against cumulative distance, one sample per message.
    pub fn altitude_profile(&self) -> Vec<AltitudeSample> {
        let mut cumulative = 0.0;
        self.messages
            .iter()
            .map(|m| {
                cumulative += m.distance;
                AltitudeSample {
                    distance: cumulative,
                    altitude: m.elevation,
                }
            })
            .collect()
    }

    pub fn stats(&self) -> RouteStats {
        RouteStats {
            distance_m: self.distance_m,
            duration_s: self.duration_s,
            ascent_m: self.ascent_m,
        }
    }

    /// Bounding box of the routed line.
    pub fn bounds(&self) -> Option<Bounds> {
        compute_bounds(&self.line())
    }
}

// ============================================================================
// Collaborator
// ============================================================================

/// Anything that can compute a route through ordered waypoints.
pub trait RouteProvider {
    /// Route through `waypoints` (at least two) using `profile`.
    fn fetch_route(&self, waypoints: &[GpsPoint], profile: RouteProfile) -> Result<RoutePath>;
}

// ============================================================================
// Tests
// ============================================================================
