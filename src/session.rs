//! # Route Session
//!
//! Ties the waypoint list and the selected profile to the routing collaborator.
//!
//! ## Request lifecycle
//!
//! 1. [`RouteSession::prepare_request`] decides whether a route is needed. With
//!    fewer than two waypoints nothing is requested and no route is shown. A
//!    fresh cache entry for the current `(positions, profile)` key is applied
//!    immediately. Otherwise a [`RouteRequest`] is handed out.
//! 2. The caller runs the request against the router, synchronously or not.
//! 3. [`RouteRequest`]s carry the session generation at the time they were
//!    issued. [`RouteSession::complete_request`] applies a response only if no
//!    edit changed the route inputs in the meantime, or if the edits led back
//!    to the same key. Otherwise the response is cached under its own key and
//!    discarded.
//!
//! [`RouteSession::refresh`] runs the three steps against a blocking provider.
//!
//! Label-only edits do not change the key, so they neither bump the
//! generation nor drop the current route.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::{PlannerError, Result};
use crate::geo_utils::haversine_distance;
use crate::routing::{AltitudeSample, RoutePath, RouteProfile, RouteProvider, RouteStats};
use crate::storage::StateStorage;
use crate::waypoints::WaypointStore;
use crate::{GpsPoint, Waypoint, WaypointUpdate};

/// Storage key of the selected profile.
pub const PROFILE_KEY: &str = "profile";

/// Configuration for a route session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// How long a fetched route is reused for identical inputs.
    /// Default: one hour
    pub cache_ttl: Duration,

    /// Minimum number of waypoints before a route is requested.
    /// Default: 2
    pub min_waypoints_for_route: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(60 * 60),
            min_waypoints_for_route: 2,
        }
    }
}

/// Identity of a routing request: exact waypoint positions plus profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    positions: Vec<(u64, u64)>,
    profile: RouteProfile,
}

impl RouteKey {
    pub fn new(positions: &[GpsPoint], profile: RouteProfile) -> Self {
        Self {
            positions: positions
                .iter()
                .map(|p| (p.latitude.to_bits(), p.longitude.to_bits()))
                .collect(),
            profile,
        }
    }
}

/// A routing request handed out by [`RouteSession::prepare_request`].
#[derive(Debug, Clone)]
pub struct RouteRequest {
    /// Session generation when the request was issued
    pub generation: u64,
    pub key: RouteKey,
    pub waypoints: Vec<GpsPoint>,
    pub profile: RouteProfile,
}

/// What [`RouteSession::prepare_request`] decided.
#[derive(Debug, Clone)]
pub enum RouteRequestPlan {
    /// Too few waypoints; no route is shown
    NotEnoughWaypoints,
    /// A cached route for the current inputs is now the current route
    Cached,
    /// The router must be asked
    Fetch(RouteRequest),
}

/// Outcome of a routing round.
#[derive(Debug)]
pub enum RouteUpdate {
    /// Too few waypoints; no request was made
    NotEnoughWaypoints,
    /// Served from the cache without a request
    Cached,
    /// The response became the current route
    Applied,
    /// The inputs changed while the request was in flight; response ignored
    Stale,
    /// The router failed; waypoints are untouched and a route already shown
    /// for the same inputs is kept
    Failed(PlannerError),
}

#[derive(Debug)]
struct CachedRoute {
    path: Arc<RoutePath>,
    fetched_at: Instant,
}

/// Editing session: persisted waypoints and profile, plus the current route.
pub struct RouteSession {
    waypoints: WaypointStore,
    profile: RouteProfile,
    storage: Arc<dyn StateStorage>,
    config: SessionConfig,
    generation: u64,
    /// Key the current generation was issued for
    active_key: Option<RouteKey>,
    current: Option<Arc<RoutePath>>,
    cache: HashMap<RouteKey, CachedRoute>,
}

impl std::fmt::Debug for RouteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteSession")
            .field("waypoints", &self.waypoints)
            .field("profile", &self.profile)
            .field("generation", &self.generation)
            .field("has_route", &self.current.is_some())
            .field("cached_routes", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl RouteSession {
    /// Restore waypoints and profile from `storage`.
    ///
    /// A missing or unreadable profile falls back to [`RouteProfile::Safety`].
    pub fn open(storage: Arc<dyn StateStorage>, config: SessionConfig) -> Self {
        let waypoints = WaypointStore::open(storage.clone());

        let profile = match storage.read(PROFILE_KEY) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("[RouteSession] Ignoring stored profile {}: {}", json, e);
                RouteProfile::default()
            }),
            Ok(None) => RouteProfile::default(),
            Err(e) => {
                warn!("[RouteSession] Could not read profile: {}", e);
                RouteProfile::default()
            }
        };

        info!(
            "[RouteSession] Opened with {} waypoints, profile {}",
            waypoints.len(),
            profile
        );

        let mut session = Self {
            waypoints,
            profile,
            storage,
            config,
            generation: 0,
            active_key: None,
            current: None,
            cache: HashMap::new(),
        };
        session.active_key = session.route_key();
        session
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn waypoints(&self) -> &[Waypoint] {
        self.waypoints.waypoints()
    }

    pub fn profile(&self) -> RouteProfile {
        self.profile
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Incremented whenever the route inputs change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_route(&self) -> Option<&RoutePath> {
        self.current.as_deref()
    }

    pub fn stats(&self) -> Option<RouteStats> {
        self.current.as_ref().map(|r| r.stats())
    }

    /// Elevation profile of the current route; empty without one.
    pub fn altitude_profile(&self) -> Vec<AltitudeSample> {
        self.current
            .as_ref()
            .map(|r| r.altitude_profile())
            .unwrap_or_default()
    }

    /// Line of the current route; empty without one.
    pub fn route_line(&self) -> Vec<GpsPoint> {
        self.current.as_ref().map(|r| r.line()).unwrap_or_default()
    }

    fn route_key(&self) -> Option<RouteKey> {
        if self.waypoints.len() < self.config.min_waypoints_for_route {
            return None;
        }
        Some(RouteKey::new(&self.waypoints.positions(), self.profile))
    }

    /// Start a new generation if the route inputs changed.
    fn inputs_changed(&mut self) {
        let key = self.route_key();
        if key != self.active_key {
            self.generation += 1;
            self.active_key = key;
            self.current = None;
            debug!("[RouteSession] Route inputs changed, generation {}", self.generation);
        }
    }

    // ------------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------------

    pub fn set_profile(&mut self, profile: RouteProfile) -> Result<()> {
        let json = serde_json::to_string(&profile)?;
        self.storage.write(PROFILE_KEY, &json)?;
        self.profile = profile;
        self.inputs_changed();
        Ok(())
    }

    pub fn add(&mut self, position: GpsPoint) -> Result<()> {
        self.waypoints.add(position)?;
        self.inputs_changed();
        Ok(())
    }

    pub fn insert(&mut self, index: usize, position: GpsPoint) -> Result<()> {
        self.waypoints.insert(index, position)?;
        self.inputs_changed();
        Ok(())
    }

    /// Insert where the new point adds the least detour, appending when there
    /// are fewer than two waypoints. Returns the index used.
    pub fn insert_at_best_position(&mut self, position: GpsPoint) -> Result<usize> {
        let index = best_insertion_index(&self.waypoints.positions(), &position);
        self.insert(index, position)?;
        Ok(index)
    }

    pub fn remove(&mut self, index: usize) -> Result<Waypoint> {
        let removed = self.waypoints.remove(index)?;
        self.inputs_changed();
        Ok(removed)
    }

    pub fn update(&mut self, index: usize, update: WaypointUpdate) -> Result<()> {
        self.waypoints.update(index, update)?;
        self.inputs_changed();
        Ok(())
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        self.waypoints.reorder(from, to)?;
        self.inputs_changed();
        Ok(())
    }

    pub fn reverse(&mut self) -> Result<()> {
        self.waypoints.reverse()?;
        self.inputs_changed();
        Ok(())
    }

    pub fn replace_all(&mut self, waypoints: Vec<Waypoint>) -> Result<()> {
        self.waypoints.replace_all(waypoints)?;
        self.inputs_changed();
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.waypoints.clear()?;
        self.inputs_changed();
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Routing
    // ------------------------------------------------------------------------

    /// Decide what is needed to show a route for the current inputs.
    pub fn prepare_request(&mut self) -> RouteRequestPlan {
        let Some(key) = self.route_key() else {
            self.current = None;
            return RouteRequestPlan::NotEnoughWaypoints;
        };

        let ttl = self.config.cache_ttl;
        self.cache.retain(|_, cached| cached.fetched_at.elapsed() < ttl);

        if let Some(cached) = self.cache.get(&key) {
            debug!(
                "[RouteSession] Cache hit for {} waypoints ({})",
                self.waypoints.len(),
                self.profile
            );
            self.current = Some(Arc::clone(&cached.path));
            return RouteRequestPlan::Cached;
        }

        info!(
            "[RouteSession] Requesting route through {} waypoints ({}), generation {}",
            self.waypoints.len(),
            self.profile,
            self.generation
        );

        RouteRequestPlan::Fetch(RouteRequest {
            generation: self.generation,
            key,
            waypoints: self.waypoints.positions(),
            profile: self.profile,
        })
    }

    /// Apply the router's answer to `request`, unless the inputs moved on.
    ///
    /// A request also counts as current when edits since it was issued led
    /// back to the same key. A failure never replaces a route already shown
    /// for the current key.
    pub fn complete_request(
        &mut self,
        request: RouteRequest,
        result: Result<RoutePath>,
    ) -> RouteUpdate {
        let is_current = request.generation == self.generation
            || self.active_key.as_ref() == Some(&request.key);

        match result {
            Ok(path) => {
                let path = Arc::new(path);
                self.cache.insert(
                    request.key,
                    CachedRoute {
                        path: Arc::clone(&path),
                        fetched_at: Instant::now(),
                    },
                );

                if is_current {
                    self.current = Some(path);
                    RouteUpdate::Applied
                } else {
                    info!(
                        "[RouteSession] Discarding stale route (generation {} < {})",
                        request.generation, self.generation
                    );
                    RouteUpdate::Stale
                }
            }
            Err(e) if is_current => {
                if self.current.is_some() {
                    warn!("[RouteSession] Route request failed, keeping shown route: {}", e);
                } else {
                    warn!("[RouteSession] No route available: {}", e);
                }
                RouteUpdate::Failed(e)
            }
            Err(e) => {
                debug!("[RouteSession] Ignoring failure of stale request: {}", e);
                RouteUpdate::Stale
            }
        }
    }

    /// Prepare, fetch through `provider` and complete in one go.
    pub fn refresh(&mut self, provider: &dyn RouteProvider) -> RouteUpdate {
        match self.prepare_request() {
            RouteRequestPlan::NotEnoughWaypoints => RouteUpdate::NotEnoughWaypoints,
            RouteRequestPlan::Cached => RouteUpdate::Cached,
            RouteRequestPlan::Fetch(request) => {
                let result = provider.fetch_route(&request.waypoints, request.profile);
                self.complete_request(request, result)
            }
        }
    }
}

/// Index at which inserting `candidate` lengthens the route the least.
///
/// Only positions between two existing waypoints (`1..len`) are considered;
/// ties go to the lowest index. With fewer than two waypoints the candidate is
/// appended (`len` is returned).
pub fn best_insertion_index(waypoints: &[GpsPoint], candidate: &GpsPoint) -> usize {
    if waypoints.len() < 2 {
        return waypoints.len();
    }

    let mut best_index = 1;
    let mut best_detour = f64::INFINITY;

    for (i, pair) in waypoints.windows(2).enumerate() {
        let via = haversine_distance(&pair[0], candidate) + haversine_distance(candidate, &pair[1]);
        let detour = via - haversine_distance(&pair[0], &pair[1]);
        if detour < best_detour {
            best_detour = detour;
            best_index = i + 1;
        }
    }

    best_index
}
