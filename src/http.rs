//! HTTP client for the BRouter routing service.
//!
//! Requests a route through an ordered list of waypoints and decodes the
//! GeoJSON answer into a [`RoutePath`]:
//! - Connection reuse through a single `reqwest::Client`
//! - Retry with exponential backoff on transport errors, 429 and 5xx
//! - A blocking [`RouteProvider`] impl for synchronous callers

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use reqwest::{Client, StatusCode, Url};

use crate::error::{PlannerError, Result};
use crate::routing::{RoutePath, RouteProfile, RouteProvider};
use crate::GpsPoint;

/// Public BRouter instance.
pub const DEFAULT_BROUTER_URL: &str = "https://brouter.de/brouter";

/// Configuration for [`BrouterClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct BrouterConfig {
    /// Endpoint receiving the query parameters.
    /// Default: `https://brouter.de/brouter`
    pub base_url: String,

    /// Timeout for a single request, body included.
    /// Default: 30 s
    pub timeout: Duration,

    /// Retries after the first attempt for transport errors, 429 and 5xx.
    /// Default: 3
    pub max_retries: u32,

    /// BRouter alternative route index.
    /// Default: 0 (the best route)
    pub alternative_index: u32,
}

impl Default for BrouterConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BROUTER_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            alternative_index: 0,
        }
    }
}

/// Route fetcher backed by a BRouter server.
#[derive(Debug, Clone)]
pub struct BrouterClient {
    client: Client,
    config: BrouterConfig,
}

impl BrouterClient {
    pub fn new(config: BrouterConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(config.timeout)
            .build()
            .map_err(|e| PlannerError::Routing(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BrouterConfig {
        &self.config
    }

    /// Full request URL for `waypoints` under `profile`.
    ///
    /// Waypoints are sent as `lon,lat` pairs separated by `|`.
    pub fn route_url(&self, waypoints: &[GpsPoint], profile: RouteProfile) -> Result<Url> {
        let lonlats = waypoints
            .iter()
            .map(|p| format!("{},{}", p.longitude, p.latitude))
            .collect::<Vec<_>>()
            .join("|");

        let alternative = self.config.alternative_index.to_string();
        Url::parse_with_params(
            &self.config.base_url,
            [
                ("lonlats", lonlats.as_str()),
                ("profile", profile.as_str()),
                ("alternativeidx", alternative.as_str()),
                ("format", "geojson"),
            ],
        )
        .map_err(|e| {
            PlannerError::Routing(format!("Invalid BRouter URL {}: {}", self.config.base_url, e))
        })
    }

    /// Ask the server for a route through `waypoints`.
    pub async fn fetch_route(
        &self,
        waypoints: &[GpsPoint],
        profile: RouteProfile,
    ) -> Result<RoutePath> {
        if waypoints.len() < 2 {
            return Err(PlannerError::Routing(format!(
                "At least 2 waypoints are required, got {}",
                waypoints.len()
            )));
        }

        let url = self.route_url(waypoints, profile)?;
        let mut retries = 0;
        let start = Instant::now();

        loop {
            let response = self.client.get(url.clone()).send().await;

            let retry_reason = match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        format!("HTTP {}", status)
                    } else {
                        let body = resp
                            .text()
                            .await
                            .map_err(|e| {
                                PlannerError::Routing(format!("Body download error: {}", e))
                            })?;

                        if !status.is_success() {
                            // BRouter reports bad input as a plain-text body
                            return Err(PlannerError::Routing(format!(
                                "HTTP {}: {}",
                                status,
                                body.trim()
                            )));
                        }

                        let route = RoutePath::from_geojson(&body)?;
                        info!(
                            "[BrouterClient] {} waypoints ({}) -> {} points, {:.0} m in {:?}",
                            waypoints.len(),
                            profile,
                            route.vertices.len(),
                            route.distance_m,
                            start.elapsed()
                        );
                        return Ok(route);
                    }
                }
                Err(e) => format!("Request error: {}", e),
            };

            retries += 1;
            if retries > self.config.max_retries {
                return Err(PlannerError::Routing(format!(
                    "{} (gave up after {} retries)",
                    retry_reason, self.config.max_retries
                )));
            }

            let wait = Duration::from_millis(200 * (1 << retries.min(5)));
            warn!(
                "[BrouterClient] {}, retry {} after {:?}",
                retry_reason, retries, wait
            );
            tokio::time::sleep(wait).await;
        }
    }
}

/// Blocking access for synchronous callers; runs the request on a private
/// current-thread runtime. Must not be called from inside a tokio runtime.
impl RouteProvider for BrouterClient {
    fn fetch_route(&self, waypoints: &[GpsPoint], profile: RouteProfile) -> Result<RoutePath> {
        use tokio::runtime::Builder;

        debug!("[BrouterClient] blocking fetch for {} waypoints", waypoints.len());

        let rt = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PlannerError::Routing(format!("Runtime error: {}", e)))?;

        rt.block_on(BrouterClient::fetch_route(self, waypoints, profile))
    }
}
