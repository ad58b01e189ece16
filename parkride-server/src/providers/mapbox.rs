//! Mapbox directions and geocoding client.
//!
//! Directions come from the `directions/v5` API with the profile mapped
//! from the planner's car/bike/foot. Car legs are priced per kilometre
//! since Mapbox has no notion of cost. Geocoding uses `mapbox.places`
//! and keeps the best match only.

use std::sync::Arc;

use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::{Coordinate, Profile, RouteLeg};

use super::error::ProviderError;
use super::{DriveLegProvider, GeocodingProvider, read_body};

/// Default base URL for the Mapbox APIs.
const DEFAULT_BASE_URL: &str = "https://api.mapbox.com";

/// Default driving cost in EUR per kilometre (Dutch mileage allowance).
const DEFAULT_COST_PER_KM: f64 = 0.19;

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 5;

const RATE_LIMIT_STATUSES: &[StatusCode] = &[StatusCode::TOO_MANY_REQUESTS];

/// Configuration for the Mapbox client.
#[derive(Debug, Clone)]
pub struct MapboxConfig {
    /// Access token passed as `access_token`
    pub access_token: String,
    /// Base URL for the API
    pub base_url: String,
    /// Cost per driven kilometre
    pub cost_per_km: f64,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl MapboxConfig {
    /// Create a new config with the given access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cost_per_km: DEFAULT_COST_PER_KM,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the driving cost per kilometre.
    pub fn with_cost_per_km(mut self, cost: f64) -> Self {
        self.cost_per_km = cost;
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Directions API response.
#[derive(Debug, Deserialize)]
pub struct DirectionsResponse {
    /// "Ok", "NoRoute", "NoSegment", ...
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub routes: Vec<DirectionsRoute>,
}

/// One route alternative, best first.
#[derive(Debug, Deserialize)]
pub struct DirectionsRoute {
    /// Metres
    pub distance: f64,
    /// Seconds
    pub duration: f64,
}

/// Geocoding API response.
#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub features: Vec<GeocodeFeature>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeFeature {
    /// `[longitude, latitude]`
    pub center: (f64, f64),
    #[serde(default)]
    pub place_name: Option<String>,
}

/// Mapbox API client.
#[derive(Debug, Clone)]
pub struct MapboxClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    cost_per_km: f64,
    semaphore: Arc<Semaphore>,
}

impl MapboxClient {
    /// Create a new Mapbox client with the given configuration.
    pub fn new(config: MapboxConfig) -> Result<Self, ProviderError> {
        if config.access_token.is_empty() {
            return Err(ProviderError::InvalidConfig(
                "Mapbox access token is empty".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token,
            cost_per_km: config.cost_per_km,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    async fn get(&self, url: Url) -> Result<String, ProviderError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ProviderError::Api {
                status: 0,
                message: "Semaphore closed".to_string(),
            })?;

        let response = self
            .http
            .get(url)
            .query(&[("access_token", self.access_token.as_str())])
            .send()
            .await?;

        read_body(response, RATE_LIMIT_STATUSES).await
    }

    fn url(&self, path: &str) -> Result<Url, ProviderError> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| ProviderError::InvalidConfig(format!("bad Mapbox URL: {e}")))
    }
}

impl DriveLegProvider for MapboxClient {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        profile: Profile,
    ) -> Result<RouteLeg, ProviderError> {
        let mut url = self.url(&format!(
            "/directions/v5/mapbox/{}/{},{};{},{}",
            profile_path(profile),
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude
        ))?;
        url.query_pairs_mut().append_pair("overview", "false");

        debug!(%origin, %destination, ?profile, "requesting Mapbox directions");
        let body = self.get(url).await?;
        let response: DirectionsResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::json(e, &body))?;

        convert_directions(response, profile, origin, destination, self.cost_per_km)
    }
}

impl GeocodingProvider for MapboxClient {
    async fn forward(&self, address: &str) -> Result<Coordinate, ProviderError> {
        let mut url = self.url("/geocoding/v5/mapbox.places")?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidConfig("Mapbox base URL cannot be a base".into()))?
            .push(&format!("{address}.json"));
        url.query_pairs_mut().append_pair("limit", "1");

        debug!(address, "geocoding address");
        let body = self.get(url).await?;
        let response: GeocodeResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::json(e, &body))?;

        first_match(response, address)
    }
}

/// Mapbox profile name for a routing profile.
fn profile_path(profile: Profile) -> &'static str {
    match profile {
        Profile::Car => "driving",
        Profile::Bike => "cycling",
        Profile::Foot => "walking",
    }
}

/// OpenStreetMap directions link showing the same trip.
pub fn osm_directions_link(
    profile: Profile,
    origin: Coordinate,
    destination: Coordinate,
) -> String {
    let engine = match profile {
        Profile::Car => "fossgis_osrm_car",
        Profile::Bike => "fossgis_osrm_bike",
        Profile::Foot => "fossgis_osrm_foot",
    };
    format!(
        "https://www.openstreetmap.org/directions?engine={engine}&route={:.6},{:.6};{:.6},{:.6}",
        origin.latitude, origin.longitude, destination.latitude, destination.longitude
    )
}

/// Converts a directions response into a leg using its first route.
pub fn convert_directions(
    response: DirectionsResponse,
    profile: Profile,
    origin: Coordinate,
    destination: Coordinate,
    cost_per_km: f64,
) -> Result<RouteLeg, ProviderError> {
    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or(ProviderError::NoRouteFound)?;

    let price = match profile {
        Profile::Car => route.distance / 1000.0 * cost_per_km,
        Profile::Bike | Profile::Foot => 0.0,
    };

    Ok(RouteLeg::road(profile, route.distance, route.duration)
        .with_price(price)
        .with_deep_link(osm_directions_link(profile, origin, destination)))
}

/// Coordinate of the best geocoding match.
pub fn first_match(
    response: GeocodeResponse,
    address: &str,
) -> Result<Coordinate, ProviderError> {
    response
        .features
        .into_iter()
        .next()
        .map(|f| Coordinate::from(f.center))
        .ok_or_else(|| ProviderError::AddressNotFound(address.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TU_DELFT: Coordinate = Coordinate::new(4.37212, 52.00234);
    const KIJKDUIN: Coordinate = Coordinate::new(4.22200, 52.06965);

    #[test]
    fn config_builder() {
        let config = MapboxConfig::new("pk.test")
            .with_base_url("http://localhost:8080")
            .with_cost_per_km(0.25)
            .with_max_concurrent(2)
            .with_timeout(10);

        assert_eq!(config.access_token, "pk.test");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.cost_per_km, 0.25);
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn config_defaults() {
        let config = MapboxConfig::new("pk.test");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.cost_per_km, DEFAULT_COST_PER_KM);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn empty_token_rejected() {
        assert!(matches!(
            MapboxClient::new(MapboxConfig::new("")),
            Err(ProviderError::InvalidConfig(_))
        ));
        assert!(MapboxClient::new(MapboxConfig::new("pk.test")).is_ok());
    }

    #[test]
    fn first_route_is_used() {
        let json = r#"{
            "code": "Ok",
            "routes": [
                {"distance": 18250.4, "duration": 1234.5, "weight": 1300.0},
                {"distance": 17000.0, "duration": 1500.0, "weight": 1600.0}
            ],
            "waypoints": []
        }"#;
        let response: DirectionsResponse = serde_json::from_str(json).unwrap();

        let leg = convert_directions(response, Profile::Car, TU_DELFT, KIJKDUIN, 0.2).unwrap();

        assert_eq!(leg.duration_seconds, 1234.5);
        assert_eq!(leg.distance_meters, Some(18250.4));
        assert!((leg.price - 3.65008).abs() < 1e-9);
        assert!(
            leg.deep_link
                .as_deref()
                .unwrap()
                .contains("route=52.002340,4.372120;52.069650,4.222000")
        );
    }

    #[test]
    fn bike_legs_are_free() {
        let json = r#"{"code": "Ok", "routes": [{"distance": 15000.0, "duration": 3000.0}]}"#;
        let response: DirectionsResponse = serde_json::from_str(json).unwrap();

        let leg = convert_directions(response, Profile::Bike, TU_DELFT, KIJKDUIN, 0.2).unwrap();
        assert_eq!(leg.price, 0.0);
        assert!(leg.deep_link.unwrap().contains("fossgis_osrm_bike"));
    }

    #[test]
    fn no_routes_is_no_route_found() {
        let json = r#"{"code": "NoRoute", "routes": []}"#;
        let response: DirectionsResponse = serde_json::from_str(json).unwrap();

        let result = convert_directions(response, Profile::Car, TU_DELFT, KIJKDUIN, 0.2);
        assert!(matches!(result, Err(ProviderError::NoRouteFound)));
    }

    #[test]
    fn geocode_best_match() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"place_name": "Mauritshuis, Den Haag", "center": [4.31527, 52.0804]},
                {"place_name": "Somewhere else", "center": [5.0, 52.0]}
            ]
        }"#;
        let response: GeocodeResponse = serde_json::from_str(json).unwrap();

        let c = first_match(response, "Mauritshuis, Den Haag").unwrap();
        assert_eq!(c, Coordinate::new(4.31527, 52.0804));
    }

    #[test]
    fn geocode_without_features() {
        let response: GeocodeResponse = serde_json::from_str(r#"{"features": []}"#).unwrap();
        let result = first_match(response, "nowhere");
        assert!(matches!(result, Err(ProviderError::AddressNotFound(a)) if a == "nowhere"));
    }

    #[test]
    fn profile_paths() {
        assert_eq!(profile_path(Profile::Car), "driving");
        assert_eq!(profile_path(Profile::Bike), "cycling");
        assert_eq!(profile_path(Profile::Foot), "walking");
    }
}
