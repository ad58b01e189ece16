//! Monotch parking directory client.
//!
//! Monotch throttles by answering 403 (and sometimes 429) instead of
//! queueing requests; both surface as `ProviderError::RateLimited` and
//! the caller decides how to back off.

use std::sync::Arc;

use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::{Coordinate, ParkingDetail, ParkingRecord};
use crate::geo::BoundingBox;

use super::error::ProviderError;
use super::{ParkingDirectoryProvider, read_body};

/// Default base URL for the Monotch parking API.
const DEFAULT_BASE_URL: &str = "https://api.monotch.com/parking/v1";

/// Parking types usable for park-and-ride (street parking excluded).
const DEFAULT_USABLE_TYPES: &str = "garage,terrain,park_and_ride";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 2;

const RATE_LIMIT_STATUSES: &[StatusCode] =
    &[StatusCode::TOO_MANY_REQUESTS, StatusCode::FORBIDDEN];

/// Configuration for the Monotch client.
#[derive(Debug, Clone)]
pub struct MonotchConfig {
    /// API key passed as `api_key`
    pub api_key: String,
    /// Base URL for the API
    pub base_url: String,
    /// Comma-separated parking types to list
    pub usable_types: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl MonotchConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            usable_types: DEFAULT_USABLE_TYPES.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the parking types to list.
    pub fn with_usable_types(mut self, types: impl Into<String>) -> Self {
        self.usable_types = types.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }
}

/// Entry of the `list` response.
#[derive(Debug, Deserialize)]
pub struct MonotchParking {
    pub id: String,
    pub location: MonotchLocation,
    #[serde(default)]
    pub rates: Option<MonotchRates>,
}

#[derive(Debug, Deserialize)]
pub struct MonotchLocation {
    pub lat: f64,
    pub lng: f64,
}

/// Published rates, in euros.
#[derive(Debug, Deserialize)]
pub struct MonotchRates {
    #[serde(rename = "24h", default)]
    pub day: Option<f64>,
}

impl From<MonotchParking> for ParkingRecord {
    fn from(p: MonotchParking) -> Self {
        ParkingRecord {
            id: p.id,
            coordinates: Coordinate::new(p.location.lng, p.location.lat),
            rate_24h: p.rates.and_then(|r| r.day),
        }
    }
}

/// Monotch API client.
#[derive(Debug, Clone)]
pub struct MonotchClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    usable_types: String,
    semaphore: Arc<Semaphore>,
}

impl MonotchClient {
    /// Create a new Monotch client with the given configuration.
    pub fn new(config: MonotchConfig) -> Result<Self, ProviderError> {
        if config.api_key.is_empty() {
            return Err(ProviderError::InvalidConfig(
                "Monotch API key is empty".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            usable_types: config.usable_types,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String, ProviderError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ProviderError::Api {
                status: 0,
                message: "Semaphore closed".to_string(),
            })?;

        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;

        read_body(response, RATE_LIMIT_STATUSES).await
    }
}

impl ParkingDirectoryProvider for MonotchClient {
    async fn list(&self, bbox: BoundingBox) -> Result<Vec<ParkingRecord>, ProviderError> {
        debug!(?bbox, "listing Monotch parkings");
        let body = self
            .get(
                "list",
                &[
                    ("w", format!("{:.6}", bbox.west)),
                    ("n", format!("{:.6}", bbox.north)),
                    ("e", format!("{:.6}", bbox.east)),
                    ("s", format!("{:.6}", bbox.south)),
                    ("types", self.usable_types.clone()),
                ],
            )
            .await?;

        parse_listing(&body)
    }

    async fn detail(&self, id: &str) -> Result<ParkingDetail, ProviderError> {
        debug!(id, "fetching Monotch parking detail");
        let body = self.get("detail", &[("id", id.to_string())]).await?;

        serde_json::from_str(&body).map_err(|e| ProviderError::json(e, &body))
    }
}

/// Parses a `list` response body into typed records.
pub fn parse_listing(body: &str) -> Result<Vec<ParkingRecord>, ProviderError> {
    let parkings: Vec<MonotchParking> =
        serde_json::from_str(body).map_err(|e| ProviderError::json(e, body))?;
    Ok(parkings.into_iter().map(ParkingRecord::from).collect())
}
