//! 9292 public transport client.
//!
//! Journeys are planned between 9292 location identifiers, so both ends
//! of a request are first resolved to the nearest stop or POI. Resolved
//! identifiers are memoised: the destination is the same for every
//! parking candidate of a planning request.
//!
//! 9292 speaks local (Dutch) wall-clock time with minute precision.
//! Conversion to and from epoch seconds uses a fixed UTC offset from
//! the configuration.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use moka::future::Cache as MokaCache;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::{Coordinate, Mode, RouteLeg};

use super::error::ProviderError;
use super::{TransitLegProvider, read_body};

/// Default base URL for the 9292 REST API.
const DEFAULT_BASE_URL: &str = "https://api.9292.nl/0.1";

/// Default website used for deep links.
const DEFAULT_WEBSITE_URL: &str = "https://9292.nl/reisadvies";

/// Central European Time.
const DEFAULT_UTC_OFFSET_SECS: i32 = 3600;

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 5;

const RATE_LIMIT_STATUSES: &[StatusCode] = &[StatusCode::TOO_MANY_REQUESTS];

/// Request `dateTime` format, e.g. `2018-11-16T1630`.
const REQUEST_TIME_FORMAT: &str = "%Y-%m-%dT%H%M";

/// Response time format, e.g. `2018-11-16T16:42`.
const RESPONSE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Configuration for the location identifier cache.
#[derive(Debug, Clone)]
pub struct LocationCacheConfig {
    /// TTL for cached identifiers.
    pub ttl: Duration,

    /// Maximum number of cached identifiers.
    pub max_capacity: u64,
}

impl Default for LocationCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            max_capacity: 10_000,
        }
    }
}

/// Configuration for the 9292 client.
#[derive(Debug, Clone)]
pub struct Nl9292Config {
    /// Base URL for the API
    pub base_url: String,
    /// Base URL for journey deep links
    pub website_url: String,
    /// Response language
    pub lang: String,
    /// Offset of 9292 local time from UTC
    pub utc_offset_secs: i32,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Location identifier cache settings
    pub location_cache: LocationCacheConfig,
}

impl Default for Nl9292Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            website_url: DEFAULT_WEBSITE_URL.to_string(),
            lang: "nl-NL".to_string(),
            utc_offset_secs: DEFAULT_UTC_OFFSET_SECS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
            location_cache: LocationCacheConfig::default(),
        }
    }
}

impl Nl9292Config {
    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the local time offset from UTC (e.g. 7200 for summer time).
    pub fn with_utc_offset(mut self, secs: i32) -> Self {
        self.utc_offset_secs = secs;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// `/locations` response.
#[derive(Debug, Deserialize)]
pub struct LocationsResponse {
    #[serde(default)]
    pub locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
pub struct Location {
    /// e.g. `station-delft` or `den-haag/bushalte-deltaplein`
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// `/journeys` response.
#[derive(Debug, Deserialize)]
pub struct JourneysResponse {
    #[serde(default)]
    pub journeys: Vec<TransitJourney>,
}

/// One itinerary.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitJourney {
    /// Local departure time
    pub departure: String,
    /// Local arrival time
    pub arrival: String,
    #[serde(default)]
    pub number_of_changes: u32,
    /// Per-vehicle breakdown, passed through unmodified
    #[serde(default)]
    pub legs: serde_json::Value,
    /// Absent or null for walk-only itineraries
    #[serde(default)]
    pub fare_info: Option<FareInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FareInfo {
    #[serde(default)]
    pub full_price_cents: Option<u32>,
}

/// 9292 API client.
#[derive(Clone)]
pub struct Nl9292Client {
    http: reqwest::Client,
    base_url: String,
    website_url: String,
    lang: String,
    offset: FixedOffset,
    semaphore: Arc<Semaphore>,
    /// Location identifiers keyed by rounded coordinate.
    locations: MokaCache<(i64, i64), String>,
}

impl Nl9292Client {
    /// Create a new 9292 client with the given configuration.
    pub fn new(config: Nl9292Config) -> Result<Self, ProviderError> {
        let offset = FixedOffset::east_opt(config.utc_offset_secs).ok_or_else(|| {
            ProviderError::InvalidConfig(format!(
                "UTC offset out of range: {}",
                config.utc_offset_secs
            ))
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let locations = MokaCache::builder()
            .time_to_live(config.location_cache.ttl)
            .max_capacity(config.location_cache.max_capacity)
            .build();

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            website_url: config.website_url.trim_end_matches('/').to_string(),
            lang: config.lang,
            offset,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            locations,
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
        let response = self.http.get(&url).query(query).send().await?;

        read_body(response, RATE_LIMIT_STATUSES).await
    }

    /// Number of memoised location identifiers.
    pub fn cached_location_count(&self) -> u64 {
        self.locations.entry_count()
    }
}

impl TransitLegProvider for Nl9292Client {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        depart_after: i64,
    ) -> Result<RouteLeg, ProviderError> {
        let from = self.resolve_location_id(origin).await?;
        let to = self.resolve_location_id(destination).await?;
        let date_time = format_request_time(depart_after, self.offset)?;

        debug!(%from, %to, %date_time, "requesting 9292 journeys");
        let body = self
            .get(
                "journeys",
                &[
                    ("before", "1".to_string()),
                    ("sequence", "1".to_string()),
                    ("byFerry", "true".to_string()),
                    ("bySubway", "true".to_string()),
                    ("byBus", "true".to_string()),
                    ("byTram", "true".to_string()),
                    ("byTrain", "true".to_string()),
                    ("lang", self.lang.clone()),
                    ("from", from.clone()),
                    ("to", to.clone()),
                    ("dateTime", date_time.clone()),
                    ("searchType", "departure".to_string()),
                    ("interchangeTime", "standard".to_string()),
                    ("after", "5".to_string()),
                ],
            )
            .await?;

        let response: JourneysResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::json(e, &body))?;

        // First itinerary is the earliest available, not the fewest changes
        let journey = response
            .journeys
            .into_iter()
            .next()
            .ok_or(ProviderError::NoRouteFound)?;

        let link = format!("{}/{}/{}/vertrek/{}", self.website_url, from, to, date_time);
        convert_journey(journey, &from, &to, self.offset).map(|leg| leg.with_deep_link(link))
    }

    async fn resolve_location_id(&self, coordinate: Coordinate) -> Result<String, ProviderError> {
        let key = coordinate.grid_key();
        if let Some(id) = self.locations.get(&key).await {
            return Ok(id);
        }

        let body = self
            .get(
                "locations",
                &[
                    ("lang", self.lang.clone()),
                    (
                        "latlong",
                        format!("{:.6},{:.6}", coordinate.latitude, coordinate.longitude),
                    ),
                    ("rows", "1".to_string()),
                ],
            )
            .await?;

        let response: LocationsResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::json(e, &body))?;

        let id = nearest_location(response, coordinate)?;
        debug!(%coordinate, %id, "resolved 9292 location");
        self.locations.insert(key, id.clone()).await;
        Ok(id)
    }
}

/// Identifier of the first (nearest) location.
pub fn nearest_location(
    response: LocationsResponse,
    coordinate: Coordinate,
) -> Result<String, ProviderError> {
    response
        .locations
        .into_iter()
        .next()
        .map(|l| l.id)
        .ok_or(ProviderError::LocationNotResolved(coordinate))
}

/// Formats an epoch time as a 9292 request time, rounding up to the
/// next whole minute so no earlier departure is asked for.
pub fn format_request_time(epoch_secs: i64, offset: FixedOffset) -> Result<String, ProviderError> {
    let out_of_range = || ProviderError::Json {
        message: format!("departure time out of range: {epoch_secs}"),
        body: None,
    };
    let rounded = epoch_secs
        .checked_add((60 - epoch_secs.rem_euclid(60)) % 60)
        .ok_or_else(out_of_range)?;
    let utc = DateTime::from_timestamp(rounded, 0).ok_or_else(out_of_range)?;
    Ok(utc.with_timezone(&offset).format(REQUEST_TIME_FORMAT).to_string())
}

/// Parses a 9292 local time into epoch seconds.
pub fn parse_local_time(s: &str, offset: FixedOffset) -> Result<i64, ProviderError> {
    let naive = NaiveDateTime::parse_from_str(s, RESPONSE_TIME_FORMAT).map_err(|e| {
        ProviderError::Json {
            message: format!("invalid time {s:?}: {e}"),
            body: None,
        }
    })?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| ProviderError::Json {
            message: format!("ambiguous local time {s:?}"),
            body: None,
        })
}

/// Converts an itinerary into a transit leg.
pub fn convert_journey(
    journey: TransitJourney,
    from: &str,
    to: &str,
    offset: FixedOffset,
) -> Result<RouteLeg, ProviderError> {
    let departure = parse_local_time(&journey.departure, offset)?;
    let arrival = parse_local_time(&journey.arrival, offset)?;

    let price = journey
        .fare_info
        .and_then(|f| f.full_price_cents)
        .map(|cents| f64::from(cents) / 100.0)
        .unwrap_or(0.0);

    Ok(RouteLeg::new(Mode::Transit, (arrival - departure) as f64)
        .with_price(price)
        .with_depart_time(departure)
        .with_changes(journey.number_of_changes)
        .with_endpoints(from, to)
        .with_legs_detail(journey.legs))
}
