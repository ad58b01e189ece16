//! Upstream provider capabilities and their HTTP bindings.
//!
//! The planner only sees the four capability traits below. Each binding
//! parses its provider's responses into typed records at this boundary:
//!
//! - `mapbox`: driving/cycling/walking directions and forward geocoding
//! - `nl9292`: Dutch public transport journeys
//! - `monotch`: parking directory listing and detail records
//!
//! `mock` holds deterministic in-memory implementations for tests and demos.

mod error;
pub mod mapbox;
pub mod mock;
pub mod monotch;
pub mod nl9292;
mod retry;

use std::future::Future;

use crate::domain::{Coordinate, ParkingDetail, ParkingRecord, Profile, RouteLeg};
use crate::geo::BoundingBox;

pub use error::ProviderError;
pub use retry::{Backoff, RetryPolicy, TokioBackoff};

/// Road routing between two points.
pub trait DriveLegProvider: Send + Sync {
    /// Returns the primary recommended route.
    ///
    /// Fails with `NoRouteFound` when the engine reports zero routes.
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        profile: Profile,
    ) -> impl Future<Output = Result<RouteLeg, ProviderError>> + Send;
}

/// Public transport journeys between two points.
pub trait TransitLegProvider: Send + Sync {
    /// Returns the first itinerary departing at or after `depart_after`
    /// (epoch seconds).
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        depart_after: i64,
    ) -> impl Future<Output = Result<RouteLeg, ProviderError>> + Send;

    /// Maps a coordinate to the provider's nearest location identifier.
    ///
    /// Fails with `LocationNotResolved` when no stop or POI is nearby.
    fn resolve_location_id(
        &self,
        coordinate: Coordinate,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

/// Parking directory.
///
/// Implementations report throttling as `ProviderError::RateLimited`;
/// retrying is left to the caller.
pub trait ParkingDirectoryProvider: Send + Sync {
    fn list(
        &self,
        bbox: BoundingBox,
    ) -> impl Future<Output = Result<Vec<ParkingRecord>, ProviderError>> + Send;

    fn detail(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<ParkingDetail, ProviderError>> + Send;
}

/// Free-text address lookup.
pub trait GeocodingProvider: Send + Sync {
    /// Fails with `AddressNotFound` when nothing matches.
    fn forward(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Coordinate, ProviderError>> + Send;
}

/// Maps an HTTP status to the shared error variants, or `None` on success.
pub(crate) fn classify_status(
    status: reqwest::StatusCode,
    rate_limit_statuses: &[reqwest::StatusCode],
) -> Option<ProviderError> {
    if rate_limit_statuses.contains(&status) {
        return Some(ProviderError::RateLimited);
    }
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Some(ProviderError::Unauthorized);
    }
    None
}

/// Reads a response body, mapping non-success statuses to errors.
pub(crate) async fn read_body(
    response: reqwest::Response,
    rate_limit_statuses: &[reqwest::StatusCode],
) -> Result<String, ProviderError> {
    let status = response.status();

    if let Some(err) = classify_status(status, rate_limit_statuses) {
        return Err(err);
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    Ok(response.text().await?)
}
