//! Park-and-ride planning.
//!
//! For every parking near the destination, the planner asks for a drive to
//! the parking and the first transit itinerary from the parking onwards,
//! composes the two and keeps the cheapest and quickest results.

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::domain::{CandidateJourney, Coordinate, Parking, Profile, RouteLeg};
use crate::parking::ParkingDirectory;
use crate::providers::{
    DriveLegProvider, GeocodingProvider, ParkingDirectoryProvider, ProviderError,
    TransitLegProvider,
};

use super::compose::{compose, transit_depart_after};
use super::config::PlannerConfig;
use super::select::select_journeys;

/// Error from journey planning.
///
/// Only failures that make the whole request meaningless end up here; a
/// parking whose legs can't be resolved is skipped instead.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Discovering parkings failed
    #[error("parking directory failed: {0}")]
    Directory(#[source] ProviderError),

    /// An address could not be turned into a coordinate
    #[error("could not geocode {address:?}: {source}")]
    Geocode {
        address: String,
        #[source]
        source: ProviderError,
    },
}

/// Result of planning between two free-text addresses.
#[derive(Debug, Clone)]
pub struct AddressPlan {
    pub origin: Coordinate,
    pub destination: Coordinate,

    /// Driving all the way, for comparison. `None` if no route was found.
    pub car_only: Option<RouteLeg>,

    pub journeys: Vec<CandidateJourney>,
}

/// Park-and-ride journey planner.
pub struct Planner<'a, D, T, P> {
    drive: &'a D,
    transit: &'a T,
    directory: &'a ParkingDirectory<P>,
    config: &'a PlannerConfig,
}

impl<'a, D, T, P> Planner<'a, D, T, P>
where
    D: DriveLegProvider,
    T: TransitLegProvider,
    P: ParkingDirectoryProvider,
{
    /// Create a new planner.
    pub fn new(
        drive: &'a D,
        transit: &'a T,
        directory: &'a ParkingDirectory<P>,
        config: &'a PlannerConfig,
    ) -> Self {
        Self {
            drive,
            transit,
            directory,
            config,
        }
    }

    /// Plans park-and-ride journeys leaving `origin` at `depart_time`.
    ///
    /// Returns an empty list when no parking yields a complete journey.
    pub async fn plan(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        depart_time: i64,
    ) -> Result<Vec<CandidateJourney>, PlanError> {
        let parkings = self
            .directory
            .list_parkings(destination, self.config.search_radius_m)
            .await
            .map_err(PlanError::Directory)?;

        info!(
            %origin,
            %destination,
            depart_time,
            parkings = parkings.len(),
            "planning park-and-ride journeys"
        );

        let mut candidates = Vec::with_capacity(parkings.len());

        for batch in parkings.chunks(self.config.batch_size.max(1)) {
            let futures: Vec<_> = batch
                .iter()
                .map(|parking| async move {
                    let result = self.candidate(origin, destination, depart_time, parking).await;
                    (parking, result)
                })
                .collect();

            for (parking, result) in join_all(futures).await {
                match result {
                    Ok(journey) => candidates.push(journey),
                    Err(e) if e.is_no_answer() => {
                        warn!(parking = %parking.id, reason = %e, "parking not reachable");
                    }
                    Err(e) => {
                        warn!(parking = %parking.id, error = %e, "dropping parking candidate");
                    }
                }
            }
        }

        let selected = select_journeys(candidates, self.config.cheapest, self.config.quickest);
        debug!(selected = selected.len(), "journey selection complete");
        Ok(selected)
    }

    async fn candidate(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        depart_time: i64,
        parking: &Parking,
    ) -> Result<CandidateJourney, ProviderError> {
        let buffer = self.config.transfer_buffer_secs;

        let drive = self
            .drive
            .route(origin, parking.coordinates, Profile::Car)
            .await?;
        let after = transit_depart_after(depart_time, &drive, buffer);
        let transit = self
            .transit
            .route(parking.coordinates, destination, after)
            .await?;

        Ok(compose(parking.clone(), drive, transit, buffer, depart_time))
    }

    /// Geocodes both addresses, plans between them and adds the direct
    /// car route for comparison.
    pub async fn plan_by_address<G: GeocodingProvider>(
        &self,
        geocoder: &G,
        origin_address: &str,
        destination_address: &str,
        depart_time: i64,
    ) -> Result<AddressPlan, PlanError> {
        let origin = geocode(geocoder, origin_address).await?;
        let destination = geocode(geocoder, destination_address).await?;

        let journeys = self.plan(origin, destination, depart_time).await?;

        let car_only = match self.drive.route(origin, destination, Profile::Car).await {
            Ok(leg) => Some(leg.with_depart_time(depart_time)),
            Err(e) => {
                warn!(error = %e, "no direct car route");
                None
            }
        };

        Ok(AddressPlan {
            origin,
            destination,
            car_only,
            journeys,
        })
    }
}

async fn geocode<G: GeocodingProvider>(geocoder: &G, address: &str) -> Result<Coordinate, PlanError> {
    geocoder
        .forward(address)
        .await
        .map_err(|source| PlanError::Geocode {
            address: address.to_string(),
            source,
        })
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
