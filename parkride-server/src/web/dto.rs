//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{CandidateJourney, Coordinate, JourneySummary, LegSummary};
use crate::planner::AddressPlan;

/// Request to plan between two coordinates.
#[derive(Debug, Deserialize)]
pub struct PlanJourneyRequest {
    /// Origin as `[longitude, latitude]`
    pub origin: Coordinate,

    /// Destination as `[longitude, latitude]`
    pub destination: Coordinate,

    /// Desired departure (epoch seconds)
    pub depart_time: i64,
}

/// Request to plan between two free-text addresses.
#[derive(Debug, Deserialize)]
pub struct PlanByAddressRequest {
    pub origin: String,
    pub destination: String,
    pub depart_time: i64,
}

/// Response for journey planning.
#[derive(Debug, Serialize)]
pub struct PlanJourneyResponse {
    pub journeys: Vec<JourneySummary>,
}

impl PlanJourneyResponse {
    pub fn from_journeys(journeys: &[CandidateJourney]) -> Self {
        Self {
            journeys: journeys.iter().map(CandidateJourney::summary).collect(),
        }
    }
}

/// Response for address-based planning.
#[derive(Debug, Serialize)]
pub struct PlanByAddressResponse {
    /// Geocoded origin
    pub origin: Coordinate,

    /// Geocoded destination
    pub destination: Coordinate,

    /// Driving all the way, when a route exists
    pub car_only: Option<LegSummary>,

    pub journeys: Vec<JourneySummary>,
}

impl From<&AddressPlan> for PlanByAddressResponse {
    fn from(plan: &AddressPlan) -> Self {
        Self {
            origin: plan.origin,
            destination: plan.destination,
            car_only: plan
                .car_only
                .as_ref()
                .map(|leg| LegSummary::from_leg(leg, leg.depart_time)),
            journeys: plan.journeys.iter().map(CandidateJourney::summary).collect(),
        }
    }
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Mode, RouteLeg};

    #[test]
    fn plan_request_reads_lon_lat_pairs() {
        let json = r#"{
            "origin": [4.37212, 52.00234],
            "destination": [4.222, 52.06965],
            "depart_time": 1542387791
        }"#;

        let req: PlanJourneyRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.origin, Coordinate::new(4.37212, 52.00234));
        assert_eq!(req.destination.latitude, 52.06965);
        assert_eq!(req.depart_time, 1_542_387_791);
    }

    #[test]
    fn address_response_without_car_route() {
        let plan = AddressPlan {
            origin: Coordinate::new(4.37, 52.0),
            destination: Coordinate::new(4.22, 52.07),
            car_only: None,
            journeys: vec![],
        };

        let json = serde_json::to_value(PlanByAddressResponse::from(&plan)).unwrap();
        assert!(json["car_only"].is_null());
        assert_eq!(json["origin"][0], 4.37);
        assert_eq!(json["journeys"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn car_only_keeps_its_departure() {
        let plan = AddressPlan {
            origin: Coordinate::new(4.37, 52.0),
            destination: Coordinate::new(4.22, 52.07),
            car_only: Some(RouteLeg::new(Mode::Car, 915.0).with_depart_time(1_000)),
            journeys: vec![],
        };

        let response = PlanByAddressResponse::from(&plan);
        let car = response.car_only.unwrap();
        assert_eq!(car.depart_time, Some(1_000));
        assert_eq!(car.duration, 915.0);
    }
}
