//! Domain types for the park-and-ride planner.
//!
//! Everything here is plain data: coordinates, single-mode legs, parking
//! sites and composed candidate journeys. Provider responses are converted
//! into these types at the provider boundary, so the rest of the crate
//! never handles untyped payloads (apart from the pass-through fields).

mod coordinate;
mod journey;
mod leg;
mod parking;

pub use coordinate::Coordinate;
pub use journey::{CandidateJourney, JourneySummary, LegSummary, ParkingSummary};
pub use leg::{Mode, Profile, RouteLeg};
pub use parking::{Parking, ParkingDetail, ParkingRecord};
