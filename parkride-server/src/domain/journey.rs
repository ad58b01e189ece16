//! Park-and-ride candidate journeys.
//!
//! A `CandidateJourney` ties one parking site to the drive leg that reaches
//! it and the transit leg that continues from it. Totals and the
//! actionable departure time are derived on construction and never change.

use serde::Serialize;

use super::{Coordinate, Parking, RouteLeg};

/// A composed two-leg itinerary through one parking site.
///
/// # Invariants
///
/// - `total_duration = drive.duration + transfer_buffer + transit.duration`
/// - `total_price = drive.price + parking.price + transit.price`
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateJourney {
    parking: Parking,
    drive: RouteLeg,
    transit: RouteLeg,
    transfer_buffer_secs: f64,
    total_duration: f64,
    total_price: f64,
    effective_depart_time: i64,
}

impl CandidateJourney {
    /// Builds a journey from resolved legs.
    ///
    /// `transit_requested_after` stands in for the transit departure when the
    /// provider did not report one.
    pub(crate) fn new(
        parking: Parking,
        drive: RouteLeg,
        transit: RouteLeg,
        transfer_buffer_secs: f64,
        transit_requested_after: i64,
    ) -> Self {
        let transfer_buffer_secs = transfer_buffer_secs.max(0.0);
        let total_duration =
            drive.duration_seconds + transfer_buffer_secs + transit.duration_seconds;
        let total_price = drive.price + parking.price + transit.price;

        let transit_depart = transit.depart_time.unwrap_or(transit_requested_after);
        let effective_depart_time =
            (transit_depart as f64 - transfer_buffer_secs - drive.duration_seconds).floor() as i64;

        Self {
            parking,
            drive,
            transit,
            transfer_buffer_secs,
            total_duration,
            total_price,
            effective_depart_time,
        }
    }

    pub fn parking(&self) -> &Parking {
        &self.parking
    }

    pub fn drive(&self) -> &RouteLeg {
        &self.drive
    }

    pub fn transit(&self) -> &RouteLeg {
        &self.transit
    }

    pub fn transfer_buffer_secs(&self) -> f64 {
        self.transfer_buffer_secs
    }

    /// Door-to-door duration in seconds.
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn total_price(&self) -> f64 {
        self.total_price
    }

    /// Latest moment (epoch seconds) to leave the origin and still catch
    /// the planned transit departure.
    pub fn effective_depart_time(&self) -> i64 {
        self.effective_depart_time
    }

    /// Display/export view of this journey.
    pub fn summary(&self) -> JourneySummary {
        JourneySummary {
            duration: self.total_duration,
            price: self.total_price,
            depart_time: self.effective_depart_time,
            parking: ParkingSummary {
                id: self.parking.id.clone(),
                name: self.parking.name.clone(),
                address: self.parking.address.clone(),
                coordinates: self.parking.coordinates,
                price: self.parking.price,
            },
            car: LegSummary::from_leg(&self.drive, Some(self.effective_depart_time)),
            pt: LegSummary::from_leg(&self.transit, self.transit.depart_time),
        }
    }
}

/// Serialisable summary of a candidate journey.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneySummary {
    pub duration: f64,
    pub price: f64,
    /// Actionable departure from the origin.
    pub depart_time: i64,
    pub parking: ParkingSummary,
    pub car: LegSummary,
    pub pt: LegSummary,
}

/// Parking as shown in a journey summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParkingSummary {
    pub id: String,
    pub name: String,
    pub address: String,
    pub coordinates: Coordinate,
    pub price: f64,
}

/// One leg as shown in a journey summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegSummary {
    pub duration: f64,
    pub price: f64,
    pub depart_time: Option<i64>,
    pub changes: u32,
    pub url: Option<String>,
}

impl LegSummary {
    pub fn from_leg(leg: &RouteLeg, depart_time: Option<i64>) -> Self {
        Self {
            duration: leg.duration_seconds,
            price: leg.price,
            depart_time,
            changes: leg.number_of_changes,
            url: leg.deep_link.clone(),
        }
    }
}
