//! Combining a drive leg and a transit leg into one journey.

use crate::domain::{CandidateJourney, Parking, RouteLeg};

/// Earliest transit departure worth asking for: the moment the traveller
/// has parked and walked to the stop. Saturates at `i64::MAX`.
pub fn transit_depart_after(depart_time: i64, drive: &RouteLeg, transfer_buffer_secs: f64) -> i64 {
    depart_time
        .saturating_add(drive.duration_seconds.ceil() as i64)
        .saturating_add(transfer_buffer_secs.max(0.0).ceil() as i64)
}

/// Builds the candidate journey through `parking`.
///
/// `depart_time` is the departure the traveller asked for; it only matters
/// when the transit leg carries no departure time of its own.
pub fn compose(
    parking: Parking,
    drive: RouteLeg,
    transit: RouteLeg,
    transfer_buffer_secs: f64,
    depart_time: i64,
) -> CandidateJourney {
    let requested_after = transit_depart_after(depart_time, &drive, transfer_buffer_secs);
    CandidateJourney::new(parking, drive, transit, transfer_buffer_secs, requested_after)
}
