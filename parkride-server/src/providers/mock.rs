//! Deterministic in-memory providers.
//!
//! Used by the planner and cache tests, and by anyone wanting to exercise
//! the HTTP surface without upstream credentials. Road and transit legs are
//! derived from great-circle distance at fixed speeds, so results only
//! depend on the coordinates.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::domain::{Coordinate, Mode, ParkingDetail, ParkingRecord, Profile, RouteLeg};
use crate::geo::{self, BoundingBox};

use super::error::ProviderError;
use super::{DriveLegProvider, GeocodingProvider, ParkingDirectoryProvider, TransitLegProvider};

/// Speeds in metres per second.
const CAR_SPEED: f64 = 50.0 / 3.6;
const BIKE_SPEED: f64 = 15.0 / 3.6;
const FOOT_SPEED: f64 = 5.0 / 3.6;
const TRANSIT_SPEED: f64 = 25.0 / 3.6;

/// Transit departs on a fixed headway aligned to the epoch.
const TRANSIT_HEADWAY_SECS: i64 = 600;

/// Road routing by straight-line distance.
#[derive(Debug)]
pub struct StubDrive {
    cost_per_km: f64,
    unreachable: HashSet<(i64, i64)>,
    calls: AtomicUsize,
}

impl Default for StubDrive {
    fn default() -> Self {
        Self::new()
    }
}

impl StubDrive {
    pub fn new() -> Self {
        Self {
            cost_per_km: 0.19,
            unreachable: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Routes ending at `destination` fail with `NoRouteFound`.
    pub fn with_unreachable(mut self, destination: Coordinate) -> Self {
        self.unreachable.insert(destination.grid_key());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DriveLegProvider for StubDrive {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        profile: Profile,
    ) -> Result<RouteLeg, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.contains(&destination.grid_key()) {
            return Err(ProviderError::NoRouteFound);
        }

        let distance = geo::distance(origin, destination);
        let speed = match profile {
            Profile::Car => CAR_SPEED,
            Profile::Bike => BIKE_SPEED,
            Profile::Foot => FOOT_SPEED,
        };
        let leg = RouteLeg::road(profile, distance, (distance / speed).round());

        Ok(match profile {
            Profile::Car => leg.with_price(distance / 1000.0 * self.cost_per_km),
            _ => leg,
        })
    }
}

/// Public transport on a fixed headway with a distance-based fare.
#[derive(Debug)]
pub struct StubTransit {
    fare_per_km: f64,
    unserved: HashSet<(i64, i64)>,
    calls: AtomicUsize,
}

impl Default for StubTransit {
    fn default() -> Self {
        Self::new()
    }
}

impl StubTransit {
    pub fn new() -> Self {
        Self {
            fare_per_km: 0.25,
            unserved: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// No stop near `origin`: location lookup fails for it.
    pub fn with_unserved(mut self, origin: Coordinate) -> Self {
        self.unserved.insert(origin.grid_key());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TransitLegProvider for StubTransit {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        depart_after: i64,
    ) -> Result<RouteLeg, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let from = self.resolve_location_id(origin).await?;
        let to = self.resolve_location_id(destination).await?;

        let distance = geo::distance(origin, destination);
        let departure = next_departure(depart_after);
        let fare = (distance / 1000.0 * self.fare_per_km * 100.0).round() / 100.0;

        Ok(RouteLeg::new(Mode::Transit, (distance / TRANSIT_SPEED).round())
            .with_depart_time(departure)
            .with_price(fare)
            .with_changes(u32::from(distance > 5_000.0))
            .with_endpoints(from, to))
    }

    async fn resolve_location_id(&self, coordinate: Coordinate) -> Result<String, ProviderError> {
        if self.unserved.contains(&coordinate.grid_key()) {
            return Err(ProviderError::LocationNotResolved(coordinate));
        }
        let (x, y) = coordinate.grid_key();
        Ok(format!("stop-{x}-{y}"))
    }
}

/// First departure on the headway at or after `t`.
pub fn next_departure(t: i64) -> i64 {
    let wait = if t.rem_euclid(TRANSIT_HEADWAY_SECS) == 0 {
        0
    } else {
        TRANSIT_HEADWAY_SECS
    };
    (t.div_euclid(TRANSIT_HEADWAY_SECS) * TRANSIT_HEADWAY_SECS).saturating_add(wait)
}

/// Parking directory over a fixed set of records.
///
/// Can be told to throttle the next few calls, fail detail lookups for
/// given ids, or stall on one id forever after signalling a `Notify`.
#[derive(Debug, Default)]
pub struct StubDirectory {
    records: Vec<ParkingRecord>,
    details: HashMap<String, ParkingDetail>,
    failing: HashSet<String>,
    throttled_calls: AtomicUsize,
    stall: Option<(String, Arc<Notify>)>,
    list_calls: AtomicUsize,
    detail_calls: Mutex<Vec<String>>,
}

impl StubDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parking(mut self, record: ParkingRecord, detail: ParkingDetail) -> Self {
        self.details.insert(record.id.clone(), detail);
        self.records.push(record);
        self
    }

    /// A detail record without a listing entry.
    pub fn with_detail(mut self, id: impl Into<String>, detail: ParkingDetail) -> Self {
        self.details.insert(id.into(), detail);
        self
    }

    /// Detail lookups for `id` fail with an API error.
    pub fn with_failing_detail(mut self, id: impl Into<String>) -> Self {
        self.failing.insert(id.into());
        self
    }

    /// The next `n` calls (list or detail) answer `RateLimited`.
    pub fn with_throttled_calls(self, n: usize) -> Self {
        self.throttled_calls.store(n, Ordering::SeqCst);
        self
    }

    /// Detail lookup for `id` notifies `signal` then never completes.
    pub fn with_stall(mut self, id: impl Into<String>, signal: Arc<Notify>) -> Self {
        self.stall = Some((id.into(), signal));
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Ids passed to `detail`, in call order.
    pub fn detail_calls(&self) -> Vec<String> {
        self.detail_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn take_throttle(&self) -> bool {
        self.throttled_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl ParkingDirectoryProvider for StubDirectory {
    async fn list(&self, bbox: BoundingBox) -> Result<Vec<ParkingRecord>, ProviderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.take_throttle() {
            return Err(ProviderError::RateLimited);
        }

        Ok(self
            .records
            .iter()
            .filter(|r| bbox.contains(r.coordinates))
            .cloned()
            .collect())
    }

    async fn detail(&self, id: &str) -> Result<ParkingDetail, ProviderError> {
        if let Ok(mut calls) = self.detail_calls.lock() {
            calls.push(id.to_string());
        }
        if self.take_throttle() {
            return Err(ProviderError::RateLimited);
        }

        if let Some((stall_id, signal)) = &self.stall {
            if stall_id == id {
                signal.notify_one();
                std::future::pending::<()>().await;
            }
        }

        if self.failing.contains(id) {
            return Err(ProviderError::Api {
                status: 500,
                message: format!("no detail for {id}"),
            });
        }

        self.details.get(id).cloned().ok_or_else(|| ProviderError::Api {
            status: 404,
            message: format!("unknown parking {id}"),
        })
    }
}

/// Geocoder over a fixed address book.
#[derive(Debug, Default)]
pub struct StubGeocoder {
    addresses: HashMap<String, Coordinate>,
}

impl StubGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, address: impl Into<String>, at: Coordinate) -> Self {
        self.addresses.insert(address.into(), at);
        self
    }
}

impl GeocodingProvider for StubGeocoder {
    async fn forward(&self, address: &str) -> Result<Coordinate, ProviderError> {
        self.addresses
            .get(address)
            .copied()
            .ok_or_else(|| ProviderError::AddressNotFound(address.to_string()))
    }
}
