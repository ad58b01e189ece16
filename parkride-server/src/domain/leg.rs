//! Single-mode route legs.
//!
//! A `RouteLeg` is what a leg provider returns for one request: a drive,
//! ride or walk from a routing engine, or one transit itinerary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport mode of a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Car,
    Bike,
    Foot,
    Transit,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Car => "car",
            Mode::Bike => "bike",
            Mode::Foot => "foot",
            Mode::Transit => "transit",
        };
        f.write_str(s)
    }
}

/// Routing profile accepted by a drive-leg provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Car,
    Bike,
    Foot,
}

impl From<Profile> for Mode {
    fn from(p: Profile) -> Self {
        match p {
            Profile::Car => Mode::Car,
            Profile::Bike => Mode::Bike,
            Profile::Foot => Mode::Foot,
        }
    }
}

/// Result of a single-mode trip segment.
///
/// Transit-only fields (`number_of_changes`, `origin_id`, `destination_id`,
/// `legs_detail`) stay at their defaults for road legs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub mode: Mode,

    /// Travelled distance, when the provider reports one.
    pub distance_meters: Option<f64>,

    pub duration_seconds: f64,

    /// Cost of the leg in the provider's currency.
    pub price: f64,

    /// Scheduled departure (epoch seconds), when known.
    pub depart_time: Option<i64>,

    pub number_of_changes: u32,

    /// Provider-specific location identifiers.
    pub origin_id: Option<String>,
    pub destination_id: Option<String>,

    /// Provider payload describing the itinerary, passed through untouched.
    pub legs_detail: Option<serde_json::Value>,

    /// URL for visualising the leg in an external viewer.
    pub deep_link: Option<String>,
}

impl RouteLeg {
    /// Creates a leg with the given mode and duration; all other fields empty.
    pub fn new(mode: Mode, duration_seconds: f64) -> Self {
        Self {
            mode,
            distance_meters: None,
            duration_seconds: duration_seconds.max(0.0),
            price: 0.0,
            depart_time: None,
            number_of_changes: 0,
            origin_id: None,
            destination_id: None,
            legs_detail: None,
            deep_link: None,
        }
    }

    /// Creates a road leg for a routing profile.
    pub fn road(profile: Profile, distance_meters: f64, duration_seconds: f64) -> Self {
        Self {
            distance_meters: Some(distance_meters.max(0.0)),
            ..Self::new(profile.into(), duration_seconds)
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price.max(0.0);
        self
    }

    pub fn with_depart_time(mut self, epoch_secs: i64) -> Self {
        self.depart_time = Some(epoch_secs);
        self
    }

    pub fn with_changes(mut self, changes: u32) -> Self {
        self.number_of_changes = changes;
        self
    }

    pub fn with_endpoints(
        mut self,
        origin_id: impl Into<String>,
        destination_id: impl Into<String>,
    ) -> Self {
        self.origin_id = Some(origin_id.into());
        self.destination_id = Some(destination_id.into());
        self
    }

    pub fn with_legs_detail(mut self, detail: serde_json::Value) -> Self {
        self.legs_detail = Some(detail);
        self
    }

    pub fn with_deep_link(mut self, url: impl Into<String>) -> Self {
        self.deep_link = Some(url.into());
        self
    }

    /// Returns true for a public-transport leg.
    pub fn is_transit(&self) -> bool {
        self.mode == Mode::Transit
    }
}
