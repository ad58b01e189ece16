//! Parking sites and their detail records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Coordinate;

/// A parking site discovered near a destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parking {
    /// Provider-assigned identifier, unique per site.
    pub id: String,
    pub coordinates: Coordinate,
    /// Empty when no detail record could be obtained.
    pub name: String,
    /// Flat full-day rate.
    pub price: f64,
    /// Empty when no detail record could be obtained.
    pub address: String,
}

impl Parking {
    /// Creates a parking with no name or address.
    pub fn new(id: impl Into<String>, coordinates: Coordinate, price: f64) -> Self {
        Self {
            id: id.into(),
            coordinates,
            name: String::new(),
            price: price.max(0.0),
            address: String::new(),
        }
    }

    /// Fills name and address from a detail record.
    pub fn with_detail(mut self, detail: &ParkingDetail) -> Self {
        self.name = detail.name().to_string();
        self.address = detail.full_address();
        self
    }
}

/// Raw listing entry as returned by a parking directory, already typed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParkingRecord {
    pub id: String,
    pub coordinates: Coordinate,
    /// Published 24 hour rate, if any.
    pub rate_24h: Option<f64>,
}

/// Detail record for one parking site.
///
/// The payload is kept exactly as the directory returned it so the persisted
/// record matches what was fetched. Name and address are read from it
/// leniently: a missing or non-string field reads as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParkingDetail(serde_json::Map<String, Value>);

impl ParkingDetail {
    /// Creates a record with name, address and city.
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        let mut payload = serde_json::Map::new();
        payload.insert("name".to_string(), Value::String(name.into()));
        payload.insert("address".to_string(), Value::String(address.into()));
        payload.insert("city".to_string(), Value::String(city.into()));
        Self(payload)
    }

    pub fn name(&self) -> &str {
        self.text("name")
    }

    pub fn address(&self) -> &str {
        self.text("address")
    }

    pub fn city(&self) -> &str {
        self.text("city")
    }

    /// The raw payload.
    pub fn payload(&self) -> &serde_json::Map<String, Value> {
        &self.0
    }

    /// Street address followed by city, skipping whichever is missing.
    pub fn full_address(&self) -> String {
        [self.address(), self.city()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn text(&self, key: &str) -> &str {
        self.0.get(key).and_then(Value::as_str).unwrap_or_default()
    }
}

impl From<serde_json::Map<String, Value>> for ParkingDetail {
    fn from(payload: serde_json::Map<String, Value>) -> Self {
        Self(payload)
    }
}
