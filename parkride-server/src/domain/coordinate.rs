//! Longitude/latitude coordinate type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A point on the Earth's surface, in degrees.
///
/// Serialises as a `[longitude, latitude]` pair, the order every provider
/// in this crate uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from longitude and latitude.
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Returns true if both components are finite and within range.
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }

    /// Hashable key with 1e-5 degree resolution (about a metre).
    pub fn grid_key(&self) -> (i64, i64) {
        (
            (self.longitude * 1e5).round() as i64,
            (self.latitude * 1e5).round() as i64,
        )
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((longitude, latitude): (f64, f64)) -> Self {
        Self::new(longitude, latitude)
    }
}

impl From<Coordinate> for (f64, f64) {
    fn from(c: Coordinate) -> Self {
        (c.longitude, c.latitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.longitude, self.latitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_as_lon_lat_pair() {
        let c = Coordinate::new(4.37212, 52.00234);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "[4.37212,52.00234]");

        let back: Coordinate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn validity() {
        assert!(Coordinate::new(4.2, 52.0).is_valid());
        assert!(!Coordinate::new(200.0, 52.0).is_valid());
        assert!(!Coordinate::new(4.2, f64::NAN).is_valid());
    }

    #[test]
    fn grid_key_merges_nearby_points() {
        let a = Coordinate::new(4.222001, 52.069651);
        let b = Coordinate::new(4.222003, 52.069649);
        assert_eq!(a.grid_key(), b.grid_key());
        assert_ne!(a.grid_key(), Coordinate::new(4.2221, 52.06965).grid_key());
    }

    #[test]
    fn display() {
        assert_eq!(Coordinate::new(4.2, 52.0).to_string(), "4.20000,52.00000");
    }
}
