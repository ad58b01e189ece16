//! Spherical geometry helpers.
//!
//! Distances use the haversine formula on a sphere of mean Earth radius.
//! Good to a few metres at city scale, which is all the planner needs.

use serde::{Deserialize, Serialize};

use crate::domain::Coordinate;

/// Mean Earth radius in metres (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Multiplier applied to the radius when projecting bounding box corners.
/// Must exceed sqrt(2) for the box to contain the full radius circle.
pub const BBOX_SAFETY_FACTOR: f64 = 1.5;

/// Axis-aligned box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub north: f64,
    pub east: f64,
    pub south: f64,
}

impl BoundingBox {
    /// Returns true if the coordinate lies inside the box (edges included).
    pub fn contains(&self, c: Coordinate) -> bool {
        (self.west..=self.east).contains(&c.longitude)
            && (self.south..=self.north).contains(&c.latitude)
    }
}

/// Great-circle distance between two coordinates, in metres.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Point reached by travelling `distance_m` from `origin` on an initial
/// bearing of `bearing_deg` (clockwise from north).
pub fn destination_point(origin: Coordinate, bearing_deg: f64, distance_m: f64) -> Coordinate {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    let mut lon2 = lon2.to_degrees();
    if lon2 >= 180.0 {
        lon2 -= 360.0;
    } else if lon2 < -180.0 {
        lon2 += 360.0;
    }
    Coordinate::new(lon2, lat2.to_degrees())
}

/// Box containing every point within `radius_m` of `center`.
///
/// Corners are projected on the 225° and 45° diagonals at an oversized
/// distance, so the box is loose but always contains the circle.
pub fn bounding_box(center: Coordinate, radius_m: f64) -> BoundingBox {
    let reach = radius_m.max(0.0) * BBOX_SAFETY_FACTOR;
    let sw = destination_point(center, 225.0, reach);
    let ne = destination_point(center, 45.0, reach);

    // Folding the center in keeps it inside despite degree/radian rounding
    BoundingBox {
        west: sw.longitude.min(ne.longitude).min(center.longitude),
        north: sw.latitude.max(ne.latitude).max(center.latitude),
        east: sw.longitude.max(ne.longitude).max(center.longitude),
        south: sw.latitude.min(ne.latitude).min(center.latitude),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TU_DELFT: Coordinate = Coordinate::new(4.37212, 52.00234);
    const KIJKDUIN: Coordinate = Coordinate::new(4.22200, 52.06965);

    #[test]
    fn distance_delft_to_kijkduin() {
        let d = distance(TU_DELFT, KIJKDUIN);
        // About 12.6 km as the crow flies
        assert!((12_000.0..13_500.0).contains(&d), "got {d}");
        assert!((distance(KIJKDUIN, TU_DELFT) - d).abs() < 1e-6);
        assert_eq!(distance(TU_DELFT, TU_DELFT), 0.0);
    }

    #[test]
    fn destination_point_round_trips_distance() {
        for bearing in [0.0, 45.0, 90.0, 180.0, 270.0, 333.0] {
            let p = destination_point(KIJKDUIN, bearing, 5_000.0);
            assert!((distance(KIJKDUIN, p) - 5_000.0).abs() < 0.5, "bearing {bearing}");
        }
    }

    #[test]
    fn destination_point_north_increases_latitude() {
        let p = destination_point(TU_DELFT, 0.0, 1_000.0);
        assert!(p.latitude > TU_DELFT.latitude);
        assert!((p.longitude - TU_DELFT.longitude).abs() < 1e-9);
    }

    #[test]
    fn bbox_contains_center_and_radius_circle() {
        for radius in [100.0, 1_000.0, 10_000.0, 30_000.0] {
            let bbox = bounding_box(TU_DELFT, radius);
            assert!(bbox.contains(TU_DELFT));

            for step in 0..24 {
                let bearing = step as f64 * 15.0;
                let edge = destination_point(TU_DELFT, bearing, radius);
                assert!(bbox.contains(edge), "radius {radius} bearing {bearing}");
            }
        }
    }

    #[test]
    fn bbox_is_ordered() {
        let bbox = bounding_box(KIJKDUIN, 1_000.0);
        assert!(bbox.west < bbox.east);
        assert!(bbox.south < bbox.north);
    }

    #[test]
    fn zero_radius_box_still_contains_center() {
        let bbox = bounding_box(KIJKDUIN, 0.0);
        assert!(bbox.contains(KIJKDUIN));
    }
}
