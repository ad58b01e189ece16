//! Scenario tests for the planner facade, run against the stub providers.

use super::*;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use crate::domain::{ParkingDetail, ParkingRecord};
use crate::parking::{DetailCacheConfig, ParkingDetailCache};
use crate::providers::RetryPolicy;
use crate::providers::mock::{StubDirectory, StubDrive, StubGeocoder, StubTransit};

const TU_DELFT: Coordinate = Coordinate::new(4.37212, 52.00234);
const KIJKDUIN: Coordinate = Coordinate::new(4.22200, 52.06965);

/// 2018-11-16 16:03 UTC
const DEPART: i64 = 1_542_387_791;

const PR_KIJKDUIN: Coordinate = Coordinate::new(4.2233, 52.0701);
const DELTAPLEIN: Coordinate = Coordinate::new(4.2210, 52.0680);
const GARAGE: Coordinate = Coordinate::new(4.2222, 52.0697);

fn record(id: &str, at: Coordinate, rate: Option<f64>) -> ParkingRecord {
    ParkingRecord {
        id: id.to_string(),
        coordinates: at,
        rate_24h: rate,
    }
}

fn kijkduin_parkings() -> StubDirectory {
    StubDirectory::new()
        .with_parking(
            record("pr-kijkduin", PR_KIJKDUIN, Some(7.5)),
            ParkingDetail::new("P+R Kijkduin", "Deltaplein 100", "Den Haag"),
        )
        .with_parking(
            record("deltaplein", DELTAPLEIN, None),
            ParkingDetail::new("Deltaplein", "Deltaplein 1", "Den Haag"),
        )
        .with_parking(
            record("garage", GARAGE, Some(20.0)),
            ParkingDetail::new("Garage Kijkduin", "Kijkduinsestraat 3", "Den Haag"),
        )
}

struct Fixture {
    _dir: TempDir,
    drive: StubDrive,
    transit: StubTransit,
    directory: ParkingDirectory<StubDirectory>,
    config: PlannerConfig,
}

impl Fixture {
    fn new(stub: StubDirectory) -> Self {
        Self::with_legs(stub, StubDrive::new(), StubTransit::new())
    }

    fn with_legs(stub: StubDirectory, drive: StubDrive, transit: StubTransit) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParkingDetailCache::load(DetailCacheConfig::new(dir.path().join("d.json")));
        let retry = RetryPolicy::new(Duration::from_millis(1), 2);

        Self {
            _dir: dir,
            drive,
            transit,
            directory: ParkingDirectory::new(stub, Arc::new(cache), retry),
            config: PlannerConfig::default(),
        }
    }

    fn planner(&self) -> Planner<'_, StubDrive, StubTransit, StubDirectory> {
        Planner::new(&self.drive, &self.transit, &self.directory, &self.config)
    }
}

fn ids(journeys: &[CandidateJourney]) -> Vec<&str> {
    journeys.iter().map(|j| j.parking().id.as_str()).collect()
}

#[tokio::test]
async fn delft_to_kijkduin() {
    let fixture = Fixture::new(kijkduin_parkings());
    let journeys = fixture.planner().plan(TU_DELFT, KIJKDUIN, DEPART).await.unwrap();

    assert_eq!(journeys.len(), 3);
    // Parking price dominates: the free site first, then the 3.75 one.
    assert_eq!(&ids(&journeys)[..2], &["deltaplein", "pr-kijkduin"]);
    assert_eq!(fixture.drive.calls(), 3);
    assert_eq!(fixture.transit.calls(), 3);

    for journey in &journeys {
        let drive = journey.drive();
        let transit = journey.transit();
        assert!(journey.effective_depart_time() >= DEPART);
        assert!(
            (journey.total_duration()
                - (drive.duration_seconds + 180.0 + transit.duration_seconds))
                .abs()
                < 1e-6
        );
        assert!(
            (journey.total_price() - (drive.price + journey.parking().price + transit.price))
                .abs()
                < 1e-6
        );
        assert!(transit.depart_time.unwrap() >= DEPART + drive.duration_seconds as i64 + 180);
    }

    let summary = journeys[1].summary();
    assert_eq!(summary.parking.name, "P+R Kijkduin");
    assert_eq!(summary.parking.address, "Deltaplein 100, Den Haag");
    assert_eq!(summary.parking.price, 3.75);
    assert_eq!(summary.car.depart_time, Some(summary.depart_time));
}

#[tokio::test]
async fn failing_candidates_are_dropped() {
    let drive = StubDrive::new().with_unreachable(GARAGE);
    let transit = StubTransit::new().with_unserved(DELTAPLEIN);
    let fixture = Fixture::with_legs(kijkduin_parkings(), drive, transit);

    let journeys = fixture.planner().plan(TU_DELFT, KIJKDUIN, DEPART).await.unwrap();
    assert_eq!(ids(&journeys), vec!["pr-kijkduin"]);
}

#[tokio::test]
async fn no_parkings_nearby_is_empty() {
    let fixture = Fixture::new(kijkduin_parkings());
    let far_away = Coordinate::new(5.1214, 52.0907);

    let journeys = fixture.planner().plan(TU_DELFT, far_away, DEPART).await.unwrap();
    assert!(journeys.is_empty());
    assert_eq!(fixture.drive.calls(), 0);
}

#[tokio::test]
async fn directory_failure_is_fatal() {
    let fixture = Fixture::new(kijkduin_parkings().with_throttled_calls(5));

    let result = fixture.planner().plan(TU_DELFT, KIJKDUIN, DEPART).await;
    assert!(matches!(
        result,
        Err(PlanError::Directory(ProviderError::RetryExhausted { attempts: 2 }))
    ));
}

#[tokio::test]
async fn batch_size_does_not_change_result() {
    let wide = Fixture::new(kijkduin_parkings());
    let mut narrow = Fixture::new(kijkduin_parkings());
    narrow.config = PlannerConfig::default().with_batch_size(1);

    let a = wide.planner().plan(TU_DELFT, KIJKDUIN, DEPART).await.unwrap();
    let b = narrow.planner().plan(TU_DELFT, KIJKDUIN, DEPART).await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn plan_by_address_includes_car_only_route() {
    let fixture = Fixture::new(kijkduin_parkings());
    let geocoder = StubGeocoder::new()
        .with_address("Mekelweg 5, Delft", TU_DELFT)
        .with_address("Deltaplein, Den Haag", KIJKDUIN);

    let plan = fixture
        .planner()
        .plan_by_address(&geocoder, "Mekelweg 5, Delft", "Deltaplein, Den Haag", DEPART)
        .await
        .unwrap();

    assert_eq!(plan.origin, TU_DELFT);
    assert_eq!(plan.destination, KIJKDUIN);
    assert_eq!(plan.journeys.len(), 3);

    let car = plan.car_only.unwrap();
    assert_eq!(car.depart_time, Some(DEPART));
    assert!(car.distance_meters.unwrap() > 12_000.0);
}

#[tokio::test]
async fn unreachable_destination_still_plans() {
    let drive = StubDrive::new().with_unreachable(KIJKDUIN);
    let fixture = Fixture::with_legs(kijkduin_parkings(), drive, StubTransit::new());
    let geocoder = StubGeocoder::new()
        .with_address("Delft", TU_DELFT)
        .with_address("Kijkduin", KIJKDUIN);

    let plan = fixture
        .planner()
        .plan_by_address(&geocoder, "Delft", "Kijkduin", DEPART)
        .await
        .unwrap();

    assert!(plan.car_only.is_none());
    assert_eq!(plan.journeys.len(), 3);
}

#[tokio::test]
async fn unknown_address_is_geocode_error() {
    let fixture = Fixture::new(kijkduin_parkings());
    let geocoder = StubGeocoder::new().with_address("Delft", TU_DELFT);

    let result = fixture
        .planner()
        .plan_by_address(&geocoder, "Delft", "Atlantis", DEPART)
        .await;

    match result {
        Err(PlanError::Geocode { address, source }) => {
            assert_eq!(address, "Atlantis");
            assert!(matches!(source, ProviderError::AddressNotFound(_)));
        }
        other => panic!("expected geocode error, got {other:?}"),
    }
}

#[tokio::test]
async fn departure_near_end_of_time_does_not_overflow() {
    let fixture = Fixture::new(kijkduin_parkings());
    let journeys = fixture
        .planner()
        .plan(TU_DELFT, KIJKDUIN, i64::MAX - 100)
        .await
        .unwrap();

    assert_eq!(journeys.len(), 3);
    assert!(journeys.iter().all(|j| j.transit().depart_time == Some(i64::MAX)));
}
