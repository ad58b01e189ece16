//! Picking the journeys worth showing.
//!
//! Travellers mostly care about two things: what a trip costs and how long
//! it takes. Rather than ranking on a blend of both, the selector keeps the
//! few cheapest and the few quickest candidates.

use crate::domain::CandidateJourney;

/// Indices of `candidates` ordered by `key`, ties kept in input order.
fn order_by(candidates: &[CandidateJourney], key: impl Fn(&CandidateJourney) -> f64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| key(&candidates[a]).total_cmp(&key(&candidates[b])));
    order
}

/// Keeps the `cheapest` lowest-price and `quickest` shortest candidates.
///
/// Cheapest picks come first, then quickest picks not already chosen. A
/// journey that is both cheap and quick appears once.
pub fn select_journeys(
    candidates: Vec<CandidateJourney>,
    cheapest: usize,
    quickest: usize,
) -> Vec<CandidateJourney> {
    let by_price = order_by(&candidates, CandidateJourney::total_price);
    let by_duration = order_by(&candidates, CandidateJourney::total_duration);

    let mut picked: Vec<usize> = by_price.into_iter().take(cheapest).collect();
    for idx in by_duration.into_iter().take(quickest) {
        if !picked.contains(&idx) {
            picked.push(idx);
        }
    }

    let mut slots: Vec<Option<CandidateJourney>> = candidates.into_iter().map(Some).collect();
    picked
        .into_iter()
        .filter_map(|idx| slots[idx].take())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinate, Mode, Parking, RouteLeg};
    use proptest::prelude::*;

    fn journey(id: &str, price: f64, duration: f64) -> CandidateJourney {
        let parking = Parking::new(id, Coordinate::new(4.3, 52.0), 0.0);
        let drive = RouteLeg::new(Mode::Car, duration).with_price(price);
        let transit = RouteLeg::new(Mode::Transit, 0.0).with_depart_time(0);
        CandidateJourney::new(parking, drive, transit, 0.0, 0)
    }

    fn ids(journeys: &[CandidateJourney]) -> Vec<&str> {
        journeys.iter().map(|j| j.parking().id.as_str()).collect()
    }

    #[test]
    fn cheapest_then_quickest() {
        let candidates = vec![
            journey("slow-cheap", 1.0, 3_000.0),
            journey("fast-pricey", 9.0, 1_000.0),
            journey("middle", 5.0, 2_000.0),
            journey("cheap-ish", 2.0, 2_500.0),
            journey("fastest", 12.0, 900.0),
        ];

        let selected = select_journeys(candidates, 2, 2);
        assert_eq!(
            ids(&selected),
            vec!["slow-cheap", "cheap-ish", "fastest", "fast-pricey"]
        );
    }

    #[test]
    fn overlap_is_not_duplicated() {
        let candidates = vec![
            journey("best", 1.0, 1_000.0),
            journey("second", 2.0, 2_000.0),
            journey("worst", 3.0, 3_000.0),
        ];

        let selected = select_journeys(candidates, 2, 2);
        assert_eq!(ids(&selected), vec!["best", "second"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let candidates = vec![
            journey("a", 1.0, 500.0),
            journey("b", 1.0, 500.0),
            journey("c", 1.0, 500.0),
        ];

        let selected = select_journeys(candidates, 2, 2);
        assert_eq!(ids(&selected), vec!["a", "b"]);
    }

    #[test]
    fn small_inputs_pass_through() {
        assert!(select_journeys(vec![], 2, 2).is_empty());

        let selected = select_journeys(vec![journey("only", 4.0, 100.0)], 2, 2);
        assert_eq!(ids(&selected), vec!["only"]);
    }

    fn candidates_strategy() -> impl Strategy<Value = Vec<CandidateJourney>> {
        prop::collection::vec((0u32..50, 0u32..10_000), 0..12).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (price, duration))| {
                    journey(&format!("p{i}"), f64::from(price), f64::from(duration))
                })
                .collect()
        })
    }

    /// True when `j` is among the top two of `all` by `key`.
    fn in_top_two(
        j: &CandidateJourney,
        all: &[CandidateJourney],
        key: fn(&CandidateJourney) -> f64,
    ) -> bool {
        let better = all.iter().filter(|&o| key(o) < key(j)).count();
        better < 2
    }

    proptest! {
        #[test]
        fn selection_size_is_bounded(candidates in candidates_strategy()) {
            let n = candidates.len();
            let selected = select_journeys(candidates, 2, 2);

            prop_assert!(selected.len() >= n.min(2));
            prop_assert!(selected.len() <= 4);
        }

        #[test]
        fn selection_members_are_top_two(candidates in candidates_strategy()) {
            let selected = select_journeys(candidates.clone(), 2, 2);

            for j in &selected {
                prop_assert!(
                    in_top_two(j, &candidates, CandidateJourney::total_price)
                        || in_top_two(j, &candidates, CandidateJourney::total_duration),
                    "{} is neither cheap nor quick",
                    j.parking().id
                );
            }
        }

        #[test]
        fn selection_has_no_duplicates(candidates in candidates_strategy()) {
            let selected = select_journeys(candidates, 2, 2);
            let mut seen: Vec<&str> = ids(&selected);
            seen.sort_unstable();
            seen.dedup();
            prop_assert_eq!(seen.len(), selected.len());
        }
    }
}
