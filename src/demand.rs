use itertools::Itertools;

use crate::{
    city::CityNodeIdx,
    col::{map_new, HashMap},
    primitives::FVal,
};

/// Sparse origin-destination matrix in passengers per hour.
#[derive(Debug, Clone, Default)]
pub struct Demand {
    trips: HashMap<(CityNodeIdx, CityNodeIdx), FVal>,
}

impl Demand {
    pub fn new() -> Self {
        Self { trips: map_new() }
    }

    pub fn insert(&mut self, origin: CityNodeIdx, destination: CityNodeIdx, trips: FVal) {
        assert!(trips >= 0.0, "Negative demand {:} for {:?}->{:?}", trips, origin, destination);
        self.trips.insert((origin, destination), trips);
    }

    /// Trips of a pair that was inserted, including zero and diagonal entries.
    pub fn trips(&self, origin: CityNodeIdx, destination: CityNodeIdx) -> Option<FVal> {
        self.trips.get(&(origin, destination)).copied()
    }

    /// OD pairs that actually travel, in ascending (origin, destination) order.
    pub fn pairs(&self) -> Vec<(CityNodeIdx, CityNodeIdx, FVal)> {
        self.trips
            .iter()
            .filter(|&(&(origin, destination), &trips)| origin != destination && trips > 0.0)
            .map(|(&(origin, destination), &trips)| (origin, destination, trips))
            .sorted_by_key(|&(origin, destination, _)| (origin, destination))
            .collect()
    }

    pub fn destinations(&self) -> Vec<CityNodeIdx> {
        self.pairs()
            .into_iter()
            .map(|(_, destination, _)| destination)
            .sorted()
            .dedup()
            .collect()
    }

    pub fn total(&self) -> FVal {
        self.pairs().iter().map(|&(_, _, trips)| trips).sum()
    }
}

#[cfg(test)]
mod tests {
    use crate::city::CityNodeIdx;

    use super::Demand;

    #[test]
    fn pairs_skip_diagonal_and_empty() {
        let mut demand = Demand::new();
        demand.insert(CityNodeIdx(2), CityNodeIdx(0), 5.0);
        demand.insert(CityNodeIdx(0), CityNodeIdx(2), 10.0);
        demand.insert(CityNodeIdx(1), CityNodeIdx(1), 7.0);
        demand.insert(CityNodeIdx(1), CityNodeIdx(0), 0.0);
        assert_eq!(
            demand.pairs(),
            vec![
                (CityNodeIdx(0), CityNodeIdx(2), 10.0),
                (CityNodeIdx(2), CityNodeIdx(0), 5.0)
            ]
        );
        assert_eq!(demand.destinations(), vec![CityNodeIdx(0), CityNodeIdx(2)]);
        assert_eq!(demand.trips(CityNodeIdx(1), CityNodeIdx(1)), Some(7.0));
        assert_eq!(demand.trips(CityNodeIdx(1), CityNodeIdx(0)), Some(0.0));
        assert_eq!(demand.trips(CityNodeIdx(0), CityNodeIdx(1)), None);
        assert_eq!(demand.total(), 15.0);
    }
}
