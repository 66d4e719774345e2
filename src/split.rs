use log::{debug, warn};

use crate::{
    city::CityNodeIdx,
    col::{map_new, HashMap, SeededTable},
    demand::Demand,
    extended_graph::{ExtNodeIdx, ExtendedGraph},
    labels::HyperpathTable,
    passenger::Passenger,
    primitives::Cost,
};

/// A stop at the origin that reaches the destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopCandidate {
    pub stop: ExtNodeIdx,
    pub divisor: u32,
    pub label: Cost,
}

/// Percentages of an OD pair's demand entering through each candidate, in
/// candidate order.
///
/// The primary stop is the first one with divisor 1, the alternative is the
/// cheapest of the others (first one on ties). Any further stop gets 0.
pub fn split_shares(
    candidates: &[StopCandidate],
    passenger: &Passenger,
    catchment_width: f64,
) -> Vec<f64> {
    let mut shares = vec![0.0; candidates.len()];
    let primary = candidates.iter().position(|it| it.divisor == 1);
    let alternative = candidates
        .iter()
        .enumerate()
        .filter(|&(idx, _)| Some(idx) != primary)
        .fold(None, |cheapest: Option<(usize, &StopCandidate)>, (idx, candidate)| {
            match cheapest {
                Some((_, current)) if current.label <= candidate.label => cheapest,
                _ => Some((idx, candidate)),
            }
        })
        .map(|(idx, _)| idx);

    match (primary, alternative) {
        (None, None) => {}
        (Some(only), None) | (None, Some(only)) => shares[only] = 100.0,
        (Some(primary), Some(alternative)) => {
            let (primary_share, alternative_share) = split_between(
                &candidates[primary],
                &candidates[alternative],
                passenger,
                catchment_width,
            );
            shares[primary] = primary_share;
            shares[alternative] = alternative_share;
        }
    }
    shares
}

/// Catchment competition between a stop with divisor 1 at the centre of the
/// catchment and `alternative.divisor` evenly spaced competing stops.
fn split_between(
    primary: &StopCandidate,
    alternative: &StopCandidate,
    passenger: &Passenger,
    catchment_width: f64,
) -> (f64, f64) {
    let step = catchment_width / alternative.divisor as f64;
    if primary.label <= alternative.label {
        let dist = passenger.indifference_distance(alternative.label - primary.label);
        if dist >= catchment_width / 2.0 {
            return (100.0, 0.0);
        }
        // Competing stops to one side of the primary stop.
        let mut position = step / 2.0;
        for _ in 0..alternative.divisor / 2 {
            if position > dist {
                let primary_share = (2.0 * dist + (position - dist)) / catchment_width * 100.0;
                return (primary_share, 100.0 - primary_share);
            }
            position += step;
        }
        (100.0, 0.0)
    } else {
        if alternative.divisor % 2 == 1 {
            return (0.0, 100.0);
        }
        let dist = passenger.indifference_distance(primary.label - alternative.label);
        let position = step / 2.0;
        if dist >= position {
            return (0.0, 100.0);
        }
        let primary_share = (position - dist) / catchment_width * 100.0;
        (primary_share, 100.0 - primary_share)
    }
}

/// Assignment fractions keyed by (origin, destination, stop).
///
/// Every stop at the origin of a travelling OD pair is seeded, so reading
/// a stop that is not at the origin is a defect.
#[derive(Debug, Clone)]
pub struct AssignmentTable {
    fractions: SeededTable<(CityNodeIdx, CityNodeIdx, ExtNodeIdx), f64>,
    stops_by_od: HashMap<(CityNodeIdx, CityNodeIdx), Vec<ExtNodeIdx>>,
}

impl AssignmentTable {
    pub fn compute(
        graph: &ExtendedGraph,
        hyperpaths: &HyperpathTable,
        demand: &Demand,
        passenger: &Passenger,
        catchment_width: f64,
    ) -> Self {
        let mut table = Self {
            fractions: SeededTable::new(),
            stops_by_od: map_new(),
        };
        for (origin, destination, trips) in demand.pairs() {
            let stops = graph.stops_at(origin);
            if stops.is_empty() {
                warn!(
                    "No stop at origin {:?} for {} trips to {:?}.",
                    origin, trips, destination
                );
            }
            for &stop in stops {
                table.fractions.seed((origin, destination, stop), 0.0);
            }
            table.stops_by_od.insert((origin, destination), stops.to_vec());

            let candidates = hyperpaths
                .origin_stops(graph, origin, destination)
                .into_iter()
                .map(|(stop, label)| StopCandidate {
                    stop,
                    divisor: graph.divisor(stop),
                    label,
                })
                .collect::<Vec<_>>();
            if candidates.is_empty() {
                debug!("{:?} -> {:?} is unreachable.", origin, destination);
                continue;
            }
            let shares = split_shares(&candidates, passenger, catchment_width);
            for (candidate, share) in candidates.iter().zip(shares) {
                *table
                    .fractions
                    .get_mut(&(origin, destination, candidate.stop)) = share;
            }
        }
        table
    }

    pub fn fraction(
        &self,
        origin: CityNodeIdx,
        destination: CityNodeIdx,
        stop: ExtNodeIdx,
    ) -> f64 {
        *self.fractions.get(&(origin, destination, stop))
    }

    /// Stops at the origin of a travelling OD pair, empty for any other pair.
    pub fn stops(&self, origin: CityNodeIdx, destination: CityNodeIdx) -> &[ExtNodeIdx] {
        self.stops_by_od
            .get(&(origin, destination))
            .map(|it| &it[..])
            .unwrap_or(&[])
    }

    pub fn total(&self, origin: CityNodeIdx, destination: CityNodeIdx) -> f64 {
        self.stops(origin, destination)
            .iter()
            .map(|&stop| self.fraction(origin, destination, stop))
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(CityNodeIdx, CityNodeIdx, ExtNodeIdx), &f64)> {
        self.fractions.iter()
    }

    pub fn len(&self) -> usize {
        self.fractions.len()
    }
}
