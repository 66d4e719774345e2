use log::debug;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    city::CityNodeIdx,
    col::{map_new, HashMap},
    extended_graph::{ExtEdgeIdx, ExtNodeIdx, ExtendedGraph, NodeType},
    primitives::Cost,
    shortest_path::hyperpath::{label_destination, DestinationTree},
};

/// Labels and attractive successors keyed by (destination, node).
///
/// Nodes that cannot reach a destination have no entry.
#[derive(Debug, Clone)]
pub struct HyperpathTable {
    destinations: Vec<CityNodeIdx>,
    labels: HashMap<(CityNodeIdx, ExtNodeIdx), Cost>,
    successors: HashMap<(CityNodeIdx, ExtNodeIdx), Box<[ExtEdgeIdx]>>,
    ranks: HashMap<(CityNodeIdx, ExtNodeIdx), u32>,
}

impl HyperpathTable {
    /// Labels every destination independently. With `parallel`, destinations
    /// are spread over the rayon pool; the result does not depend on it.
    pub fn compute(
        graph: &ExtendedGraph,
        destinations: &[CityNodeIdx],
        wait_factor: f64,
        parallel: bool,
    ) -> Self {
        let trees: Vec<DestinationTree> = if parallel {
            destinations
                .par_iter()
                .map(|&destination| label_destination(graph, destination, wait_factor))
                .collect()
        } else {
            destinations
                .iter()
                .map(|&destination| label_destination(graph, destination, wait_factor))
                .collect()
        };

        let mut table = Self {
            destinations: destinations.to_vec(),
            labels: map_new(),
            successors: map_new(),
            ranks: map_new(),
        };
        for tree in trees {
            debug!(
                "Destination {:?} is reached from {} of {} nodes.",
                tree.destination,
                tree.num_reached(),
                graph.num_nodes()
            );
            let destination = tree.destination;
            table.labels.extend(
                tree.labels
                    .into_iter()
                    .map(|(node, label)| ((destination, node), label)),
            );
            table.successors.extend(
                tree.successors
                    .into_iter()
                    .map(|(node, edges)| ((destination, node), edges)),
            );
            table.ranks.extend(
                tree.ranks
                    .into_iter()
                    .map(|(node, rank)| ((destination, node), rank)),
            );
        }
        table
    }

    pub fn destinations(&self) -> &[CityNodeIdx] {
        &self.destinations
    }

    pub fn label(&self, destination: CityNodeIdx, node: ExtNodeIdx) -> Option<Cost> {
        self.labels.get(&(destination, node)).copied()
    }

    /// Label of a node that is known to reach `destination`.
    pub fn expect_label(&self, destination: CityNodeIdx, node: ExtNodeIdx) -> Cost {
        self.label(destination, node).unwrap_or_else(|| {
            panic!("No label for {:?} towards {:?}", node, destination)
        })
    }

    /// Attractive successors of a node that is known to reach `destination`.
    pub fn successors(&self, destination: CityNodeIdx, node: ExtNodeIdx) -> &[ExtEdgeIdx] {
        self.successors
            .get(&(destination, node))
            .unwrap_or_else(|| panic!("No successors for {:?} towards {:?}", node, destination))
    }

    /// Settle rank of a node that is known to reach `destination`. Every
    /// attractive successor leads to a node of lower rank.
    pub fn rank(&self, destination: CityNodeIdx, node: ExtNodeIdx) -> u32 {
        self.ranks
            .get(&(destination, node))
            .copied()
            .unwrap_or_else(|| panic!("No rank for {:?} towards {:?}", node, destination))
    }

    /// Stops at `origin` that reach `destination`, with their labels.
    pub fn origin_stops(
        &self,
        graph: &ExtendedGraph,
        origin: CityNodeIdx,
        destination: CityNodeIdx,
    ) -> Vec<(ExtNodeIdx, Cost)> {
        graph
            .stops_at(origin)
            .iter()
            .filter_map(|&stop| self.label(destination, stop).map(|label| (stop, label)))
            .collect()
    }

    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    /// Enumerates the elemental paths from `stop` to the destination stop,
    /// branching at every stop over its attractive lines.
    pub fn elemental_paths(
        &self,
        graph: &ExtendedGraph,
        destination: CityNodeIdx,
        stop: ExtNodeIdx,
    ) -> Vec<Box<[ExtNodeIdx]>> {
        let mut paths = Vec::new();
        if self.label(destination, stop).is_none() {
            return paths;
        }
        let mut path = vec![stop];
        self.extend_paths(graph, destination, &mut path, &mut paths);
        paths
    }

    fn extend_paths(
        &self,
        graph: &ExtendedGraph,
        destination: CityNodeIdx,
        path: &mut Vec<ExtNodeIdx>,
        paths: &mut Vec<Box<[ExtNodeIdx]>>,
    ) {
        let Some(&node) = path.last() else {
            return;
        };
        if let NodeType::Stop { city, .. } = graph.node(node).node_type {
            if city == destination {
                paths.push(path.clone().into_boxed_slice());
                return;
            }
        }
        for &edge_idx in self.successors(destination, node) {
            path.push(graph.edge(edge_idx).to);
            self.extend_paths(graph, destination, path, paths);
            path.pop();
        }
    }
}
