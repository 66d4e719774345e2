use std::collections::BinaryHeap;

use crate::{
    city::CityNodeIdx,
    col::{map_new, HashMap},
    extended_graph::{EdgeType, ExtEdgeIdx, ExtNodeIdx, ExtendedGraph, NodeType},
    primitives::{Cost, Frequency},
};

#[derive(Debug, Clone, PartialEq)]
struct QueueItem {
    node_id: ExtNodeIdx,
    cost: Cost,
    is_stop: bool,
}
impl Eq for QueueItem {}
impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            // Stops go last among equal costs so that tied lines are admitted first.
            .then_with(|| other.is_stop.cmp(&self.is_stop))
            .then_with(|| self.node_id.0.cmp(&other.node_id.0))
    }
}

/// Attractive boarding edges at a stop, admitted in ascending order of
/// their downstream label.
#[derive(Debug, Clone, Default)]
struct CommonLines {
    total_frequency: Frequency,
    /// Sum of frequency times downstream label.
    weighted: Cost,
    edges: Vec<ExtEdgeIdx>,
}

impl CommonLines {
    fn cost(&self, wait_factor: f64) -> Cost {
        if self.edges.is_empty() {
            return Cost::INFINITY;
        }
        (wait_factor + self.weighted) / self.total_frequency
    }

    /// Adds the line unless it would increase the expected cost. Equal cost
    /// admits the line.
    fn admit(
        &mut self,
        edge_idx: ExtEdgeIdx,
        frequency: Frequency,
        label: Cost,
        wait_factor: f64,
    ) -> bool {
        if label > self.cost(wait_factor) {
            return false;
        }
        self.total_frequency += frequency;
        self.weighted += frequency * label;
        self.edges.push(edge_idx);
        true
    }
}

/// Labels and attractive successors of every node that can reach one destination.
#[derive(Debug, Clone)]
pub struct DestinationTree {
    pub destination: CityNodeIdx,
    pub labels: HashMap<ExtNodeIdx, Cost>,
    pub successors: HashMap<ExtNodeIdx, Box<[ExtEdgeIdx]>>,
    /// Position in the settle order, starting at 0 for the destination.
    pub ranks: HashMap<ExtNodeIdx, u32>,
}

impl DestinationTree {
    pub fn label(&self, node_id: ExtNodeIdx) -> Option<Cost> {
        self.labels.get(&node_id).copied()
    }

    pub fn successors(&self, node_id: ExtNodeIdx) -> Option<&[ExtEdgeIdx]> {
        self.successors.get(&node_id).map(|it| &it[..])
    }

    pub fn rank(&self, node_id: ExtNodeIdx) -> Option<u32> {
        self.ranks.get(&node_id).copied()
    }

    pub fn num_reached(&self) -> usize {
        self.labels.len()
    }
}

/// Computes optimal strategies towards `destination` for all nodes at once.
///
/// Nodes are settled by increasing label, starting from the destination city
/// node. Stops combine their boarding edges with the common-lines rule,
/// waiting `wait_factor / Σf`, and only walk on if that is strictly cheaper.
/// Every other node keeps its first strictly best edge. Successors always
/// point to nodes settled earlier, so the successor structure is acyclic and
/// the settle ranks order it topologically.
pub fn label_destination(
    graph: &ExtendedGraph,
    destination: CityNodeIdx,
    wait_factor: f64,
) -> DestinationTree {
    let target = graph.city_node(destination);
    let num_nodes = graph.num_nodes();

    let mut settled = vec![false; num_nodes];
    let mut tentative = vec![Cost::INFINITY; num_nodes];
    let mut best: Vec<Option<(Cost, ExtEdgeIdx)>> = vec![None; num_nodes];
    let mut lines: Vec<CommonLines> = vec![CommonLines::default(); num_nodes];

    let mut tree = DestinationTree {
        destination,
        labels: map_new(),
        successors: map_new(),
        ranks: map_new(),
    };

    let mut queue: BinaryHeap<QueueItem> = BinaryHeap::new();
    tentative[target.0 as usize] = 0.0;
    queue.push(QueueItem {
        node_id: target,
        cost: 0.0,
        is_stop: false,
    });

    while let Some(QueueItem { node_id, cost, .. }) = queue.pop() {
        let idx = node_id.0 as usize;
        if settled[idx] || cost > tentative[idx] {
            continue;
        }
        settled[idx] = true;

        let successors: Box<[ExtEdgeIdx]> = match best[idx] {
            Some((walk_cost, edge_idx)) if walk_cost < lines[idx].cost(wait_factor) => {
                Box::new([edge_idx])
            }
            _ => lines[idx].edges.clone().into_boxed_slice(),
        };
        tree.ranks.insert(node_id, tree.labels.len() as u32);
        tree.labels.insert(node_id, cost);
        tree.successors.insert(node_id, successors);

        for &edge_idx in graph.node(node_id).incoming.iter() {
            let edge = graph.edge(edge_idx);
            let pred = edge.from.0 as usize;
            if settled[pred] {
                continue;
            }
            let candidate = cost + edge.cost;
            let improved = match edge.edge_type {
                EdgeType::Board { frequency, .. } => {
                    if frequency <= 0.0 || graph.city_of(edge.from) == destination {
                        continue;
                    }
                    lines[pred].admit(edge_idx, frequency, candidate, wait_factor)
                }
                _ => match best[pred] {
                    Some((current, _)) if current <= candidate => false,
                    _ => {
                        best[pred] = Some((candidate, edge_idx));
                        true
                    }
                },
            };
            if !improved {
                continue;
            }
            let pred_cost = lines[pred]
                .cost(wait_factor)
                .min(best[pred].map_or(Cost::INFINITY, |it| it.0));
            if pred_cost < tentative[pred] {
                tentative[pred] = pred_cost;
                queue.push(QueueItem {
                    node_id: edge.from,
                    cost: pred_cost,
                    is_stop: matches!(graph.node(edge.from).node_type, NodeType::Stop { .. }),
                });
            }
        }
    }

    tree
}
