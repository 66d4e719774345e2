use std::collections::BinaryHeap;
use std::fmt::Write;

use itertools::Itertools;
use log::debug;

use crate::{
    city::{City, CityNodeIdx},
    col::{map_new, HashMap, SeededTable},
    demand::Demand,
    extended_graph::{EdgeType, ExtNodeIdx, ExtendedGraph, NodeType},
    labels::HyperpathTable,
    network::{Direction, RouteIdx, TransportNetwork},
    primitives::FVal,
    split::AssignmentTable,
};

/// Route, direction and stop node.
pub type LoadKey = (RouteIdx, Direction, ExtNodeIdx);

/// Boarding (z) and alighting (v) per route, direction and stop.
///
/// Propagation accumulates passengers per hour; after [`Loads::normalize`]
/// the values are passengers per vehicle trip.
#[derive(Debug, Clone)]
pub struct Loads {
    boarding: SeededTable<LoadKey, FVal>,
    alighting: SeededTable<LoadKey, FVal>,
    keys: Vec<LoadKey>,
}

impl Loads {
    /// Seeds a zero entry for every stop of every served direction.
    pub fn new(graph: &ExtendedGraph, network: &TransportNetwork) -> Self {
        let keys = network
            .routes()
            .flat_map(|(route_idx, route)| {
                route.directions().flat_map(move |direction| {
                    graph
                        .route_nodes(route_idx, direction)
                        .iter()
                        .map(move |&node| (route_idx, direction, stop_of(graph, node)))
                })
            })
            .unique()
            .collect_vec();
        let mut boarding = SeededTable::new();
        let mut alighting = SeededTable::new();
        for &key in keys.iter() {
            boarding.seed(key, 0.0);
            alighting.seed(key, 0.0);
        }
        Self {
            boarding,
            alighting,
            keys,
        }
    }

    /// Sends the demand of every OD pair from its origin stops through the
    /// attractive successors until it reaches a stop at the destination.
    ///
    /// Pairs are handled per destination. Passengers arriving at a node are
    /// merged and the node is expanded once, in decreasing settle rank, so
    /// the work is linear in the size of the hyperpath instead of the number
    /// of elemental paths.
    pub fn propagate(
        graph: &ExtendedGraph,
        network: &TransportNetwork,
        hyperpaths: &HyperpathTable,
        assignment: &AssignmentTable,
        demand: &Demand,
    ) -> Self {
        let mut loads = Self::new(graph, network);
        let pairs = demand
            .pairs()
            .into_iter()
            .sorted_by_key(|&(origin, destination, _)| (destination, origin))
            .collect_vec();
        for (destination, pairs) in &pairs.iter().group_by(|pair| pair.1) {
            let mut inflow = Inflow::new();
            for &(origin, _, trips) in pairs {
                for &stop in assignment.stops(origin, destination) {
                    let pax = trips * assignment.fraction(origin, destination, stop) / 100.0;
                    if pax == 0.0 {
                        continue;
                    }
                    inflow.merge(hyperpaths, destination, stop, pax);
                }
            }

            while let Some((node, pax)) = inflow.pop() {
                if let NodeType::Stop { city, .. } = graph.node(node).node_type {
                    if city == destination {
                        continue;
                    }
                }
                let successors = hyperpaths.successors(destination, node);
                let total_frequency: f64 = successors
                    .iter()
                    .map(|&it| match graph.edge(it).edge_type {
                        EdgeType::Board { frequency, .. } => frequency,
                        _ => 0.0,
                    })
                    .sum();
                for &edge_idx in successors.iter() {
                    let edge = graph.edge(edge_idx);
                    let pax = match edge.edge_type {
                        EdgeType::Board { route, frequency } => {
                            let share = pax * frequency / total_frequency;
                            let direction = direction_of(graph, edge.to);
                            *loads.boarding.get_mut(&(route, direction, edge.from)) += share;
                            share
                        }
                        EdgeType::Alight => {
                            let (route, direction) = route_of(graph, edge.from);
                            *loads.alighting.get_mut(&(route, direction, edge.to)) += pax;
                            pax
                        }
                        _ => pax,
                    };
                    inflow.merge(hyperpaths, destination, edge.to, pax);
                }
            }
        }
        debug!(
            "Propagated {} trips of {} OD pairs.",
            demand.total(),
            demand.pairs().len()
        );
        loads
    }

    /// Converts passengers per hour into passengers per vehicle trip. Routes
    /// without service keep their values.
    pub fn normalize(&mut self, graph: &ExtendedGraph) {
        for table in [&mut self.boarding, &mut self.alighting] {
            for (&(route, _, _), value) in table.values_mut() {
                let frequency = graph.frequency(route);
                if frequency == 0.0 {
                    continue;
                }
                *value /= frequency;
            }
        }
    }

    pub fn boarding(&self, route: RouteIdx, direction: Direction, stop: ExtNodeIdx) -> FVal {
        *self.boarding.get(&(route, direction, stop))
    }

    pub fn alighting(&self, route: RouteIdx, direction: Direction, stop: ExtNodeIdx) -> FVal {
        *self.alighting.get(&(route, direction, stop))
    }

    /// Seeded keys in route, direction and stop order.
    pub fn keys(&self) -> &[LoadKey] {
        &self.keys
    }

    pub fn total_boarding(&self) -> FVal {
        self.boarding.iter().map(|(_, &value)| value).sum()
    }

    pub fn total_alighting(&self) -> FVal {
        self.alighting.iter().map(|(_, &value)| value).sum()
    }

    pub fn describe(
        &self,
        graph: &ExtendedGraph,
        city: &City,
        network: &TransportNetwork,
    ) -> String {
        let mut out = String::new();
        writeln!(out, "Boarding and alighting:").unwrap();
        for (route, keys) in &self.keys.iter().group_by(|key| key.0) {
            let keys = keys.collect_vec();
            writeln!(out, "Route {}", network.route(route).id).unwrap();
            for (name, table) in [("Boarding", &self.boarding), ("Alighting", &self.alighting)] {
                writeln!(out, "\t{}:", name).unwrap();
                for (direction, keys) in &keys.iter().group_by(|key| key.1) {
                    writeln!(out, "\t\tDirection {}", direction.code()).unwrap();
                    for key in keys {
                        let value = *table.get(*key);
                        writeln!(
                            out,
                            "\t\t\tStop {}: {:.2} [pax/veh]",
                            graph.describe_node(key.2, city, network),
                            value
                        )
                        .unwrap();
                    }
                }
            }
        }
        out
    }
}

/// Passengers waiting to be expanded at nodes of one destination tree,
/// popped in decreasing settle rank.
struct Inflow {
    pax: HashMap<ExtNodeIdx, FVal>,
    queue: BinaryHeap<(u32, ExtNodeIdx)>,
}

impl Inflow {
    fn new() -> Self {
        Self {
            pax: map_new(),
            queue: BinaryHeap::new(),
        }
    }

    fn merge(
        &mut self,
        hyperpaths: &HyperpathTable,
        destination: CityNodeIdx,
        node: ExtNodeIdx,
        pax: FVal,
    ) {
        if let Some(value) = self.pax.get_mut(&node) {
            *value += pax;
            return;
        }
        self.pax.insert(node, pax);
        self.queue.push((hyperpaths.rank(destination, node), node));
    }

    fn pop(&mut self) -> Option<(ExtNodeIdx, FVal)> {
        let (_, node) = self.queue.pop()?;
        let pax = self.pax.remove(&node)?;
        Some((node, pax))
    }
}

fn stop_of(graph: &ExtendedGraph, node: ExtNodeIdx) -> ExtNodeIdx {
    match graph.node(node).node_type {
        NodeType::Route { stop, .. } => stop,
        other => panic!("{:?} is not a route node but {:?}", node, other),
    }
}

fn route_of(graph: &ExtendedGraph, node: ExtNodeIdx) -> (RouteIdx, Direction) {
    match graph.node(node).node_type {
        NodeType::Route {
            route, direction, ..
        } => (route, direction),
        other => panic!("{:?} is not a route node but {:?}", node, other),
    }
}

fn direction_of(graph: &ExtendedGraph, node: ExtNodeIdx) -> Direction {
    route_of(graph, node).1
}
