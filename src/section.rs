use crate::{
    col::{map_new, HashMap},
    extended_graph::{ExtendedGraph, NodeType},
    flow::Loads,
    network::{RouteIdx, TransportNetwork},
    primitives::FVal,
};

/// Largest running load of a line, starting empty at its first stop.
pub fn linear_section(deltas: impl IntoIterator<Item = FVal>) -> FVal {
    let mut running = 0.0;
    let mut max_load: FVal = 0.0;
    for delta in deltas {
        running += delta;
        max_load = max_load.max(running);
    }
    max_load
}

/// Largest load of a loop whose starting point is arbitrary: the running
/// load is shifted by its minimum.
pub fn circular_section(deltas: impl IntoIterator<Item = FVal>) -> FVal {
    let mut cumulative = vec![0.0];
    let mut running = 0.0;
    for delta in deltas {
        running += delta;
        cumulative.push(running);
    }
    let q_min = cumulative.iter().copied().fold(FVal::INFINITY, FVal::min);
    cumulative
        .iter()
        .map(|&load| load - q_min)
        .fold(0.0, FVal::max)
}

/// Most loaded section of every route in passengers per vehicle trip.
pub fn most_loaded_sections(
    graph: &ExtendedGraph,
    network: &TransportNetwork,
    loads: &Loads,
) -> HashMap<RouteIdx, FVal> {
    let mut sections = map_new();
    for (route_idx, route) in network.routes() {
        let section = route
            .directions()
            .map(|direction| {
                let nodes = graph.route_nodes(route_idx, direction);
                let deltas = nodes.iter().enumerate().map(|(position, &node)| {
                    let NodeType::Route { stop, .. } = graph.node(node).node_type else {
                        panic!("{:?} is not a route node", node);
                    };
                    let mut delta = 0.0;
                    if position + 1 < nodes.len() {
                        delta += loads.boarding(route_idx, direction, stop);
                    }
                    if position > 0 {
                        delta -= loads.alighting(route_idx, direction, stop);
                    }
                    delta
                });
                if route.is_circular() {
                    circular_section(deltas)
                } else {
                    linear_section(deltas)
                }
            })
            .fold(0.0, FVal::max);
        sections.insert(route_idx, section);
    }
    sections
}
