use std::fmt::Debug;

use itertools::Itertools;

use crate::{
    city::{City, CityNodeIdx},
    col::{map_new, HashMap},
    network::{Direction, RouteIdx, TransportNetwork},
    passenger::Passenger,
    primitives::{Cost, Frequency},
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtNodeIdx(pub u32);
impl Debug for ExtNodeIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("n#{}", self.0))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtEdgeIdx(pub u32);
impl Debug for ExtEdgeIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("e#{}", self.0))
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum NodeType {
    /// Where trips start and end.
    City(CityNodeIdx),
    /// Boarding/alighting point at a city node, shared by all routes whose
    /// mode splits the catchment into `divisor` parts.
    Stop { city: CityNodeIdx, divisor: u32 },
    /// A route passing its `position`-th stop in `direction`.
    Route {
        route: RouteIdx,
        direction: Direction,
        position: u32,
        city: CityNodeIdx,
        stop: ExtNodeIdx,
    },
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum EdgeType {
    /// City node to stop.
    Access,
    /// Stop to city node.
    Egress,
    /// Waiting is not part of the edge cost; it depends on the set of
    /// attractive boarding edges at the stop.
    Board { route: RouteIdx, frequency: Frequency },
    InVehicle,
    Alight,
}

#[derive(Debug)]
pub struct EdgePayload {
    pub from: ExtNodeIdx,
    pub to: ExtNodeIdx,
    pub edge_type: EdgeType,
    pub cost: Cost,
}

#[derive(Debug)]
pub struct NodePayload {
    pub incoming: Vec<ExtEdgeIdx>,
    pub outgoing: Vec<ExtEdgeIdx>,
    pub node_type: NodeType,
}

/// Line graph of a city and the routes running on it.
#[derive(Debug)]
pub struct ExtendedGraph {
    nodes: Vec<NodePayload>,
    edges: Vec<EdgePayload>,
    city_nodes: Vec<ExtNodeIdx>,
    stops_by_city: Vec<Vec<ExtNodeIdx>>,
    route_nodes: HashMap<(RouteIdx, Direction), Box<[ExtNodeIdx]>>,
    frequencies: Vec<Frequency>,
}

impl ExtendedGraph {
    /// Builds the graph for one frequency assignment.
    ///
    /// Panics if a route has no frequency, a negative frequency, or passes
    /// two consecutive nodes that are not joined by a city edge.
    pub fn create(
        city: &City,
        network: &TransportNetwork,
        frequencies: &HashMap<RouteIdx, Frequency>,
        passenger: &Passenger,
        catchment_width: f64,
    ) -> Self {
        let route_frequencies = network
            .routes()
            .map(|(route_idx, route)| {
                let frequency = *frequencies
                    .get(&route_idx)
                    .unwrap_or_else(|| panic!("No frequency for route {}", route.id));
                assert!(
                    frequency >= 0.0 && frequency.is_finite(),
                    "Invalid frequency {:} for route {}",
                    frequency,
                    route.id
                );
                frequency
            })
            .collect_vec();

        let mut graph = ExtendedGraph {
            nodes: vec![],
            edges: vec![],
            city_nodes: vec![],
            stops_by_city: vec![vec![]; city.num_nodes()],
            route_nodes: map_new(),
            frequencies: route_frequencies,
        };

        for (city_idx, _) in city.nodes() {
            let node = graph.add_node(NodeType::City(city_idx));
            graph.city_nodes.push(node);
        }

        let mut stop_by_city_divisor: HashMap<(CityNodeIdx, u32), ExtNodeIdx> = map_new();
        for (_, route) in network.routes() {
            let divisor = network.mode(route.mode).divisor;
            let walking_cost = passenger.walking_cost(catchment_width / (4.0 * divisor as f64));
            for direction in route.directions() {
                for &city_idx in route.stops(direction) {
                    if stop_by_city_divisor.contains_key(&(city_idx, divisor)) {
                        continue;
                    }
                    let stop = graph.add_node(NodeType::Stop {
                        city: city_idx,
                        divisor,
                    });
                    stop_by_city_divisor.insert((city_idx, divisor), stop);
                    graph.stops_by_city[city_idx.0 as usize].push(stop);
                    let city_node = graph.city_node(city_idx);
                    graph.add_edge(city_node, stop, EdgeType::Access, walking_cost);
                    graph.add_edge(stop, city_node, EdgeType::Egress, walking_cost);
                }
            }
        }

        let transfer_penalty = passenger.transfer_penalty();
        for (route_idx, route) in network.routes() {
            let mode = network.mode(route.mode);
            let frequency = graph.frequency(route_idx);
            for direction in route.directions() {
                let stops = route.stops(direction);
                let travel_times = stop_distances(city, route.nodes(direction), stops, &route.id)
                    .into_iter()
                    .map(|distance| distance / mode.speed)
                    .collect_vec();

                let mut route_nodes = Vec::with_capacity(stops.len());
                for (position, &city_idx) in stops.iter().enumerate() {
                    let stop = stop_by_city_divisor[&(city_idx, mode.divisor)];
                    let node = graph.add_node(NodeType::Route {
                        route: route_idx,
                        direction,
                        position: position as u32,
                        city: city_idx,
                        stop,
                    });
                    if position + 1 < stops.len() {
                        graph.add_edge(
                            stop,
                            node,
                            EdgeType::Board {
                                route: route_idx,
                                frequency,
                            },
                            0.0,
                        );
                    }
                    if position > 0 {
                        graph.add_edge(node, stop, EdgeType::Alight, transfer_penalty);
                        let previous = route_nodes[position - 1];
                        graph.add_edge(
                            previous,
                            node,
                            EdgeType::InVehicle,
                            travel_times[position - 1],
                        );
                    }
                    route_nodes.push(node);
                }
                graph
                    .route_nodes
                    .insert((route_idx, direction), route_nodes.into_boxed_slice());
            }
        }
        graph
    }

    fn add_node(&mut self, node_type: NodeType) -> ExtNodeIdx {
        let id = ExtNodeIdx(self.nodes.len() as u32);
        self.nodes.push(NodePayload {
            incoming: vec![],
            outgoing: vec![],
            node_type,
        });
        id
    }

    fn add_edge(
        &mut self,
        from: ExtNodeIdx,
        to: ExtNodeIdx,
        edge_type: EdgeType,
        cost: Cost,
    ) -> ExtEdgeIdx {
        let edge_idx = ExtEdgeIdx(self.edges.len() as u32);
        self.edges.push(EdgePayload {
            from,
            to,
            edge_type,
            cost,
        });
        self.nodes[from.0 as usize].outgoing.push(edge_idx);
        self.nodes[to.0 as usize].incoming.push(edge_idx);
        edge_idx
    }

    pub fn node(&self, node_id: ExtNodeIdx) -> &NodePayload {
        &self.nodes[node_id.0 as usize]
    }

    pub fn edge(&self, edge_idx: ExtEdgeIdx) -> &EdgePayload {
        &self.edges[edge_idx.0 as usize]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (ExtNodeIdx, &NodePayload)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (ExtNodeIdx(i as u32), n))
    }

    pub fn edges(&self) -> impl Iterator<Item = (ExtEdgeIdx, &EdgePayload)> {
        self.edges
            .iter()
            .enumerate()
            .map(|(i, e)| (ExtEdgeIdx(i as u32), e))
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn city_node(&self, city_idx: CityNodeIdx) -> ExtNodeIdx {
        self.city_nodes[city_idx.0 as usize]
    }

    /// Stop nodes at a city node in creation order.
    pub fn stops_at(&self, city_idx: CityNodeIdx) -> &[ExtNodeIdx] {
        &self.stops_by_city[city_idx.0 as usize]
    }

    /// Route nodes of a direction in stop order, empty if the direction is not served.
    pub fn route_nodes(&self, route: RouteIdx, direction: Direction) -> &[ExtNodeIdx] {
        self.route_nodes
            .get(&(route, direction))
            .map(|it| &it[..])
            .unwrap_or(&[])
    }

    pub fn frequency(&self, route: RouteIdx) -> Frequency {
        self.frequencies[route.0 as usize]
    }

    /// The city node a city, stop or route node is located at.
    pub fn city_of(&self, node_id: ExtNodeIdx) -> CityNodeIdx {
        match self.node(node_id).node_type {
            NodeType::City(city) => city,
            NodeType::Stop { city, .. } => city,
            NodeType::Route { city, .. } => city,
        }
    }

    pub fn divisor(&self, stop: ExtNodeIdx) -> u32 {
        match self.node(stop).node_type {
            NodeType::Stop { divisor, .. } => divisor,
            other => panic!("{:?} is not a stop but {:?}", stop, other),
        }
    }

    pub fn describe_node(
        &self,
        node_id: ExtNodeIdx,
        city: &City,
        network: &TransportNetwork,
    ) -> String {
        match self.node(node_id).node_type {
            NodeType::City(city_idx) => city.node(city_idx).name.to_string(),
            NodeType::Stop {
                city: city_idx,
                divisor,
            } => format!("{}[d={}]", city.node(city_idx).name, divisor),
            NodeType::Route {
                route,
                direction,
                city: city_idx,
                ..
            } => format!(
                "{}/{}@{}",
                network.route(route).id,
                direction.code(),
                city.node(city_idx).name
            ),
        }
    }
}

/// Distances between consecutive stops, following the traversed nodes.
fn stop_distances(
    city: &City,
    nodes: &[CityNodeIdx],
    stops: &[CityNodeIdx],
    route_id: &str,
) -> Vec<f64> {
    let mut distances = Vec::with_capacity(stops.len().saturating_sub(1));
    let mut previous: Option<usize> = None;
    for &stop in stops {
        let start = previous.map_or(0, |it| it + 1);
        let index = start
            + nodes[start..]
                .iter()
                .position(|&node| node == stop)
                .unwrap_or_else(|| {
                    panic!("Stop {:?} of route {} is not on its path", stop, route_id)
                });
        if let Some(previous) = previous {
            let distance: f64 = nodes[previous..=index]
                .iter()
                .tuple_windows()
                .map(|(&from, &to)| {
                    city.edge_distance(from, to).unwrap_or_else(|| {
                        panic!(
                            "Route {} has no city edge from {:?} to {:?}",
                            route_id, from, to
                        )
                    })
                })
                .sum();
            distances.push(distance);
        }
        previous = Some(index);
    }
    distances
}

#[cfg(test)]
mod tests {
    use crate::{
        col::map_new,
        network::{Direction, Route, RouteType, TransportNetwork},
        passenger::Passenger,
        test::sample::{create_corridor_city, create_corridor_instance, create_network},
    };

    use super::{EdgeType, ExtendedGraph, NodeType};

    #[test]
    fn corridor_graph_shape() {
        let instance = create_corridor_instance();
        let graph = instance.graph();
        let (route, _) = instance.network.routes().next().unwrap();

        // 3 city, 3 stop and 6 route nodes.
        assert_eq!(graph.num_nodes(), 12);
        // 6 access/egress, 4 board, 4 alight, 4 in-vehicle.
        assert_eq!(graph.num_edges(), 18);

        let [p, s, c] = instance.nodes;
        for city_idx in [p, s, c] {
            assert_eq!(graph.stops_at(city_idx).len(), 1);
        }
        let outbound = graph.route_nodes(route, Direction::Outbound);
        assert_eq!(outbound.len(), 3);
        assert_eq!(graph.city_of(outbound[2]), c);

        let count = |pred: fn(&EdgeType) -> bool| graph.edges().filter(|(_, e)| pred(&e.edge_type)).count();
        assert_eq!(count(|t| matches!(t, EdgeType::Board { .. })), 4);
        assert_eq!(count(|t| matches!(t, EdgeType::Alight)), 4);
        assert_eq!(count(|t| matches!(t, EdgeType::InVehicle)), 4);

        // No boarding at the terminus and no alighting at the first stop.
        assert!(graph
            .node(outbound[2])
            .incoming
            .iter()
            .all(|&e| !matches!(graph.edge(e).edge_type, EdgeType::Board { .. })));
        assert!(graph
            .node(outbound[0])
            .outgoing
            .iter()
            .all(|&e| graph.edge(e).edge_type != EdgeType::Alight));
    }

    #[test]
    fn costs_follow_distances_and_passenger() {
        let instance = create_corridor_instance();
        let graph = instance.graph();
        let (route, _) = instance.network.routes().next().unwrap();
        let outbound = graph.route_nodes(route, Direction::Outbound);
        let in_vehicle = graph
            .node(outbound[0])
            .outgoing
            .iter()
            .map(|&e| graph.edge(e))
            .find(|e| e.edge_type == EdgeType::InVehicle)
            .unwrap();
        // 2 km at 20 km/h.
        assert!((in_vehicle.cost - 0.1).abs() < 1e-12);

        let stop = graph.stops_at(instance.nodes[0])[0];
        let egress = graph
            .node(stop)
            .outgoing
            .iter()
            .map(|&e| graph.edge(e))
            .find(|e| e.edge_type == EdgeType::Egress)
            .unwrap();
        // 0.5 km / 4 (d = 1) at 4 km/h.
        assert!((egress.cost - 0.5 / 4.0 / 4.0).abs() < 1e-12);
        assert_eq!(graph.frequency(route), 40.0);
    }

    #[test]
    fn stops_are_shared_per_divisor() {
        let (city, [p, s, c]) = create_corridor_city();
        let mut network = create_network();
        let bus = network.mode_by_name("bus").unwrap();
        let metro = network.mode_by_name("metro").unwrap();
        let mut frequencies = map_new();
        for (id, mode, nodes) in [
            ("B1", bus, vec![p, s, c]),
            ("B2", bus, vec![s, c]),
            ("M1", metro, vec![p, s, c]),
        ] {
            let mut reverse = nodes.clone();
            reverse.reverse();
            let route = Route::new(
                id,
                mode,
                RouteType::Custom,
                nodes.clone(),
                reverse.clone(),
                nodes,
                reverse,
            )
            .unwrap();
            let idx = network.add_route(&city, route).unwrap();
            frequencies.insert(idx, 10.0);
        }
        let graph = ExtendedGraph::create(&city, &network, &frequencies, &Passenger::default(), 0.5);
        assert_eq!(graph.stops_at(p).len(), 2);
        assert_eq!(graph.stops_at(s).len(), 2);
        let divisors = graph
            .stops_at(s)
            .iter()
            .map(|&stop| graph.divisor(stop))
            .collect::<Vec<_>>();
        assert_eq!(divisors, vec![1, 2]);
        let boarding_at_s = graph
            .node(graph.stops_at(s)[0])
            .outgoing
            .iter()
            .filter(|&&e| matches!(graph.edge(e).edge_type, EdgeType::Board { .. }))
            .count();
        // B1 in both directions and B2 outbound.
        assert_eq!(boarding_at_s, 3);
        assert!(matches!(
            graph.node(graph.city_node(c)).node_type,
            NodeType::City(idx) if idx == c
        ));
    }

    #[test]
    fn skipped_nodes_add_up_travel_time() {
        let (city, [p, s, c]) = create_corridor_city();
        let mut network = create_network();
        let bus = network.mode_by_name("bus").unwrap();
        let route = Route::new(
            "X1",
            bus,
            RouteType::Custom,
            vec![p, s, c],
            vec![c, s, p],
            vec![p, c],
            vec![c, p],
        )
        .unwrap();
        let idx = network.add_route(&city, route).unwrap();
        let mut frequencies = map_new();
        frequencies.insert(idx, 12.0);
        let graph = ExtendedGraph::create(&city, &network, &frequencies, &Passenger::default(), 0.5);
        let nodes = graph.route_nodes(idx, Direction::Inbound);
        let edge = graph
            .node(nodes[0])
            .outgoing
            .iter()
            .map(|&e| graph.edge(e))
            .find(|e| e.edge_type == EdgeType::InVehicle)
            .unwrap();
        // (3 + 2) km at 20 km/h.
        assert!((edge.cost - 0.25).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "No frequency")]
    fn missing_frequency_panics() {
        let instance = create_corridor_instance();
        ExtendedGraph::create(
            &instance.city,
            &instance.network,
            &map_new(),
            &instance.config.passenger,
            instance.config.catchment_width,
        );
    }

    #[test]
    #[should_panic(expected = "no city edge")]
    fn route_without_city_edge_panics() {
        let (city, [p, s, c]) = create_corridor_city();
        let (mut other_city, _) = create_corridor_city();
        other_city.add_street(p, c, 4.0).unwrap();
        let mut network: TransportNetwork = create_network();
        let bus = network.mode_by_name("bus").unwrap();
        let route = Route::new(
            "Y1",
            bus,
            RouteType::Custom,
            vec![p, c],
            vec![c, s, p],
            vec![p, c],
            vec![c, p],
        )
        .unwrap();
        // Validated against a city that has the shortcut.
        let idx = network.add_route(&other_city, route).unwrap();
        let mut frequencies = map_new();
        frequencies.insert(idx, 1.0);
        ExtendedGraph::create(&city, &network, &frequencies, &Passenger::default(), 0.5);
    }
}
