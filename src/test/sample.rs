use crate::{
    city::{City, CityNode, CityNodeIdx, CityNodeKind},
    col::{map_new, HashMap},
    demand::Demand,
    extended_graph::ExtendedGraph,
    network::{ModeIdx, Route, RouteIdx, RouteType, TransportMode, TransportNetwork},
    passenger::Passenger,
    pipeline::{Evaluation, EvaluationConfig},
    primitives::Frequency,
};

/// A complete instance together with the city nodes a test refers to.
pub struct Sample<const N: usize> {
    pub city: City,
    pub network: TransportNetwork,
    pub frequencies: HashMap<RouteIdx, Frequency>,
    pub demand: Demand,
    pub config: EvaluationConfig,
    pub nodes: [CityNodeIdx; N],
}

impl<const N: usize> Sample<N> {
    pub fn graph(&self) -> ExtendedGraph {
        ExtendedGraph::create(
            &self.city,
            &self.network,
            &self.frequencies,
            &self.config.passenger,
            self.config.catchment_width,
        )
    }

    pub fn evaluate(&self) -> Evaluation {
        Evaluation::compute(
            &self.city,
            &self.network,
            &self.frequencies,
            &self.demand,
            &self.config,
        )
    }
}

pub fn city_node(name: &str, kind: CityNodeKind, zone: u32, x: f64, y: f64) -> CityNode {
    CityNode {
        name: name.into(),
        kind,
        zone,
        x,
        y,
    }
}

/// Periphery, subcenter and CBD on a line, 2 km and 3 km apart.
pub fn create_corridor_city() -> (City, [CityNodeIdx; 3]) {
    let mut city = City::new();
    let p = city.add_node(city_node("P1", CityNodeKind::Periphery, 1, 0.0, 0.0));
    let s = city.add_node(city_node("SC1", CityNodeKind::Subcenter, 1, 2.0, 0.0));
    let c = city.add_node(city_node("CBD", CityNodeKind::Cbd, 0, 5.0, 0.0));
    city.add_street(p, s, 2.0).unwrap();
    city.add_street(s, c, 3.0).unwrap();
    (city, [p, s, c])
}

/// A bus mode (20 km/h, divisor 1) and a metro mode (40 km/h, divisor 2).
pub fn create_network() -> TransportNetwork {
    let mut network = TransportNetwork::new();
    network.add_mode(TransportMode {
        name: "bus".into(),
        speed: 20.0,
        divisor: 1,
    });
    network.add_mode(TransportMode {
        name: "metro".into(),
        speed: 40.0,
        divisor: 2,
    });
    network
}

/// Adds a custom route that serves every node of `nodes` in both directions.
pub fn add_two_way_route(
    city: &City,
    network: &mut TransportNetwork,
    id: &str,
    mode: ModeIdx,
    nodes: &[CityNodeIdx],
) -> RouteIdx {
    let outbound = nodes.to_vec();
    let inbound = nodes.iter().rev().copied().collect::<Vec<_>>();
    let route = Route::new(
        id,
        mode,
        RouteType::Custom,
        outbound.clone(),
        inbound.clone(),
        outbound,
        inbound,
    )
    .unwrap();
    network.add_route(city, route).unwrap()
}

pub fn default_config(catchment_width: f64) -> EvaluationConfig {
    EvaluationConfig {
        passenger: Passenger::default(),
        catchment_width,
        parallel: false,
    }
}

/// One diametral bus line P1-SC1-CBD at 40 veh/h and 1000 trips from P1 to the CBD.
pub fn create_corridor_instance() -> Sample<3> {
    let (city, nodes) = create_corridor_city();
    let [p, _, c] = nodes;
    let mut network = create_network();
    let bus = network.mode_by_name("bus").unwrap();
    let route = add_two_way_route(&city, &mut network, "D1", bus, &nodes);
    let mut frequencies = map_new();
    frequencies.insert(route, 40.0);
    let mut demand = Demand::new();
    demand.insert(p, c, 1000.0);
    Sample {
        city,
        network,
        frequencies,
        demand,
        config: default_config(0.5),
        nodes,
    }
}

/// Two lines from A to B, 3 km apart: a fast one at 6 km/h and 4 veh/h and
/// a second one with the given speed and frequency. Stops are reached in
/// 0.25 h, waiting is valued like riding. C is a city node without service.
/// There is no demand.
pub fn create_common_lines_instance(speed: f64, frequency: Frequency) -> Sample<3> {
    let mut city = City::new();
    let a = city.add_node(city_node("A", CityNodeKind::Periphery, 1, 0.0, 0.0));
    let b = city.add_node(city_node("B", CityNodeKind::Cbd, 0, 3.0, 0.0));
    let c = city.add_node(city_node("C", CityNodeKind::Subcenter, 2, 4.0, 0.0));
    city.add_street(a, b, 3.0).unwrap();
    city.add_street(b, c, 1.0).unwrap();

    let mut network = TransportNetwork::new();
    let fast = network.add_mode(TransportMode {
        name: "fast".into(),
        speed: 6.0,
        divisor: 1,
    });
    let slow = network.add_mode(TransportMode {
        name: "slow".into(),
        speed,
        divisor: 1,
    });
    let l1 = add_two_way_route(&city, &mut network, "L1", fast, &[a, b]);
    let l2 = add_two_way_route(&city, &mut network, "L2", slow, &[a, b]);
    let mut frequencies = map_new();
    frequencies.insert(l1, 4.0);
    frequencies.insert(l2, frequency);

    Sample {
        city,
        network,
        frequencies,
        demand: Demand::new(),
        config: EvaluationConfig {
            passenger: Passenger {
                walking_speed: 4.0,
                access_value: 2.0,
                ..Passenger::default()
            },
            catchment_width: 2.0,
            parallel: false,
        },
        nodes: [a, b, c],
    }
}

/// A circular bus line S1-S2-S3-S1 on 1 km streets at 10 veh/h.
pub fn create_ring_instance() -> Sample<3> {
    let mut city = City::new();
    let s1 = city.add_node(city_node("S1", CityNodeKind::Subcenter, 1, 0.0, 0.0));
    let s2 = city.add_node(city_node("S2", CityNodeKind::Subcenter, 2, 1.0, 0.0));
    let s3 = city.add_node(city_node("S3", CityNodeKind::Subcenter, 3, 0.5, 0.8));
    city.add_edge(s1, s2, 1.0).unwrap();
    city.add_edge(s2, s3, 1.0).unwrap();
    city.add_edge(s3, s1, 1.0).unwrap();

    let mut network = create_network();
    let bus = network.mode_by_name("bus").unwrap();
    let route = Route::new(
        "C1",
        bus,
        RouteType::Predefined,
        vec![s1, s2, s3, s1],
        vec![],
        vec![s1, s2, s3, s1],
        vec![],
    )
    .unwrap();
    let route = network.add_route(&city, route).unwrap();
    let mut frequencies = map_new();
    frequencies.insert(route, 10.0);

    let mut demand = Demand::new();
    demand.insert(s1, s2, 100.0);
    demand.insert(s2, s3, 50.0);
    demand.insert(s3, s1, 80.0);
    demand.insert(s1, s3, 20.0);

    Sample {
        city,
        network,
        frequencies,
        demand,
        config: default_config(0.5),
        nodes: [s1, s2, s3],
    }
}

/// `segments` consecutive 1 km streets N0-N1-...; every street is served by
/// two identical bus lines at 4 veh/h, so every intermediate node is a
/// transfer with two attractive lines. 80 trips go from the first node to the
/// last one.
pub fn create_transfer_chain_instance(segments: usize) -> Sample<2> {
    let mut city = City::new();
    let nodes = (0..=segments)
        .map(|i| {
            let kind = match i {
                0 => CityNodeKind::Periphery,
                i if i == segments => CityNodeKind::Cbd,
                _ => CityNodeKind::Subcenter,
            };
            city.add_node(city_node(&format!("N{}", i), kind, i as u32, i as f64, 0.0))
        })
        .collect::<Vec<_>>();
    for (&a, &b) in nodes.iter().zip(nodes.iter().skip(1)) {
        city.add_street(a, b, 1.0).unwrap();
    }

    let mut network = create_network();
    let bus = network.mode_by_name("bus").unwrap();
    let mut frequencies = map_new();
    for (i, segment) in nodes.windows(2).enumerate() {
        for line in ["A", "B"] {
            let id = format!("{}{}", line, i);
            let route = add_two_way_route(&city, &mut network, &id, bus, segment);
            frequencies.insert(route, 4.0);
        }
    }

    let first = nodes[0];
    let last = nodes[segments];
    let mut demand = Demand::new();
    demand.insert(first, last, 80.0);
    Sample {
        city,
        network,
        frequencies,
        demand,
        config: default_config(0.5),
        nodes: [first, last],
    }
}
