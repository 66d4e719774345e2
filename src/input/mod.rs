use std::fs::File;

use log::info;
use serde::Deserialize;

use crate::{
    city::{City, CityError, CityNode, CityNodeIdx, CityNodeKind},
    col::{map_new, HashMap},
    demand::Demand,
    indexer::Indexer,
    network::{Route, RouteError, RouteIdx, RouteType, TransportMode, TransportNetwork},
    passenger::Passenger,
    pipeline::EvaluationConfig,
    primitives::Frequency,
};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum NodeKindRecord {
    #[serde(rename = "cbd")]
    Cbd,
    #[serde(rename = "subcenter")]
    Subcenter,
    #[serde(rename = "periphery")]
    Periphery,
}

impl From<NodeKindRecord> for CityNodeKind {
    fn from(kind: NodeKindRecord) -> Self {
        match kind {
            NodeKindRecord::Cbd => CityNodeKind::Cbd,
            NodeKindRecord::Subcenter => CityNodeKind::Subcenter,
            NodeKindRecord::Periphery => CityNodeKind::Periphery,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NodeRecord {
    #[serde(rename = "# node_id")]
    pub node_id: u32,
    pub name: String,
    pub kind: NodeKindRecord,
    pub zone: u32,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EdgeRecord {
    #[serde(rename = "# from")]
    pub from: u32,
    pub to: u32,
    pub distance: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModeRecord {
    #[serde(rename = "# name")]
    pub name: String,
    pub speed: f64,
    pub divisor: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum RouteTypeRecord {
    #[serde(rename = "custom")]
    Custom,
    #[serde(rename = "predefined")]
    Predefined,
}

/// Node and stop sequences are comma-separated node ids, empty for a
/// direction that is not served.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RouteRecord {
    #[serde(rename = "# route_id")]
    pub route_id: String,
    pub mode: String,
    pub nodes_i: String,
    pub nodes_r: String,
    pub stops_i: String,
    pub stops_r: String,
    pub route_type: RouteTypeRecord,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FrequencyRecord {
    #[serde(rename = "# route_id")]
    pub route_id: String,
    pub frequency: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DemandRecord {
    #[serde(rename = "# origin")]
    pub origin: u32,
    pub destination: u32,
    pub trips: f64,
}

fn reader() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.trim(csv::Trim::All).delimiter(b';');

    builder
}

pub fn parse_nodes(stream: impl std::io::Read) -> Result<Box<[NodeRecord]>, csv::Error> {
    reader().from_reader(stream).deserialize().collect()
}
pub fn parse_edges(stream: impl std::io::Read) -> Result<Box<[EdgeRecord]>, csv::Error> {
    reader().from_reader(stream).deserialize().collect()
}
pub fn parse_modes(stream: impl std::io::Read) -> Result<Box<[ModeRecord]>, csv::Error> {
    reader().from_reader(stream).deserialize().collect()
}
pub fn parse_routes(stream: impl std::io::Read) -> Result<Box<[RouteRecord]>, csv::Error> {
    reader().from_reader(stream).deserialize().collect()
}
pub fn parse_frequencies(
    stream: impl std::io::Read,
) -> Result<Box<[FrequencyRecord]>, csv::Error> {
    reader().from_reader(stream).deserialize().collect()
}
pub fn parse_demand(stream: impl std::io::Read) -> Result<Box<[DemandRecord]>, csv::Error> {
    reader().from_reader(stream).deserialize().collect()
}

#[derive(Debug)]
pub enum ParseConfigError {
    CsvError(csv::Error),
    MissingKey(Box<str>),
    InvalidValue(Box<str>),
}

pub fn parse_config(stream: impl std::io::Read) -> Result<EvaluationConfig, ParseConfigError> {
    let key_value_pairs = reader()
        .from_reader(stream)
        .deserialize()
        .collect::<Result<Box<[(String, String)]>, csv::Error>>()
        .map_err(ParseConfigError::CsvError)?;
    let mut key_value_map = key_value_pairs
        .iter()
        .cloned()
        .collect::<HashMap<_, _>>();
    let mut value = |key: &str| -> Result<f64, ParseConfigError> {
        let value = key_value_map
            .remove(key)
            .ok_or_else(|| ParseConfigError::MissingKey(key.into()))?;
        value
            .parse::<f64>()
            .ok()
            .filter(|it| it.is_finite() && *it >= 0.0)
            .ok_or_else(|| {
                ParseConfigError::InvalidValue(format!("Could not parse value of {}!", key).into())
            })
    };
    let passenger = Passenger {
        walking_speed: value("walking_speed")?,
        in_vehicle_value: value("in_vehicle_value")?,
        waiting_value: value("waiting_value")?,
        access_value: value("access_value")?,
        transfer_value: value("transfer_value")?,
        transfer_time: value("transfer_time")?,
    };
    let catchment_width = value("catchment_width")?;
    for (key, positive) in [
        ("walking_speed", passenger.walking_speed),
        ("in_vehicle_value", passenger.in_vehicle_value),
        ("access_value", passenger.access_value),
    ] {
        if positive == 0.0 {
            return Err(ParseConfigError::InvalidValue(
                format!("{} must be positive!", key).into(),
            ));
        }
    }
    Ok(EvaluationConfig {
        passenger,
        catchment_width,
        parallel: false,
    })
}

#[derive(Debug)]
pub enum InputError {
    Io(Box<str>, std::io::Error),
    Csv(csv::Error),
    Config(ParseConfigError),
    City(CityError),
    Route(RouteError),
    DuplicateNode(u32),
    UnknownNode(u32),
    UnknownMode(Box<str>),
    InvalidMode(Box<str>),
    UnknownRoute(Box<str>),
    InvalidSequence(Box<str>),
    MissingFrequency(Box<str>),
    InvalidFrequency(Box<str>, f64),
    InvalidDemand(u32, u32, f64),
}

impl From<csv::Error> for InputError {
    fn from(err: csv::Error) -> Self {
        InputError::Csv(err)
    }
}

impl From<ParseConfigError> for InputError {
    fn from(err: ParseConfigError) -> Self {
        InputError::Config(err)
    }
}

impl From<CityError> for InputError {
    fn from(err: CityError) -> Self {
        InputError::City(err)
    }
}

impl From<RouteError> for InputError {
    fn from(err: RouteError) -> Self {
        InputError::Route(err)
    }
}

pub type NodeIndexer = Indexer<u32, CityNodeIdx, fn(usize) -> CityNodeIdx>;

fn to_city_node_idx(idx: usize) -> CityNodeIdx {
    CityNodeIdx(idx as u32)
}

pub fn build_city(
    nodes: &[NodeRecord],
    edges: &[EdgeRecord],
) -> Result<(City, NodeIndexer), InputError> {
    let mut node_ids: NodeIndexer = Indexer::new(to_city_node_idx);
    let mut city = City::new();
    for record in nodes {
        if node_ids.get(&record.node_id).is_some() {
            return Err(InputError::DuplicateNode(record.node_id));
        }
        let idx = node_ids.index(record.node_id);
        let added = city.add_node(CityNode {
            name: record.name.as_str().into(),
            kind: record.kind.into(),
            zone: record.zone,
            x: record.x,
            y: record.y,
        });
        debug_assert_eq!(idx, added);
    }
    for record in edges {
        let from = lookup_node(&node_ids, record.from)?;
        let to = lookup_node(&node_ids, record.to)?;
        city.add_edge(from, to, record.distance)?;
    }
    Ok((city, node_ids))
}

fn lookup_node(node_ids: &NodeIndexer, id: u32) -> Result<CityNodeIdx, InputError> {
    node_ids.get(&id).ok_or(InputError::UnknownNode(id))
}

fn parse_sequence(sequence: &str, node_ids: &NodeIndexer) -> Result<Vec<CityNodeIdx>, InputError> {
    sequence
        .split(',')
        .map(str::trim)
        .filter(|it| !it.is_empty())
        .map(|it| {
            let id = it
                .parse::<u32>()
                .map_err(|_e| InputError::InvalidSequence(sequence.into()))?;
            lookup_node(node_ids, id)
        })
        .collect()
}

pub fn build_network(
    city: &City,
    node_ids: &NodeIndexer,
    modes: &[ModeRecord],
    routes: &[RouteRecord],
) -> Result<TransportNetwork, InputError> {
    let mut network = TransportNetwork::new();
    for record in modes {
        if !(record.speed.is_finite() && record.speed > 0.0) || record.divisor == 0 {
            return Err(InputError::InvalidMode(record.name.as_str().into()));
        }
        network.add_mode(TransportMode {
            name: record.name.as_str().into(),
            speed: record.speed,
            divisor: record.divisor,
        });
    }
    for record in routes {
        let mode = network
            .mode_by_name(&record.mode)
            .ok_or_else(|| InputError::UnknownMode(record.mode.as_str().into()))?;
        let route_type = match record.route_type {
            RouteTypeRecord::Custom => RouteType::Custom,
            RouteTypeRecord::Predefined => RouteType::Predefined,
        };
        let route = Route::new(
            &record.route_id,
            mode,
            route_type,
            parse_sequence(&record.nodes_i, node_ids)?,
            parse_sequence(&record.nodes_r, node_ids)?,
            parse_sequence(&record.stops_i, node_ids)?,
            parse_sequence(&record.stops_r, node_ids)?,
        )?;
        network.add_route(city, route)?;
    }
    Ok(network)
}

/// Every route needs a non-negative frequency.
pub fn build_frequencies(
    network: &TransportNetwork,
    records: &[FrequencyRecord],
) -> Result<HashMap<RouteIdx, Frequency>, InputError> {
    let mut frequencies = map_new();
    for record in records {
        let route = network
            .route_by_id(&record.route_id)
            .ok_or_else(|| InputError::UnknownRoute(record.route_id.as_str().into()))?;
        if !(record.frequency >= 0.0 && record.frequency.is_finite()) {
            return Err(InputError::InvalidFrequency(
                record.route_id.as_str().into(),
                record.frequency,
            ));
        }
        frequencies.insert(route, record.frequency);
    }
    if let Some((_, route)) = network
        .routes()
        .find(|(idx, _)| !frequencies.contains_key(idx))
    {
        return Err(InputError::MissingFrequency(route.id.clone()));
    }
    Ok(frequencies)
}

pub fn build_demand(node_ids: &NodeIndexer, records: &[DemandRecord]) -> Result<Demand, InputError> {
    let mut demand = Demand::new();
    for record in records {
        if !(record.trips >= 0.0 && record.trips.is_finite()) {
            return Err(InputError::InvalidDemand(
                record.origin,
                record.destination,
                record.trips,
            ));
        }
        demand.insert(
            lookup_node(node_ids, record.origin)?,
            lookup_node(node_ids, record.destination)?,
            record.trips,
        );
    }
    Ok(demand)
}

/// Paths of the files making up an instance.
#[derive(Debug, Clone)]
pub struct InstanceFiles {
    pub nodes: String,
    pub edges: String,
    pub modes: String,
    pub routes: String,
    pub frequencies: String,
    pub demand: String,
    pub config: String,
}

pub struct Instance {
    pub city: City,
    pub node_ids: NodeIndexer,
    pub network: TransportNetwork,
    pub frequencies: HashMap<RouteIdx, Frequency>,
    pub demand: Demand,
    pub config: EvaluationConfig,
}

fn open(path: &str) -> Result<File, InputError> {
    File::open(path).map_err(|err| InputError::Io(path.into(), err))
}

impl Instance {
    pub fn read(files: &InstanceFiles) -> Result<Self, InputError> {
        let nodes = parse_nodes(open(&files.nodes)?)?;
        let edges = parse_edges(open(&files.edges)?)?;
        let (city, node_ids) = build_city(&nodes, &edges)?;
        info!(
            "Read city with {} nodes and {} edges.",
            city.num_nodes(),
            edges.len()
        );

        let modes = parse_modes(open(&files.modes)?)?;
        let routes = parse_routes(open(&files.routes)?)?;
        let network = build_network(&city, &node_ids, &modes, &routes)?;
        info!(
            "Read {} routes of {} modes.",
            network.num_routes(),
            modes.len()
        );

        let frequencies =
            build_frequencies(&network, &parse_frequencies(open(&files.frequencies)?)?)?;
        let demand = build_demand(&node_ids, &parse_demand(open(&files.demand)?)?)?;
        info!(
            "Read {} OD pairs with {} trips.",
            demand.pairs().len(),
            demand.total()
        );
        let config = parse_config(open(&files.config)?)?;

        Ok(Self {
            city,
            node_ids,
            network,
            frequencies,
            demand,
            config,
        })
    }

    /// External id of a city node.
    pub fn node_id(&self, idx: CityNodeIdx) -> u32 {
        *self.node_ids.id(idx.0 as usize)
    }
}
