use std::fmt::Debug;

use itertools::Itertools;

use crate::{
    city::{City, CityNodeIdx},
    col::{map_new, HashMap},
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteIdx(pub u32);
impl Debug for RouteIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("r#{}", self.0))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModeIdx(pub u32);
impl Debug for ModeIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("m#{}", self.0))
    }
}

#[derive(Debug, Clone)]
pub struct TransportMode {
    pub name: Box<str>,
    /// km/h
    pub speed: f64,
    /// Number of evenly spaced stops of this mode competing for one catchment.
    pub divisor: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::Outbound, Direction::Inbound];

    pub fn code(self) -> &'static str {
        match self {
            Direction::Outbound => "I",
            Direction::Inbound => "R",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteType {
    Custom,
    Predefined,
}

#[derive(Debug, PartialEq)]
pub enum RouteError {
    EmptyRoute(Box<str>),
    EmptyStops(Box<str>, Direction),
    StopNotInSequence(Box<str>, Direction, CityNodeIdx),
    FirstStopMismatch(Box<str>, Direction),
    LastStopMismatch(Box<str>, Direction),
    NotACycle(Box<str>),
    RepeatedNode(Box<str>, Direction, CityNodeIdx),
    MissingCityEdge(Box<str>, CityNodeIdx, CityNodeIdx),
    DuplicateRoute(Box<str>),
    UnknownMode(ModeIdx),
}

/// A line served in one or two directions. Stops are a subsequence of the
/// traversed nodes of the same direction.
#[derive(Debug, Clone)]
pub struct Route {
    pub id: Box<str>,
    pub mode: ModeIdx,
    pub route_type: RouteType,
    nodes_i: Box<[CityNodeIdx]>,
    nodes_r: Box<[CityNodeIdx]>,
    stops_i: Box<[CityNodeIdx]>,
    stops_r: Box<[CityNodeIdx]>,
}

impl Route {
    pub fn new(
        id: &str,
        mode: ModeIdx,
        route_type: RouteType,
        nodes_i: Vec<CityNodeIdx>,
        nodes_r: Vec<CityNodeIdx>,
        stops_i: Vec<CityNodeIdx>,
        stops_r: Vec<CityNodeIdx>,
    ) -> Result<Self, RouteError> {
        let route = Self {
            id: id.into(),
            mode,
            route_type,
            nodes_i: nodes_i.into_boxed_slice(),
            nodes_r: nodes_r.into_boxed_slice(),
            stops_i: stops_i.into_boxed_slice(),
            stops_r: stops_r.into_boxed_slice(),
        };
        route.validate()?;
        Ok(route)
    }

    fn validate(&self) -> Result<(), RouteError> {
        if self.nodes_i.is_empty() && self.nodes_r.is_empty() {
            return Err(RouteError::EmptyRoute(self.id.clone()));
        }
        if self.route_type == RouteType::Custom {
            if self.nodes_i.is_empty() || self.nodes_r.is_empty() {
                return Err(RouteError::NotACycle(self.id.clone()));
            }
            if self.nodes_i.first() != self.nodes_r.last()
                || self.nodes_r.first() != self.nodes_i.last()
            {
                return Err(RouteError::NotACycle(self.id.clone()));
            }
            for direction in Direction::BOTH {
                if let Some(&node) = self.nodes(direction).iter().duplicates().next() {
                    return Err(RouteError::RepeatedNode(self.id.clone(), direction, node));
                }
            }
        }
        for direction in Direction::BOTH {
            if self.nodes(direction).is_empty() {
                continue;
            }
            self.validate_stops(direction)?;
        }
        Ok(())
    }

    fn validate_stops(&self, direction: Direction) -> Result<(), RouteError> {
        let nodes = self.nodes(direction);
        let stops = self.stops(direction);
        if stops.is_empty() {
            return Err(RouteError::EmptyStops(self.id.clone(), direction));
        }
        // Stops must appear in traversal order.
        let mut rest = nodes.iter();
        for &stop in stops.iter() {
            if !rest.any(|&node| node == stop) {
                return Err(RouteError::StopNotInSequence(
                    self.id.clone(),
                    direction,
                    stop,
                ));
            }
        }
        if nodes.first() != stops.first() {
            return Err(RouteError::FirstStopMismatch(self.id.clone(), direction));
        }
        if nodes.last() != stops.last() {
            return Err(RouteError::LastStopMismatch(self.id.clone(), direction));
        }
        Ok(())
    }

    pub fn nodes(&self, direction: Direction) -> &[CityNodeIdx] {
        match direction {
            Direction::Outbound => &self.nodes_i,
            Direction::Inbound => &self.nodes_r,
        }
    }

    pub fn stops(&self, direction: Direction) -> &[CityNodeIdx] {
        match direction {
            Direction::Outbound => &self.stops_i,
            Direction::Inbound => &self.stops_r,
        }
    }

    /// Directions with at least one stop.
    pub fn directions(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::BOTH
            .into_iter()
            .filter(move |&direction| !self.stops(direction).is_empty())
    }

    /// A circular route only serves one of its directions.
    pub fn is_circular(&self) -> bool {
        self.directions().count() == 1
    }
}

#[derive(Debug)]
pub struct TransportNetwork {
    modes: Vec<TransportMode>,
    routes: Vec<Route>,
    route_ids: HashMap<Box<str>, RouteIdx>,
}

impl TransportNetwork {
    pub fn new() -> Self {
        Self {
            modes: Vec::new(),
            routes: Vec::new(),
            route_ids: map_new(),
        }
    }

    pub fn add_mode(&mut self, mode: TransportMode) -> ModeIdx {
        assert!(
            mode.speed.is_finite() && mode.speed > 0.0 && mode.divisor >= 1,
            "Invalid mode {}",
            mode.name
        );
        self.modes.push(mode);
        ModeIdx(self.modes.len() as u32 - 1)
    }

    pub fn mode(&self, idx: ModeIdx) -> &TransportMode {
        &self.modes[idx.0 as usize]
    }

    pub fn modes(&self) -> impl Iterator<Item = (ModeIdx, &TransportMode)> + '_ {
        self.modes
            .iter()
            .enumerate()
            .map(|(idx, mode)| (ModeIdx(idx as u32), mode))
    }

    pub fn mode_by_name(&self, name: &str) -> Option<ModeIdx> {
        self.modes()
            .find(|(_, mode)| &*mode.name == name)
            .map(|(idx, _)| idx)
    }

    /// Adds a validated route after checking that it runs on existing city
    /// edges and that its id is unused.
    pub fn add_route(&mut self, city: &City, route: Route) -> Result<RouteIdx, RouteError> {
        if route.mode.0 as usize >= self.modes.len() {
            return Err(RouteError::UnknownMode(route.mode));
        }
        for direction in Direction::BOTH {
            for (&from, &to) in route.nodes(direction).iter().tuple_windows() {
                if city.edge_distance(from, to).is_none() {
                    return Err(RouteError::MissingCityEdge(route.id.clone(), from, to));
                }
            }
        }
        if self.route_ids.contains_key(&route.id) {
            return Err(RouteError::DuplicateRoute(route.id.clone()));
        }
        let idx = RouteIdx(self.routes.len() as u32);
        self.route_ids.insert(route.id.clone(), idx);
        self.routes.push(route);
        Ok(idx)
    }

    pub fn route(&self, idx: RouteIdx) -> &Route {
        &self.routes[idx.0 as usize]
    }

    pub fn routes(&self) -> impl Iterator<Item = (RouteIdx, &Route)> + '_ {
        self.routes
            .iter()
            .enumerate()
            .map(|(idx, route)| (RouteIdx(idx as u32), route))
    }

    pub fn route_by_id(&self, id: &str) -> Option<RouteIdx> {
        self.route_ids.get(id).copied()
    }

    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        city::CityNodeIdx,
        test::sample::{create_corridor_city, create_network},
    };

    use super::{Direction, Route, RouteError, RouteType, TransportMode, TransportNetwork};

    fn c(ids: &[u32]) -> Vec<CityNodeIdx> {
        ids.iter().map(|&it| CityNodeIdx(it)).collect()
    }

    #[test]
    fn custom_route_is_validated() {
        let network = create_network();
        let bus = network.mode_by_name("bus").unwrap();
        let route = Route::new(
            "R1",
            bus,
            RouteType::Custom,
            c(&[0, 1, 2]),
            c(&[2, 1, 0]),
            c(&[0, 2]),
            c(&[2, 1, 0]),
        )
        .unwrap();
        assert!(!route.is_circular());
        assert_eq!(route.directions().count(), 2);
        assert_eq!(route.stops(Direction::Outbound), &c(&[0, 2])[..]);
    }

    #[test]
    fn malformed_routes_are_rejected() {
        let network = create_network();
        let bus = network.mode_by_name("bus").unwrap();
        let make = |ni: &[u32], nr: &[u32], si: &[u32], sr: &[u32]| {
            Route::new("X", bus, RouteType::Custom, c(ni), c(nr), c(si), c(sr)).unwrap_err()
        };
        assert_eq!(
            make(&[0, 1, 2], &[2, 1], &[0, 2], &[2, 1]),
            RouteError::NotACycle("X".into())
        );
        assert_eq!(
            make(&[0, 1, 0, 2], &[2, 0], &[0, 2], &[2, 0]),
            RouteError::RepeatedNode("X".into(), Direction::Outbound, CityNodeIdx(0))
        );
        assert_eq!(
            make(&[0, 1, 2], &[2, 1, 0], &[0, 3, 2], &[2, 0]),
            RouteError::StopNotInSequence("X".into(), Direction::Outbound, CityNodeIdx(3))
        );
        assert_eq!(
            make(&[0, 1, 2], &[2, 1, 0], &[0, 2], &[1, 0]),
            RouteError::FirstStopMismatch("X".into(), Direction::Inbound)
        );
        assert_eq!(
            make(&[0, 1, 2], &[2, 1, 0], &[0, 1], &[2, 0]),
            RouteError::LastStopMismatch("X".into(), Direction::Outbound)
        );
        // Out of order.
        assert_eq!(
            make(&[0, 1, 2], &[2, 1, 0], &[0, 2, 1, 2], &[2, 0]),
            RouteError::StopNotInSequence("X".into(), Direction::Outbound, CityNodeIdx(1))
        );
    }

    #[test]
    fn predefined_circular_route() {
        let network = create_network();
        let bus = network.mode_by_name("bus").unwrap();
        let route = Route::new(
            "C1",
            bus,
            RouteType::Predefined,
            c(&[0, 1, 2, 0]),
            vec![],
            c(&[0, 2, 0]),
            vec![],
        )
        .unwrap();
        assert!(route.is_circular());
    }

    #[test]
    fn network_checks_edges_and_ids() {
        let (city, [p, s, cbd]) = create_corridor_city();
        let mut network = create_network();
        let bus = network.mode_by_name("bus").unwrap();
        let route = |id: &str, ni: Vec<CityNodeIdx>| {
            let mut nr = ni.clone();
            nr.reverse();
            Route::new(id, bus, RouteType::Custom, ni.clone(), nr.clone(), ni, nr).unwrap()
        };
        let idx = network.add_route(&city, route("R1", vec![p, s, cbd])).unwrap();
        assert_eq!(network.route_by_id("R1"), Some(idx));
        assert_eq!(
            network.add_route(&city, route("R1", vec![p, s])),
            Err(RouteError::DuplicateRoute("R1".into()))
        );
        assert_eq!(
            network.add_route(&city, route("R2", vec![p, cbd])),
            Err(RouteError::MissingCityEdge("R2".into(), p, cbd))
        );
        assert_eq!(network.num_routes(), 1);
    }

    #[test]
    #[should_panic(expected = "Invalid mode bus")]
    fn mode_without_speed_panics() {
        let mut network = TransportNetwork::new();
        network.add_mode(TransportMode {
            name: "bus".into(),
            speed: -20.0,
            divisor: 0,
        });
    }
}
