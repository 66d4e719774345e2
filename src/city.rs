use std::fmt::Debug;

use crate::col::{map_new, HashMap};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CityNodeIdx(pub u32);
impl Debug for CityNodeIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("c#{}", self.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CityNodeKind {
    Cbd,
    Subcenter,
    Periphery,
}

#[derive(Debug, Clone)]
pub struct CityNode {
    pub name: Box<str>,
    pub kind: CityNodeKind,
    pub zone: u32,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone)]
pub struct CityEdge {
    pub from: CityNodeIdx,
    pub to: CityNodeIdx,
    /// km
    pub distance: f64,
}

#[derive(Debug, PartialEq)]
pub enum CityError {
    UnknownNode(CityNodeIdx),
    SelfLoop(CityNodeIdx),
    NonPositiveDistance(CityNodeIdx, CityNodeIdx, f64),
    DuplicateEdge(CityNodeIdx, CityNodeIdx),
}

/// The street/track network the routes run on. Edges are directed.
#[derive(Debug, Default)]
pub struct City {
    nodes: Vec<CityNode>,
    edges: Vec<CityEdge>,
    edge_by_pair: HashMap<(CityNodeIdx, CityNodeIdx), usize>,
}

impl City {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            edge_by_pair: map_new(),
        }
    }

    pub fn add_node(&mut self, node: CityNode) -> CityNodeIdx {
        self.nodes.push(node);
        CityNodeIdx(self.nodes.len() as u32 - 1)
    }

    pub fn add_edge(
        &mut self,
        from: CityNodeIdx,
        to: CityNodeIdx,
        distance: f64,
    ) -> Result<(), CityError> {
        for idx in [from, to] {
            if idx.0 as usize >= self.nodes.len() {
                return Err(CityError::UnknownNode(idx));
            }
        }
        if from == to {
            return Err(CityError::SelfLoop(from));
        }
        if !(distance > 0.0) {
            return Err(CityError::NonPositiveDistance(from, to, distance));
        }
        if self.edge_by_pair.contains_key(&(from, to)) {
            return Err(CityError::DuplicateEdge(from, to));
        }
        self.edge_by_pair.insert((from, to), self.edges.len());
        self.edges.push(CityEdge { from, to, distance });
        Ok(())
    }

    /// Adds the edge in both directions.
    pub fn add_street(
        &mut self,
        a: CityNodeIdx,
        b: CityNodeIdx,
        distance: f64,
    ) -> Result<(), CityError> {
        self.add_edge(a, b, distance)?;
        self.add_edge(b, a, distance)
    }

    pub fn edge_distance(&self, from: CityNodeIdx, to: CityNodeIdx) -> Option<f64> {
        self.edge_by_pair
            .get(&(from, to))
            .map(|&idx| self.edges[idx].distance)
    }

    pub fn node(&self, idx: CityNodeIdx) -> &CityNode {
        &self.nodes[idx.0 as usize]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (CityNodeIdx, &CityNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (CityNodeIdx(idx as u32), node))
    }

    pub fn edges(&self) -> impl Iterator<Item = &CityEdge> + '_ {
        self.edges.iter()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes_in_zone(&self, zone: u32) -> impl Iterator<Item = CityNodeIdx> + '_ {
        self.nodes()
            .filter(move |(_, node)| node.zone == zone)
            .map(|(idx, _)| idx)
    }
}
