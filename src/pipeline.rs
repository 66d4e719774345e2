use log::info;

use crate::{
    city::City,
    col::HashMap,
    demand::Demand,
    extended_graph::ExtendedGraph,
    flow::Loads,
    labels::HyperpathTable,
    network::{RouteIdx, TransportNetwork},
    passenger::Passenger,
    primitives::{FVal, Frequency},
    section::most_loaded_sections,
    split::AssignmentTable,
    timer::StageTimer,
};

#[derive(Debug, Clone)]
pub struct EvaluationConfig {
    pub passenger: Passenger,
    /// Width of the area served by a city node, in km.
    pub catchment_width: f64,
    /// Label destinations on the rayon thread pool.
    pub parallel: bool,
}

/// Everything derived from one frequency assignment.
#[derive(Debug)]
pub struct Evaluation {
    pub graph: ExtendedGraph,
    pub hyperpaths: HyperpathTable,
    pub assignment: AssignmentTable,
    /// Passengers per vehicle trip.
    pub loads: Loads,
    pub sections: HashMap<RouteIdx, FVal>,
    pub timer: StageTimer,
}

impl Evaluation {
    /// Rebuilds the extended graph and derives labels, stop split, loads
    /// and most loaded sections from scratch.
    pub fn compute(
        city: &City,
        network: &TransportNetwork,
        frequencies: &HashMap<RouteIdx, Frequency>,
        demand: &Demand,
        config: &EvaluationConfig,
    ) -> Self {
        let mut timer = StageTimer::start();
        let passenger = &config.passenger;

        let graph = ExtendedGraph::create(
            city,
            network,
            frequencies,
            passenger,
            config.catchment_width,
        );
        info!(
            "Extended graph has {} nodes and {} edges.",
            graph.num_nodes(),
            graph.num_edges()
        );
        timer.lap("Building the extended graph");

        let destinations = demand.destinations();
        let hyperpaths = HyperpathTable::compute(
            &graph,
            &destinations,
            passenger.wait_factor(),
            config.parallel,
        );
        info!(
            "Labeled {} destinations ({} labels).",
            destinations.len(),
            hyperpaths.num_labels()
        );
        timer.lap("Labeling");

        let assignment = AssignmentTable::compute(
            &graph,
            &hyperpaths,
            demand,
            passenger,
            config.catchment_width,
        );
        timer.lap("Splitting demand");

        let mut loads = Loads::propagate(&graph, network, &hyperpaths, &assignment, demand);
        loads.normalize(&graph);
        timer.lap("Propagating flow");

        let sections = most_loaded_sections(&graph, network, &loads);
        timer.lap("Most loaded sections");
        info!("Evaluation took {}ms.", timer.total().as_millis());

        Evaluation {
            graph,
            hyperpaths,
            assignment,
            loads,
            sections,
            timer,
        }
    }
}
