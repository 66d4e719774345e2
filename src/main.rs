#![allow(dead_code)]

use std::path::Path;
use std::process::exit;

use clap::{Args, Parser, Subcommand};
use itertools::Itertools;
use log::{error, info, warn};

use crate::city::CityNodeIdx;
use crate::demand::Demand;
use crate::extended_graph::{ExtNodeIdx, ExtendedGraph};
use crate::input::{Instance, InstanceFiles};
use crate::labels::HyperpathTable;
use crate::pipeline::Evaluation;
use crate::serialization::evaluation::export_evaluation;
use crate::split::AssignmentTable;

mod city;
mod col;
mod demand;
mod extended_graph;
mod flow;
mod indexer;
mod input;
mod labels;
mod network;
mod passenger;
mod pipeline;
mod primitives;
mod section;
mod serialization;
mod shortest_path;
mod split;
#[cfg(test)]
mod test;
mod timer;

#[derive(Parser, Debug)]
#[command(
    version,
    author,
    about = "Evaluates passenger flows on frequency-based transit networks using optimal strategies"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
enum Commands {
    #[command(about = "Assign the demand of an instance and write boarding and alighting loads")]
    Assign(AssignArgs),

    #[command(about = "Show the hyperpaths of one OD pair")]
    Hyperpaths(HyperpathsArgs),
}

#[derive(Args, Clone, Debug)]
struct InstanceArgs {
    #[arg(long, default_value = "Nodes.csv")]
    nodes_path: String,

    #[arg(long, default_value = "Edges.csv")]
    edges_path: String,

    #[arg(long, default_value = "Modes.csv")]
    modes_path: String,

    #[arg(long, default_value = "Routes.csv")]
    routes_path: String,

    #[arg(long, default_value = "Frequencies.csv")]
    frequencies_path: String,

    #[arg(long, default_value = "OD.csv")]
    demand_path: String,

    #[arg(long, default_value = "Config.csv")]
    config_path: String,
}

impl InstanceArgs {
    fn files(&self) -> InstanceFiles {
        InstanceFiles {
            nodes: self.nodes_path.clone(),
            edges: self.edges_path.clone(),
            modes: self.modes_path.clone(),
            routes: self.routes_path.clone(),
            frequencies: self.frequencies_path.clone(),
            demand: self.demand_path.clone(),
            config: self.config_path.clone(),
        }
    }
}

#[derive(Args, Clone, Debug)]
struct AssignArgs {
    #[clap(flatten)]
    instance: InstanceArgs,

    #[arg(
        short = 'o',
        long,
        default_value = "hyperflow-loads.sqlite3",
        help = "The file to write assignment fractions and loads to."
    )]
    out_filename: String,

    #[arg(long, help = "Log boarding and alighting per route, direction and stop.")]
    describe: bool,

    #[arg(long, help = "Label destinations in parallel.")]
    parallel: bool,
}

#[derive(Args, Clone, Debug)]
struct HyperpathsArgs {
    #[clap(flatten)]
    instance: InstanceArgs,

    #[arg(long, help = "The node id of the origin.")]
    origin: u32,

    #[arg(long, help = "The node id of the destination.")]
    destination: u32,
}

fn read_instance(args: &InstanceArgs) -> Instance {
    Instance::read(&args.files()).unwrap_or_else(|it| {
        error!("Could not read instance:\n{:#?}", it);
        exit(1);
    })
}

fn main_assign(args: &AssignArgs) {
    if Path::new(&args.out_filename).exists() {
        error!("Output file already exists: {}", args.out_filename);
        exit(1);
    }

    let mut instance = read_instance(&args.instance);
    instance.config.parallel = args.parallel;
    let evaluation = Evaluation::compute(
        &instance.city,
        &instance.network,
        &instance.frequencies,
        &instance.demand,
        &instance.config,
    );
    for (route_idx, route) in instance.network.routes().sorted_by(|a, b| a.1.id.cmp(&b.1.id)) {
        info!(
            "Route {}: most loaded section {:.2} pax/veh at {} veh/h",
            route.id,
            evaluation.sections[&route_idx],
            instance.frequencies[&route_idx]
        );
    }
    if args.describe {
        info!(
            "{}",
            evaluation
                .loads
                .describe(&evaluation.graph, &instance.city, &instance.network)
        );
    }

    export_evaluation(
        &evaluation,
        &instance.city,
        &instance.network,
        |idx| instance.node_id(idx),
        &args.out_filename,
    )
    .unwrap_or_else(|it| {
        error!("Could not write results:\n{:#?}", it);
        exit(1);
    });
}

fn lookup_node(instance: &Instance, id: u32) -> CityNodeIdx {
    instance.node_ids.get(&id).unwrap_or_else(|| {
        error!("Unknown node: {}", id);
        exit(1);
    })
}

fn main_hyperpaths(args: &HyperpathsArgs) {
    let instance = read_instance(&args.instance);
    let origin = lookup_node(&instance, args.origin);
    let destination = lookup_node(&instance, args.destination);
    let passenger = &instance.config.passenger;

    let graph = ExtendedGraph::create(
        &instance.city,
        &instance.network,
        &instance.frequencies,
        passenger,
        instance.config.catchment_width,
    );
    let hyperpaths = HyperpathTable::compute(&graph, &[destination], passenger.wait_factor(), false);

    let mut demand = Demand::new();
    demand.insert(origin, destination, 1.0);
    let assignment = AssignmentTable::compute(
        &graph,
        &hyperpaths,
        &demand,
        passenger,
        instance.config.catchment_width,
    );
    if assignment.total(origin, destination) == 0.0 {
        warn!(
            "{} cannot reach {}.",
            instance.city.node(origin).name,
            instance.city.node(destination).name
        );
        return;
    }

    let describe = |node: ExtNodeIdx| graph.describe_node(node, &instance.city, &instance.network);
    for &stop in assignment.stops(origin, destination) {
        let Some(label) = hyperpaths.label(destination, stop) else {
            info!("Stop {} does not reach the destination.", describe(stop));
            continue;
        };
        info!(
            "Stop {}: label {:.4}, {:.2}% of the demand",
            describe(stop),
            label,
            assignment.fraction(origin, destination, stop)
        );
        for path in hyperpaths.elemental_paths(&graph, destination, stop).iter() {
            info!(
                "\t{}",
                path.iter().map(|&node| describe(node)).join(" -> ")
            );
        }
    }
}

fn main() {
    env_logger::builder().parse_env("LOG").init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Assign(args) => main_assign(&args),
        Commands::Hyperpaths(args) => main_hyperpaths(&args),
    }
}
