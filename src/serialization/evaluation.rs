use itertools::Itertools;
use sqlite::{Connection, OpenFlags};

use crate::{
    city::{City, CityNodeIdx},
    extended_graph::NodeType,
    network::TransportNetwork,
    pipeline::Evaluation,
};

/// Writes stops, assignment fractions, loads, most loaded sections and
/// stage timings into a new sqlite database. City nodes are written with the
/// external ids returned by `node_id`.
pub fn export_evaluation(
    evaluation: &Evaluation,
    city: &City,
    network: &TransportNetwork,
    node_id: impl Fn(CityNodeIdx) -> u32,
    out_filename: &str,
) -> Result<(), sqlite::Error> {
    let connection = Connection::open_with_flags(
        out_filename,
        OpenFlags::default()
            .with_create()
            .with_no_mutex()
            .with_read_write(),
    )?;
    connection.execute("BEGIN TRANSACTION;")?;

    let graph = &evaluation.graph;
    connection.execute(
        "CREATE TABLE stop (
            id INTEGER PRIMARY KEY,
            node_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            divisor INTEGER NOT NULL
        );",
    )?;
    let mut stmt =
        connection.prepare("INSERT INTO stop (id, node_id, name, divisor) VALUES (?, ?, ?, ?)")?;
    for (idx, node) in graph.nodes() {
        let NodeType::Stop {
            city: city_idx,
            divisor,
        } = node.node_type
        else {
            continue;
        };
        stmt.bind((1, idx.0 as i64))?;
        stmt.bind((2, node_id(city_idx) as i64))?;
        stmt.bind((3, city.node(city_idx).name.as_ref()))?;
        stmt.bind((4, divisor as i64))?;
        stmt.next()?;
        stmt.reset()?;
    }

    connection.execute(
        "CREATE TABLE assignment (
            origin INTEGER NOT NULL,
            destination INTEGER NOT NULL,
            stop_id INTEGER NOT NULL,
            percentage REAL NOT NULL
        );",
    )?;
    let mut stmt = connection.prepare(
        "INSERT INTO assignment (origin, destination, stop_id, percentage) VALUES (?, ?, ?, ?)",
    )?;
    for (&(origin, destination, stop), &fraction) in evaluation
        .assignment
        .iter()
        .sorted_by_key(|(key, _)| **key)
    {
        stmt.bind((1, node_id(origin) as i64))?;
        stmt.bind((2, node_id(destination) as i64))?;
        stmt.bind((3, stop.0 as i64))?;
        stmt.bind((4, fraction))?;
        stmt.next()?;
        stmt.reset()?;
    }

    connection.execute(
        "CREATE TABLE route_load (
            route_id TEXT NOT NULL,
            direction TEXT NOT NULL,
            stop_id INTEGER NOT NULL,
            boarding REAL NOT NULL,
            alighting REAL NOT NULL
        );",
    )?;
    let mut stmt = connection.prepare(
        "INSERT INTO route_load (route_id, direction, stop_id, boarding, alighting)
        VALUES (?, ?, ?, ?, ?)",
    )?;
    let loads = &evaluation.loads;
    for &(route, direction, stop) in loads.keys() {
        stmt.bind((1, network.route(route).id.as_ref()))?;
        stmt.bind((2, direction.code()))?;
        stmt.bind((3, stop.0 as i64))?;
        stmt.bind((4, loads.boarding(route, direction, stop)))?;
        stmt.bind((5, loads.alighting(route, direction, stop)))?;
        stmt.next()?;
        stmt.reset()?;
    }

    connection.execute(
        "CREATE TABLE loaded_section (
            route_id TEXT PRIMARY KEY,
            frequency REAL NOT NULL,
            load REAL NOT NULL
        );",
    )?;
    let mut stmt = connection
        .prepare("INSERT INTO loaded_section (route_id, frequency, load) VALUES (?, ?, ?)")?;
    for (route_idx, route) in network.routes() {
        stmt.bind((1, route.id.as_ref()))?;
        stmt.bind((2, graph.frequency(route_idx)))?;
        stmt.bind((3, evaluation.sections[&route_idx]))?;
        stmt.next()?;
        stmt.reset()?;
    }

    connection.execute(
        "CREATE TABLE stage_time (
            stage TEXT PRIMARY KEY,
            duration_ms INTEGER NOT NULL
        );",
    )?;
    let mut stmt =
        connection.prepare("INSERT INTO stage_time (stage, duration_ms) VALUES (?, ?)")?;
    for &(stage, duration) in evaluation.timer.stages() {
        stmt.bind((1, stage))?;
        stmt.bind((2, duration.as_millis() as i64))?;
        stmt.next()?;
        stmt.reset()?;
    }

    connection.execute("COMMIT;")?;
    Ok(())
}
