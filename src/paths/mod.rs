//! Endpoint-to-endpoint length measurement over a flattened [`RouteGraph`].
//!
//! Every connected component of the graph is measured independently. Its
//! terminals are the nodes with exactly one incident edge; for every unordered
//! pair of terminals, every minimum-hop path between them yields one
//! [`RouteRecord`] whose length is the sum of the routing segments on that
//! path.
//!
//! Path selection counts hops only. The traversal weight stored on edges plays
//! no part in it, so two routes with the same number of hops are both
//! reported even when their physical lengths differ.

use crate::diagnostics::Diagnostics;
use crate::graph::{GraphError, PortRef, RouteGraph, build_graph};
use crate::netlist::NetlistProvider;
use itertools::Itertools;
use petgraph::graph::NodeIndex;
use rayon::prelude::*;
use std::collections::VecDeque;
use std::fmt;

/// Measured length of one shortest route between two terminals.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRecord {
    pub start: PortRef,
    pub end: PortRef,
    pub length: f64,
}

impl fmt::Display for RouteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.start, self.end, self.length)
    }
}

impl From<RouteRecord> for (String, String, f64) {
    fn from(record: RouteRecord) -> Self {
        (record.start.to_string(), record.end.to_string(), record.length)
    }
}

/// Flatten `circuit` and measure every terminal-to-terminal route in it.
///
/// # Example
///
/// ```
/// use pathlen::compute_path_lengths;
/// use pathlen::diagnostics::LogSink;
/// use pathlen::graph::PortRef;
/// use pathlen::netlist::{Instance, Netlist, NetlistSet};
///
/// let wg = |x0: f64, len: f64| {
///     Instance::new("straight")
///         .with_port("o1", (x0, 0.0))
///         .with_port("o2", (x0 + len, 0.0))
///         .with_info("route_info_length", len)
/// };
/// let top = Netlist::new()
///     .with_instance("a", wg(0.0, 100.0))
///     .with_instance("b", wg(100.0, 50.0))
///     .with_connection(PortRef::new("a", "o2"), PortRef::new("b", "o1"));
/// let netlists = NetlistSet::new().with("top", top);
///
/// let records = compute_path_lengths(&netlists, "top", &LogSink).unwrap();
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].length, 150.0);
/// ```
pub fn compute_path_lengths<P, D>(
    provider: &P,
    circuit: &str,
    diagnostics: &D,
) -> Result<Vec<RouteRecord>, GraphError>
where
    P: NetlistProvider + ?Sized,
    D: Diagnostics + ?Sized,
{
    let graph = build_graph(provider, circuit, diagnostics)?;
    log::info!(
        "flattened {} into {} nodes and {} edges",
        circuit,
        graph.node_count(),
        graph.edge_count()
    );
    extract_paths(&graph)
}

/// Measure every terminal pair of every connected component of `graph`.
///
/// Records come out grouped by component, in node insertion order.
///
/// # Errors
///
/// [`GraphError::MalformedIdentifier`] if a terminal's name has more than one
/// instance separator.
pub fn extract_paths(graph: &RouteGraph) -> Result<Vec<RouteRecord>, GraphError> {
    let per_component = graph
        .connected_components()
        .par_iter()
        .map(|component| measure_component(graph, component))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(per_component.into_iter().flatten().collect())
}

/// Terminals of a connected component: nodes with exactly one neighbour, in
/// node insertion order.
pub fn terminals(graph: &RouteGraph, component: &[NodeIndex]) -> Vec<NodeIndex> {
    let mut ends: Vec<NodeIndex> = component
        .iter()
        .copied()
        .filter(|&ix| graph.degree(ix) == 1)
        .collect();
    ends.sort_unstable();
    ends
}

fn measure_component(
    graph: &RouteGraph,
    component: &[NodeIndex],
) -> Result<Vec<RouteRecord>, GraphError> {
    let ends = terminals(graph, component)
        .into_iter()
        .map(|ix| -> Result<_, GraphError> { Ok((ix, PortRef::parse(&graph.node(ix).name)?)) })
        .collect::<Result<Vec<_>, _>>()?;

    if ends.len() < 2 {
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for ((a, start), (b, end)) in ends.iter().tuple_combinations() {
        for path in all_shortest_paths(graph, *a, *b) {
            records.push(RouteRecord {
                start: start.clone(),
                end: end.clone(),
                length: path_length(graph, &path),
            });
        }
    }

    log::debug!(
        "component with {} nodes: {} terminals, {} routes",
        component.len(),
        ends.len(),
        records.len()
    );

    Ok(records)
}

/// Sum of the routing lengths along consecutive nodes of `path`.
pub fn path_length(graph: &RouteGraph, path: &[NodeIndex]) -> f64 {
    path.windows(2)
        .filter_map(|pair| graph.edge_between(pair[0], pair[1]))
        .map(|edge| edge.length())
        .sum()
}

/// Every path from `source` to `target` with the minimum number of hops.
///
/// Returns an empty vector when `target` is unreachable.
pub fn all_shortest_paths(
    graph: &RouteGraph,
    source: NodeIndex,
    target: NodeIndex,
) -> Vec<Vec<NodeIndex>> {
    let bound = graph.inner().node_count();
    let mut distance: Vec<Option<usize>> = vec![None; bound];
    let mut predecessors: Vec<Vec<NodeIndex>> = vec![Vec::new(); bound];

    distance[source.index()] = Some(0);
    let mut queue = VecDeque::from(vec![source]);

    while let Some(ix) = queue.pop_front() {
        let Some(d) = distance[ix.index()] else {
            continue;
        };
        if ix == target {
            // every shortest path is complete once the target layer is reached
            continue;
        }
        if distance[target.index()].is_some_and(|t| d >= t) {
            continue;
        }
        for next in graph.neighbors(ix) {
            match distance[next.index()] {
                None => {
                    distance[next.index()] = Some(d + 1);
                    predecessors[next.index()].push(ix);
                    queue.push_back(next);
                }
                Some(dn) if dn == d + 1 => predecessors[next.index()].push(ix),
                Some(_) => {}
            }
        }
    }

    if distance[target.index()].is_none() {
        return Vec::new();
    }

    // Walk the predecessor lists back from the target.
    let mut paths = Vec::new();
    let mut stack = vec![vec![target]];
    while let Some(partial) = stack.pop() {
        let head = partial[partial.len() - 1];
        if head == source {
            paths.push(partial.into_iter().rev().collect());
            continue;
        }
        for &previous in &predecessors[head.index()] {
            let mut extended = partial.clone();
            extended.push(previous);
            stack.push(extended);
        }
    }

    paths
}
