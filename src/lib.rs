//! Path length extraction for hierarchical photonic circuit netlists
//!
//! This library flattens a hierarchy of circuit netlists into a single
//! undirected connectivity graph of ports, then measures the physical length
//! of every shortest route between the graph's endpoints.
//!
//! # Overview
//!
//! A netlist lists instances (each with named ports at known positions),
//! point-to-point connections between instance ports, and the ports it
//! exposes to its parent. Two-port instances carrying a `route_info_length`
//! attribute are routing segments (waveguides, bends, tapers); every other
//! instance either has a netlist of its own, which is flattened recursively,
//! or is an opaque device whose internals are ignored.
//!
//! # Main Workflows
//!
//! 1. **Flattening** ([`graph::build_graph`]): recursively merge every level of
//!    the hierarchy into a [`graph::RouteGraph`] with absolute port positions.
//! 2. **Measurement** ([`paths::extract_paths`]): enumerate terminal pairs of
//!    each connected component and sum the routing lengths along every
//!    minimum-hop path between them.
//!
//! Both are combined by [`compute_path_lengths`].
//!
//! # Usage Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use pathlen::{compute_path_lengths, read_netlist_file};
//! use pathlen::diagnostics::LogSink;
//! use std::path::Path;
//!
//! let document = read_netlist_file(Path::new("mzi.yml"))?;
//! let records = compute_path_lengths(&document.circuits, &document.top, &LogSink)?;
//!
//! for record in records {
//!     println!("{}", record);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - **[`geometry`]**: points and the placement transform of an instance
//! - **[`netlist`]**: the hierarchical input model and its YAML form
//! - **[`graph`]**: the flattened graph and the builder producing it
//! - **[`paths`]**: terminal detection and shortest route measurement
//! - **[`compose`]**: incremental composition of routes from segments
//! - **[`diagnostics`]**: sinks for non-fatal warnings
//! - **[`measure`]** and **[`flatten`]**: the command-line entry points

use anyhow::{Context, Result};
use clap::Parser;
use std::{fs, path::Path};

pub mod compose;
pub mod diagnostics;
pub mod flatten;
pub mod geometry;
pub mod graph;
pub mod measure;
pub mod netlist;
pub mod paths;

#[cfg(test)]
mod test_helpers;

/// Interned identifier used for instance, port and node names.
pub type Symbol = string_cache::DefaultAtom;

pub use flatten::{FlattenArgs, flatten_main};
pub use graph::{GraphError, PortRef, RouteGraph, build_graph};
pub use measure::{MeasureArgs, measure_main};
pub use paths::{RouteRecord, compute_path_lengths, extract_paths};

/// Reads and parses a YAML hierarchy dump from a file.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use pathlen::read_netlist_file;
/// use std::path::Path;
///
/// let document = read_netlist_file(Path::new("mzi.yml"))?;
/// println!("top circuit: {}", document.top);
/// # Ok(())
/// # }
/// ```
pub fn read_netlist_file(file_name: &Path) -> Result<netlist::yaml::NetlistDocument> {
    let file = fs::read_to_string(file_name)
        .with_context(|| format!("reading {}", file_name.display()))?;
    Ok(netlist::yaml::parse(&file)?)
}

/// Command-line interface arguments for the path length tools.
#[derive(Debug, Parser)]
#[clap(
    name = "pathlen",
    about = "Route length extraction for hierarchical circuit netlists"
)]
pub enum CLIArguments {
    /// Measure every endpoint-to-endpoint route of a circuit.
    Measure(MeasureArgs),
    /// Flatten a circuit and dump its connectivity graph.
    Flatten(FlattenArgs),
}
