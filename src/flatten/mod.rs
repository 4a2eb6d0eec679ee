//! The `flatten` command: dump the flattened connectivity graph.
//!
//! Writes the graph of a circuit as Graphviz DOT, with port names on the nodes
//! and routing lengths on the edges, and optionally a listing of every node
//! with its absolute position.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use pathlen::flatten::{FlattenArgs, flatten_main};
//!
//! let args = FlattenArgs {
//!     input: "mzi.yml".into(),
//!     top: Some("mzi".into()),
//!     dot: "mzi.dot".into(),
//!     nodes: None,
//! };
//!
//! flatten_main(args)?;
//! # Ok(())
//! # }
//! ```

use std::{fs, io::BufWriter, io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use petgraph::dot;

use crate::diagnostics::LogSink;
use crate::graph::{RouteGraph, build_graph};
use crate::measure::select_circuit;
use crate::read_netlist_file;

/// Command-line arguments for the flatten command.
#[derive(Parser, Debug)]
pub struct FlattenArgs {
    /// YAML hierarchy dump
    pub input: PathBuf,

    /// Circuit to flatten (default: the document's top circuit)
    #[clap(long, short)]
    pub top: Option<String>,

    /// DOT file displaying the flattened graph
    #[clap(long)]
    pub dot: PathBuf,

    /// CSV file listing every node as name,x,y
    #[clap(long)]
    pub nodes: Option<PathBuf>,
}

pub fn flatten_main(args: FlattenArgs) -> Result<()> {
    let FlattenArgs {
        input,
        top,
        dot,
        nodes,
    } = args;

    let document = read_netlist_file(&input)?;
    let circuit = select_circuit(&document, top.as_deref())?;
    let graph = build_graph(&document.circuits, circuit, &LogSink)?;

    log::info!(
        "{}: {} nodes, {} edges",
        circuit,
        graph.node_count(),
        graph.edge_count()
    );

    fs::write(&dot, render_dot(&graph)).with_context(|| format!("writing {}", dot.display()))?;

    if let Some(filename) = nodes {
        let mut file = BufWriter::new(
            fs::File::create(&filename)
                .with_context(|| format!("creating {}", filename.display()))?,
        );
        write_nodes(&mut file, &graph)?;
    }

    Ok(())
}

pub fn render_dot(graph: &RouteGraph) -> String {
    format!("{}", dot::Dot::new(graph.inner()))
}

/// One line per node in insertion order, names quoted.
pub fn write_nodes<W: Write + ?Sized>(writer: &mut W, graph: &RouteGraph) -> Result<()> {
    writeln!(writer, "name,x,y")?;
    for node in graph.nodes() {
        writeln!(
            writer,
            "\"{}\",{},{}",
            node.name, node.position.x, node.position.y
        )?;
    }
    Ok(())
}
