//! Flattened connectivity graph of a hierarchical circuit.
//!
//! The graph is undirected. Nodes are ports, named with their globally unique
//! textual identifier, and carry an absolute position. Edges are either plain
//! connections between adjacent ports or routing segments that carry the
//! [`RouteInfo`] of a two-port routing instance.
//!
//! # Node naming
//!
//! A port `o1` of instance `wg` is named `wg,o1`. Boundary ports of a circuit
//! carry no instance qualifier and keep their bare name. When a sub-circuit is
//! merged into its parent through instance `sub`, every one of its node names
//! `N` becomes `sub.N` if `N` is already qualified, and `sub,N` otherwise:
//!
//! | child node | merged through `sub` |
//! |------------|----------------------|
//! | `o1`       | `sub,o1`             |
//! | `wg,o1`    | `sub.wg,o1`          |
//! | `a.wg,o1`  | `sub.a.wg,o1`        |
//!
//! Boundary ports of the child therefore land exactly on the parent's port
//! nodes of that instance, which is what stitches the levels together, while
//! every deeper node keeps a single separator and stays unique.

pub mod builder;

pub use builder::build_graph;

use crate::geometry::{Point, Transform};
use crate::netlist::AttrValue;
use crate::Symbol;
use petgraph::algo;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::{error::Error, fmt};

/// Traversal weight attached to every edge.
///
/// It carries no physical meaning; measured lengths live in [`RouteInfo`].
pub const EDGE_WEIGHT: f64 = 1e-4;

/// Separates the instance qualifier from the port name.
pub const INSTANCE_SEPARATOR: char = ',';

/// Separates hierarchy levels inside an instance qualifier.
pub const HIERARCHY_SEPARATOR: char = '.';

/// Joins the two sorted port names of a routing segment into its link key.
pub const LINK_SEPARATOR: char = ':';

/// Attribute that marks an instance as a routing segment.
pub const ROUTE_LENGTH_KEY: &str = "route_info_length";

/// Prefix shared by all routing attributes.
pub const ROUTE_INFO_PREFIX: &str = "route_info";

/// Errors raised while flattening a netlist or extracting paths from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A routing instance does not expose exactly two ports.
    WrongPortCount { instance: Symbol, count: usize },
    /// A node name with more than one instance separator.
    MalformedIdentifier(String),
    /// A connection or exposed port references a port no instance declares.
    UnknownPort { circuit: Symbol, port: String },
    /// The requested circuit has no netlist.
    UnknownCircuit(Symbol),
    /// An instance re-enters a circuit that is already being expanded.
    CyclicHierarchy { circuit: Symbol, instance: Symbol },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::WrongPortCount { instance, count } => write!(
                f,
                "routing instance \"{}\" has {} ports, routing segments must have two",
                instance, count
            ),
            GraphError::MalformedIdentifier(name) => write!(
                f,
                "did not expect a port name with more than one comma: {}",
                name
            ),
            GraphError::UnknownPort { circuit, port } => {
                write!(f, "undefined port \"{}\" in circuit \"{}\"", port, circuit)
            }
            GraphError::UnknownCircuit(name) => write!(f, "no netlist for circuit \"{}\"", name),
            GraphError::CyclicHierarchy { circuit, instance } => write!(
                f,
                "instance \"{}\" re-enters circuit \"{}\" recursively",
                instance, circuit
            ),
        }
    }
}

impl Error for GraphError {}

/// Reference to a port, either on an instance or on the circuit boundary.
///
/// # Example
///
/// ```
/// use pathlen::graph::PortRef;
///
/// let port = PortRef::parse("wg1,o2").unwrap();
/// assert_eq!(port.instance.as_deref(), Some("wg1"));
/// assert_eq!(port.to_string(), "wg1,o2");
///
/// let boundary = PortRef::parse("in").unwrap();
/// assert!(boundary.instance.is_none());
///
/// assert!(PortRef::parse("a,b,c").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub struct PortRef {
    pub instance: Option<Symbol>,
    pub port: Symbol,
}

impl PortRef {
    pub fn new(instance: impl Into<Symbol>, port: impl Into<Symbol>) -> Self {
        Self {
            instance: Some(instance.into()),
            port: port.into(),
        }
    }

    pub fn boundary(port: impl Into<Symbol>) -> Self {
        Self {
            instance: None,
            port: port.into(),
        }
    }

    /// Parse the canonical textual form.
    pub fn parse(name: &str) -> Result<Self, GraphError> {
        let mut fields = name.split(INSTANCE_SEPARATOR);
        match (fields.next(), fields.next(), fields.next()) {
            (Some(port), None, None) => Ok(Self::boundary(port)),
            (Some(instance), Some(port), None) => Ok(Self::new(instance, port)),
            _ => Err(GraphError::MalformedIdentifier(name.to_owned())),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instance {
            Some(instance) => write!(f, "{}{}{}", instance, INSTANCE_SEPARATOR, self.port),
            None => write!(f, "{}", self.port),
        }
    }
}

impl TryFrom<String> for PortRef {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PortRef::parse(&value)
    }
}

/// Name of `node` once its circuit is merged into the parent through `instance`.
pub fn subinstance_node_name(instance: &str, node: &str) -> Symbol {
    if node.contains(INSTANCE_SEPARATOR) {
        format!("{}{}{}", instance, HIERARCHY_SEPARATOR, node).into()
    } else {
        format!("{}{}{}", instance, INSTANCE_SEPARATOR, node).into()
    }
}

/// Link key of a routing segment: its two port names, sorted, joined by `:`.
pub fn link_name<'a>(ports: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut ports: Vec<&str> = ports.into_iter().collect();
    if ports.len() != 2 {
        return None;
    }
    ports.sort_unstable();
    Some(format!("{}{}{}", ports[0], LINK_SEPARATOR, ports[1]))
}

/// Routing attributes of a segment edge.
///
/// `length` is only set when the host reported a numeric `route_info_length`;
/// anything else prefixed with `route_info` is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteInfo {
    pub length: Option<f64>,
    pub component: Option<Symbol>,
    pub extra: BTreeMap<String, AttrValue>,
}

impl RouteInfo {
    /// Extract the routing attributes of a leaf instance.
    ///
    /// Returns `None` when the instance is not a routing segment, i.e. has no
    /// `route_info_length` attribute at all.
    pub fn from_info(info: &BTreeMap<String, AttrValue>) -> Option<Self> {
        if !info.contains_key(ROUTE_LENGTH_KEY) {
            return None;
        }

        let mut route = RouteInfo::default();
        for (key, value) in info
            .iter()
            .filter(|(key, _)| key.starts_with(ROUTE_INFO_PREFIX))
        {
            match (key.as_str(), value.as_f64()) {
                (ROUTE_LENGTH_KEY, Some(length)) => route.length = Some(length),
                _ => {
                    route.extra.insert(key.clone(), value.clone());
                }
            }
        }
        Some(route)
    }

    pub fn with_component(mut self, component: impl Into<Symbol>) -> Self {
        self.component = Some(component.into());
        self
    }
}

/// A port in the flattened graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: Symbol,
    pub position: Point,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.position)
    }
}

/// Connection between two ports.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub weight: f64,
    pub link: Option<String>,
    pub route: Option<RouteInfo>,
}

impl Edge {
    /// Zero-length wiring between adjacent ports.
    pub fn connection() -> Self {
        Self {
            weight: EDGE_WEIGHT,
            link: None,
            route: None,
        }
    }

    /// Atomic routing segment between the two ports of one instance.
    pub fn routing(link: impl Into<String>, route: RouteInfo) -> Self {
        Self {
            weight: EDGE_WEIGHT,
            link: Some(link.into()),
            route: Some(route),
        }
    }

    /// Physical length contributed by this edge; zero unless it is a routing
    /// segment with a numeric length.
    pub fn length(&self) -> f64 {
        self.route
            .as_ref()
            .and_then(|route| route.length)
            .unwrap_or(0.0)
    }

    pub fn is_routing(&self) -> bool {
        self.route.is_some()
    }

    /// Fold the attributes of `other` into `self`, `other` taking precedence.
    fn merge(&mut self, other: Edge) {
        self.weight = other.weight;
        if other.link.is_some() {
            self.link = other.link;
        }
        if other.route.is_some() {
            self.route = other.route;
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.link, self.route.as_ref().and_then(|r| r.length)) {
            (Some(link), Some(length)) => write!(f, "{} {}", link, length),
            (Some(link), None) => write!(f, "{}", link),
            _ => Ok(()),
        }
    }
}

/// Undirected port graph with name lookup.
///
/// Adding a node that already exists updates its position, and adding an
/// edge between two already adjacent nodes merges the edge attributes, so
/// the graph never holds parallel edges or duplicate names.
#[derive(Debug, Clone, Default)]
pub struct RouteGraph {
    graph: UnGraph<Node, Edge>,
    index: HashMap<Symbol, NodeIndex>,
}

impl RouteGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node or move an existing one.
    pub fn add_node(&mut self, name: impl Into<Symbol>, position: Point) -> NodeIndex {
        let name = name.into();
        match self.index.get(&name) {
            Some(&ix) => {
                self.graph[ix].position = position;
                ix
            }
            None => {
                let ix = self.graph.add_node(Node {
                    name: name.clone(),
                    position,
                });
                self.index.insert(name, ix);
                ix
            }
        }
    }

    /// Connect two existing nodes, merging with any edge already joining them.
    ///
    /// Returns `None` if either node is unknown.
    pub fn add_edge(&mut self, a: &str, b: &str, edge: Edge) -> Option<EdgeIndex> {
        let ia = self.node_index(a)?;
        let ib = self.node_index(b)?;
        Some(self.add_edge_between(ia, ib, edge))
    }

    fn add_edge_between(&mut self, ia: NodeIndex, ib: NodeIndex, edge: Edge) -> EdgeIndex {
        match self.graph.find_edge(ia, ib) {
            Some(ie) => {
                self.graph[ie].merge(edge);
                ie
            }
            None => self.graph.add_edge(ia, ib, edge),
        }
    }

    /// Merge `child` into this graph, renaming its nodes through `instance`
    /// and mapping its positions through `transform`.
    pub fn merge_subgraph(&mut self, instance: &str, transform: &Transform, child: RouteGraph) {
        let RouteGraph { graph, .. } = child;
        let (nodes, edges) = graph.into_nodes_edges();

        let renamed: Vec<NodeIndex> = nodes
            .into_iter()
            .map(|node| {
                let Node { name, position } = node.weight;
                self.add_node(
                    subinstance_node_name(instance, &name),
                    transform.apply(position),
                )
            })
            .collect();

        for edge in edges {
            self.add_edge_between(
                renamed[edge.source().index()],
                renamed[edge.target().index()],
                edge.weight,
            );
        }
    }

    pub fn node_index(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(&Symbol::from(name)).copied()
    }

    pub fn node(&self, ix: NodeIndex) -> &Node {
        &self.graph[ix]
    }

    pub fn position(&self, name: &str) -> Option<Point> {
        self.node_index(name).map(|ix| self.graph[ix].position)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node_index(name).is_some()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.graph.node_indices().map(move |ix| &self.graph[ix])
    }

    /// All edges as `(node, node, edge)` triples.
    pub fn edges(&self) -> impl Iterator<Item = (&Node, &Node, &Edge)> + '_ {
        self.graph.edge_references().map(move |e| {
            (
                &self.graph[e.source()],
                &self.graph[e.target()],
                e.weight(),
            )
        })
    }

    pub fn neighbors(&self, ix: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(ix)
    }

    pub fn degree(&self, ix: NodeIndex) -> usize {
        self.graph.neighbors(ix).count()
    }

    /// The edge joining two adjacent nodes.
    pub fn edge_between(&self, a: NodeIndex, b: NodeIndex) -> Option<&Edge> {
        self.graph.find_edge(a, b).map(|ie| &self.graph[ie])
    }

    /// Look an edge up by node names.
    pub fn edge(&self, a: &str, b: &str) -> Option<&Edge> {
        self.edge_between(self.node_index(a)?, self.node_index(b)?)
    }

    /// Node sets of the connected components.
    ///
    /// Nodes within a component and the components themselves are ordered by
    /// node insertion.
    pub fn connected_components(&self) -> Vec<Vec<NodeIndex>> {
        // strongly connected components of an undirected graph are its
        // connected components
        let mut components = algo::tarjan_scc(&self.graph);
        for component in components.iter_mut() {
            component.sort_unstable();
        }
        components.sort_unstable_by_key(|component| component[0]);
        components
    }

    /// Underlying petgraph graph, e.g. for DOT export.
    pub fn inner(&self) -> &UnGraph<Node, Edge> {
        &self.graph
    }
}
