//! Recursive flattening of a circuit hierarchy into a [`RouteGraph`].
//!
//! For one circuit the builder:
//!
//! 1. Adds a node `instance,port` for every port of every instance, at the
//!    position reported in the circuit's own frame.
//! 2. Adds a zero-length connection edge for every declared connection.
//! 3. For every instance:
//!    - a routing segment (has `route_info_length`) becomes one edge between
//!      its two port nodes carrying its [`RouteInfo`];
//!    - a composite (its component has a netlist) is flattened recursively,
//!      renamed through the instance name, transformed into this frame and
//!      merged;
//!    - anything else is reported to the [`Diagnostics`] sink and left
//!      unexpanded.
//! 4. Adds a node for every exposed port, joined to the internal port it
//!    stands for.
//!
//! Sibling composites are expanded in parallel and merged in declaration
//! order, so the result does not depend on scheduling.

use super::{Edge, GraphError, RouteGraph, RouteInfo, link_name};
use crate::Symbol;
use crate::diagnostics::{Diagnostics, Warning};
use crate::netlist::{Instance, Netlist, NetlistProvider};
use rayon::prelude::*;

/// Circuits currently being expanded, innermost first.
///
/// Each recursion level extends the chain by value; nothing is shared or
/// mutated between sibling branches.
#[derive(Debug, Clone, Copy)]
struct Ancestry<'a> {
    circuit: &'a str,
    parent: Option<&'a Ancestry<'a>>,
}

impl<'a> Ancestry<'a> {
    fn root(circuit: &'a str) -> Self {
        Self {
            circuit,
            parent: None,
        }
    }

    fn child(&'a self, circuit: &'a str) -> Self {
        Self {
            circuit,
            parent: Some(self),
        }
    }

    fn contains(&self, circuit: &str) -> bool {
        let mut level = Some(self);
        while let Some(ancestry) = level {
            if ancestry.circuit == circuit {
                return true;
            }
            level = ancestry.parent;
        }
        false
    }
}

/// How a single instance contributes to its circuit's graph.
enum Expansion<'a> {
    Segment(Edge),
    Composite(&'a Netlist),
    Orphan,
}

/// Flatten `circuit` and everything below it into one graph.
///
/// # Errors
///
/// - [`GraphError::UnknownCircuit`] if the provider has no netlist for `circuit`.
/// - [`GraphError::WrongPortCount`] if a routing instance does not have two ports.
/// - [`GraphError::UnknownPort`] if a connection or exposed port names an
///   undeclared port.
/// - [`GraphError::CyclicHierarchy`] if the hierarchy contains itself.
///
/// Missing sub-netlists are not errors; they are reported to `diagnostics`.
///
/// # Example
///
/// ```
/// use pathlen::diagnostics::LogSink;
/// use pathlen::graph::{PortRef, build_graph};
/// use pathlen::netlist::{Instance, Netlist, NetlistSet};
///
/// let top = Netlist::new()
///     .with_instance(
///         "wg",
///         Instance::new("straight")
///             .with_port("o1", (0.0, 0.0))
///             .with_port("o2", (10.0, 0.0))
///             .with_info("route_info_length", 10.0),
///     )
///     .with_port("in", PortRef::new("wg", "o1"));
/// let netlists = NetlistSet::new().with("top", top);
///
/// let graph = build_graph(&netlists, "top", &LogSink).unwrap();
/// assert_eq!(graph.node_count(), 3);
/// assert_eq!(graph.edge("wg,o1", "wg,o2").unwrap().length(), 10.0);
/// ```
pub fn build_graph<P, D>(
    provider: &P,
    circuit: &str,
    diagnostics: &D,
) -> Result<RouteGraph, GraphError>
where
    P: NetlistProvider + ?Sized,
    D: Diagnostics + ?Sized,
{
    let netlist = provider
        .netlist(circuit)
        .ok_or_else(|| GraphError::UnknownCircuit(circuit.into()))?;

    build_circuit(
        provider,
        circuit,
        netlist,
        Ancestry::root(circuit),
        diagnostics,
    )
}

fn build_circuit<P, D>(
    provider: &P,
    circuit: &str,
    netlist: &Netlist,
    ancestry: Ancestry<'_>,
    diagnostics: &D,
) -> Result<RouteGraph, GraphError>
where
    P: NetlistProvider + ?Sized,
    D: Diagnostics + ?Sized,
{
    log::debug!(
        "flattening circuit {} ({} instances, {} connections, {} ports)",
        circuit,
        netlist.instances.len(),
        netlist.connections.len(),
        netlist.ports.len()
    );

    let mut graph = RouteGraph::new();

    for (name, instance) in &netlist.instances {
        for (port, &position) in &instance.ports {
            graph.add_node(format!("{},{}", name, port), position);
        }
    }

    // Connections and exposed ports may only name ports declared on this
    // circuit's own instances.
    let referenced = netlist
        .connections
        .iter()
        .flat_map(|(a, b)| [a, b])
        .chain(netlist.ports.values());
    for port in referenced {
        let name = port.to_string();
        if !graph.contains(&name) {
            return Err(unknown_port(circuit, &name));
        }
    }

    for (a, b) in &netlist.connections {
        if a != b {
            graph.add_edge(&a.to_string(), &b.to_string(), Edge::connection());
        }
    }

    let mut composites = Vec::new();
    for (name, instance) in &netlist.instances {
        match classify(provider, circuit, name, instance)? {
            Expansion::Segment(edge) => {
                let mut ports = instance.ports.keys();
                if let (Some(a), Some(b)) = (ports.next(), ports.next()) {
                    graph.add_edge(
                        &format!("{},{}", name, a),
                        &format!("{},{}", name, b),
                        edge,
                    );
                }
            }
            Expansion::Composite(sub_netlist) => {
                if ancestry.contains(&instance.component) {
                    return Err(GraphError::CyclicHierarchy {
                        circuit: instance.component.as_str().into(),
                        instance: name.as_str().into(),
                    });
                }
                composites.push((name, instance, sub_netlist));
            }
            Expansion::Orphan => diagnostics.warn(Warning::OrphanInstance {
                circuit: circuit.into(),
                instance: name.as_str().into(),
                component: instance.component.as_str().into(),
            }),
        }
    }

    let subgraphs = composites
        .par_iter()
        .map(|&(name, instance, sub_netlist)| {
            log::debug!("expanding {} ({}) in {}", name, instance.component, circuit);
            build_circuit(
                provider,
                &instance.component,
                sub_netlist,
                ancestry.child(&instance.component),
                diagnostics,
            )
            .map(|subgraph| (name, instance, subgraph))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (name, instance, subgraph) in subgraphs {
        graph.merge_subgraph(name, &instance.transform, subgraph);
    }

    for (exposed, internal) in &netlist.ports {
        let internal = internal.to_string();
        let position = graph
            .position(&internal)
            .ok_or_else(|| unknown_port(circuit, &internal))?;
        graph.add_node(exposed.as_str(), position);
        graph.add_edge(exposed, &internal, Edge::connection());
    }

    Ok(graph)
}

fn classify<'a, P>(
    provider: &'a P,
    circuit: &str,
    name: &str,
    instance: &Instance,
) -> Result<Expansion<'a>, GraphError>
where
    P: NetlistProvider + ?Sized,
{
    if let Some(route) = RouteInfo::from_info(&instance.info) {
        let link = link_name(instance.ports.keys().map(String::as_str)).ok_or_else(|| {
            GraphError::WrongPortCount {
                instance: name.into(),
                count: instance.ports.len(),
            }
        })?;
        log::trace!("routing segment {} ({}) in {}", name, link, circuit);
        let route = route.with_component(instance.component.as_str());
        return Ok(Expansion::Segment(Edge::routing(link, route)));
    }

    Ok(match provider.netlist(&instance.component) {
        Some(netlist) => Expansion::Composite(netlist),
        None => Expansion::Orphan,
    })
}

fn unknown_port(circuit: &str, port: &str) -> GraphError {
    GraphError::UnknownPort {
        circuit: Symbol::from(circuit),
        port: port.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::geometry::{Point, Transform};
    use crate::graph::PortRef;
    use crate::netlist::NetlistSet;
    use crate::test_helpers::*;

    #[test]
    fn single_segment() {
        let netlists = NetlistSet::new().with(
            "top",
            Netlist::new().with_instance("wg", straight(25.0, Point::ORIGIN)),
        );
        let sink = CollectingSink::new();
        let g = build_graph(&netlists, "top", &sink).unwrap();

        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        let edge = g.edge("wg,o1", "wg,o2").unwrap();
        assert_eq!(edge.length(), 25.0);
        assert_eq!(edge.link.as_deref(), Some("o1:o2"));
        assert_eq!(
            edge.route.as_ref().unwrap().component.as_deref(),
            Some("straight")
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn connections_and_exposed_ports() {
        let netlists = NetlistSet::new().with("top", chain(&[10.0, 20.0]));
        let g = build_graph(&netlists, "top", &CollectingSink::new()).unwrap();

        // 4 instance ports + 2 exposed ports
        assert_eq!(g.node_count(), 6);
        // 2 segments + 1 connection + 2 boundary edges
        assert_eq!(g.edge_count(), 5);

        let link = g.edge("s0,o2", "s1,o1").unwrap();
        assert!(!link.is_routing());
        assert_eq!(link.length(), 0.0);

        assert_eq!(g.position("in"), g.position("s0,o1"));
        assert_eq!(g.position("out"), g.position("s1,o2"));
        assert!(g.edge("in", "s0,o1").is_some());
    }

    #[test]
    fn routing_instance_needs_two_ports() {
        let bad = Instance::new("taper")
            .with_port("o1", (0.0, 0.0))
            .with_port("o2", (1.0, 0.0))
            .with_port("o3", (2.0, 0.0))
            .with_info("route_info_length", 2.0);
        let netlists = NetlistSet::new().with("top", Netlist::new().with_instance("t", bad));

        assert_eq!(
            build_graph(&netlists, "top", &CollectingSink::new()).unwrap_err(),
            GraphError::WrongPortCount {
                instance: "t".into(),
                count: 3
            }
        );
    }

    #[test]
    fn unknown_top_circuit() {
        let netlists = NetlistSet::new();
        assert_eq!(
            build_graph(&netlists, "top", &CollectingSink::new()).unwrap_err(),
            GraphError::UnknownCircuit("top".into())
        );
    }

    #[test]
    fn connection_to_undeclared_port() {
        let netlist = Netlist::new()
            .with_instance("wg", straight(1.0, Point::ORIGIN))
            .with_connection(PortRef::new("wg", "o2"), PortRef::new("ghost", "o1"));
        let netlists = NetlistSet::new().with("top", netlist);

        assert!(matches!(
            build_graph(&netlists, "top", &CollectingSink::new()),
            Err(GraphError::UnknownPort { .. })
        ));
    }

    #[test]
    fn composite_ports_must_be_declared_on_the_instance() {
        // "c" declares no ports although its circuit exposes "in" and "out"
        let netlists = |top: Netlist| {
            NetlistSet::new()
                .with("cell", chain(&[5.0]))
                .with("top", top.with_instance("c", Instance::new("cell")))
        };
        let exposed = netlists(Netlist::new().with_port("p", PortRef::new("c", "in")));
        let connected = netlists(
            Netlist::new()
                .with_instance("wg", straight(1.0, Point::new(5.0, 0.0)))
                .with_connection(PortRef::new("c", "out"), PortRef::new("wg", "o1")),
        );

        for (netlists, port) in [(exposed, "c,in"), (connected, "c,out")] {
            assert_eq!(
                build_graph(&netlists, "top", &CollectingSink::new()).unwrap_err(),
                GraphError::UnknownPort {
                    circuit: "top".into(),
                    port: port.to_string()
                }
            );
        }
    }

    #[test]
    fn composite_is_renamed_and_stitched() {
        let netlists = NetlistSet::new()
            .with("cell", chain(&[5.0, 7.0]))
            .with(
                "top",
                Netlist::new()
                    .with_instance(
                        "c",
                        Instance::new("cell")
                            .with_port("in", (0.0, 0.0))
                            .with_port("out", (12.0, 0.0)),
                    )
                    .with_port("a", PortRef::new("c", "in")),
            );
        let g = build_graph(&netlists, "top", &CollectingSink::new()).unwrap();

        // child boundary ports land on the parent's instance ports
        assert!(g.edge("c,in", "c.s0,o1").is_some());
        assert!(g.edge("c,out", "c.s1,o2").is_some());
        assert_eq!(g.edge("c.s0,o1", "c.s0,o2").unwrap().length(), 5.0);
        assert!(g.edge("a", "c,in").is_some());
        assert!(!g.contains("in"));
        assert!(!g.contains("s0,o1"));
    }

    #[test]
    fn nested_composites_use_hierarchy_separator() {
        let netlists = NetlistSet::new()
            .with("leaf", chain(&[1.0]))
            .with(
                "mid",
                Netlist::new()
                    .with_instance("l", Instance::new("leaf").with_port("in", (0.0, 0.0)))
                    .with_port("p", PortRef::new("l", "in")),
            )
            .with(
                "top",
                Netlist::new().with_instance("m", Instance::new("mid").with_port("p", (0.0, 0.0))),
            );
        let g = build_graph(&netlists, "top", &CollectingSink::new()).unwrap();

        for name in ["m,p", "m.l,in", "m.l,out", "m.l.s0,o1", "m.l.s0,o2"] {
            assert!(g.contains(name), "missing node {}", name);
        }
        assert_eq!(g.edge("m.l.s0,o1", "m.l.s0,o2").unwrap().length(), 1.0);
    }

    #[test]
    fn composite_positions_are_transformed() {
        let transform = Transform::new(Point::new(100.0, 50.0), 90.0, false);
        let netlists = NetlistSet::new()
            .with(
                "cell",
                Netlist::new().with_instance("wg", straight(10.0, Point::ORIGIN)),
            )
            .with(
                "top",
                Netlist::new().with_instance("c", Instance::new("cell").with_transform(transform)),
            );
        let g = build_graph(&netlists, "top", &CollectingSink::new()).unwrap();

        assert_eq!(g.position("c.wg,o1"), Some(Point::new(100.0, 50.0)));
        assert_eq!(g.position("c.wg,o2"), Some(Point::new(100.0, 60.0)));
    }

    #[test]
    fn nested_transforms_compose() {
        let inner = Transform::new(Point::new(5.0, 0.0), 90.0, true);
        let outer = Transform::new(Point::new(-2.0, 7.0), 180.0, false);
        let netlists = NetlistSet::new()
            .with(
                "cell",
                Netlist::new().with_instance("wg", straight(10.0, Point::new(3.0, 4.0))),
            )
            .with(
                "mid",
                Netlist::new().with_instance("c", Instance::new("cell").with_transform(inner)),
            )
            .with(
                "top",
                Netlist::new().with_instance("m", Instance::new("mid").with_transform(outer)),
            );
        let g = build_graph(&netlists, "top", &CollectingSink::new()).unwrap();

        let expected = inner.then(&outer).apply(Point::new(13.0, 4.0));
        let actual = g.position("m.c.wg,o2").unwrap();
        assert!(actual.approx_eq(&expected), "{} != {}", actual, expected);
        assert!(actual.approx_eq(&Point::new(-11.0, -6.0)));
    }

    #[test]
    fn orphan_instance_warns() {
        let netlist = chain(&[3.0]).with_instance(
            "blackbox",
            Instance::new("mystery")
                .with_port("o1", (50.0, 0.0))
                .with_port("o2", (60.0, 0.0)),
        );
        let netlists = NetlistSet::new().with("top", netlist);
        let sink = CollectingSink::new();
        let g = build_graph(&netlists, "top", &sink).unwrap();

        assert!(g.contains("blackbox,o1"));
        assert!(g.edge("blackbox,o1", "blackbox,o2").is_none());
        assert_eq!(
            sink.warnings(),
            vec![Warning::OrphanInstance {
                circuit: "top".into(),
                instance: "blackbox".into(),
                component: "mystery".into(),
            }]
        );
    }

    #[test]
    fn self_referential_hierarchy_is_rejected() {
        let netlists = NetlistSet::new()
            .with("a", Netlist::new().with_instance("x", Instance::new("b")))
            .with("b", Netlist::new().with_instance("y", Instance::new("a")));

        assert_eq!(
            build_graph(&netlists, "a", &CollectingSink::new()).unwrap_err(),
            GraphError::CyclicHierarchy {
                circuit: "a".into(),
                instance: "y".into()
            }
        );
    }

    #[test]
    fn repeated_sibling_circuits_are_not_cycles() {
        let netlists = NetlistSet::new().with("cell", chain(&[2.0])).with(
            "top",
            Netlist::new()
                .with_instance("c1", Instance::new("cell"))
                .with_instance("c2", Instance::new("cell")),
        );
        let g = build_graph(&netlists, "top", &CollectingSink::new()).unwrap();
        assert!(g.contains("c1.s0,o1"));
        assert!(g.contains("c2.s0,o1"));
    }
}
