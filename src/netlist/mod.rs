//! Hierarchical netlist model consumed by the graph builder.
//!
//! A [`Netlist`] describes one circuit: the instances it contains, the
//! pairwise connections between their ports and the ports it exposes. An
//! instance whose component type has a netlist of its own is a composite and
//! gets expanded recursively; an instance carrying a `route_info_length`
//! attribute is an atomic routing segment.
//!
//! Netlists are looked up by circuit name through a [`NetlistProvider`].
//! [`NetlistSet`] is the in-memory provider, filled by hand or loaded from the
//! YAML hierarchy dump handled by [`yaml`].

pub mod yaml;

use crate::geometry::{Point, Transform};
use crate::graph::PortRef;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Scalar attribute value reported by the layout host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_owned())
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Number(value) => write!(f, "{}", value),
            AttrValue::Bool(value) => write!(f, "{}", value),
            AttrValue::Text(value) => write!(f, "{}", value),
        }
    }
}

/// A placed instance of a component inside a circuit.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Instance {
    /// Component type; doubles as the circuit name of composite instances.
    pub component: String,
    /// Port positions in the containing circuit's frame.
    #[serde(default)]
    pub ports: BTreeMap<String, Point>,
    /// Embedding of the component's own frame into the containing circuit.
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub info: BTreeMap<String, AttrValue>,
}

impl Instance {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            ..Default::default()
        }
    }

    pub fn with_port(mut self, name: impl Into<String>, position: impl Into<Point>) -> Self {
        self.ports.insert(name.into(), position.into());
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }
}

/// Connectivity of a single circuit.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Netlist {
    pub instances: BTreeMap<String, Instance>,
    pub connections: BTreeMap<PortRef, PortRef>,
    /// Exposed port name -> internal instance port.
    pub ports: BTreeMap<String, PortRef>,
}

impl Netlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instance(mut self, name: impl Into<String>, instance: Instance) -> Self {
        self.instances.insert(name.into(), instance);
        self
    }

    pub fn with_connection(mut self, a: PortRef, b: PortRef) -> Self {
        self.connections.insert(a, b);
        self
    }

    pub fn with_port(mut self, name: impl Into<String>, internal: PortRef) -> Self {
        self.ports.insert(name.into(), internal);
        self
    }
}

/// Source of netlists for every circuit reachable from a top circuit.
///
/// Circuit names must be unique across the hierarchy.
pub trait NetlistProvider: Sync {
    fn netlist(&self, circuit: &str) -> Option<&Netlist>;
}

/// In-memory netlists keyed by circuit name.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(transparent)]
pub struct NetlistSet {
    circuits: HashMap<String, Netlist>,
}

impl NetlistSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, circuit: impl Into<String>, netlist: Netlist) -> Option<Netlist> {
        self.circuits.insert(circuit.into(), netlist)
    }

    pub fn with(mut self, circuit: impl Into<String>, netlist: Netlist) -> Self {
        self.insert(circuit, netlist);
        self
    }

    pub fn contains(&self, circuit: &str) -> bool {
        self.circuits.contains_key(circuit)
    }

    pub fn len(&self) -> usize {
        self.circuits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
    }
}

impl NetlistProvider for NetlistSet {
    fn netlist(&self, circuit: &str) -> Option<&Netlist> {
        self.circuits.get(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_fill_the_model() {
        let netlist = Netlist::new()
            .with_instance(
                "wg",
                Instance::new("straight")
                    .with_port("o1", (0.0, 0.0))
                    .with_port("o2", (10.0, 0.0))
                    .with_info("route_info_length", 10.0),
            )
            .with_port("in", PortRef::new("wg", "o1"));

        let wg = &netlist.instances["wg"];
        assert_eq!(wg.ports.len(), 2);
        assert_eq!(wg.info["route_info_length"].as_f64(), Some(10.0));
        assert_eq!(wg.transform, Transform::IDENTITY);
        assert_eq!(netlist.ports["in"].to_string(), "wg,o1");
    }

    #[test]
    fn netlist_set_is_a_provider() {
        let set = NetlistSet::new().with("top", Netlist::new());
        assert!(set.netlist("top").is_some());
        assert!(set.netlist("other").is_none());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn attr_value_accessors() {
        assert_eq!(AttrValue::from(2.5).as_f64(), Some(2.5));
        assert_eq!(AttrValue::from("x").as_f64(), None);
        assert_eq!(AttrValue::Bool(true).to_string(), "true");
    }
}
