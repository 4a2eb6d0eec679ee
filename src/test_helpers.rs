//! Netlist fixtures shared by the unit tests.

use crate::geometry::Point;
use crate::graph::{PortRef, ROUTE_LENGTH_KEY};
use crate::netlist::{Instance, Netlist};

/// Two-port routing instance `component` with ports `o1` at `a` and `o2` at `b`.
pub fn segment(component: &str, length: f64, a: Point, b: Point) -> Instance {
    Instance::new(component)
        .with_port("o1", a)
        .with_port("o2", b)
        .with_info(ROUTE_LENGTH_KEY, length)
}

/// Straight waveguide of `length` starting at `start` and heading along +x.
pub fn straight(length: f64, start: Point) -> Instance {
    segment(
        "straight",
        length,
        start,
        Point::new(start.x + length, start.y),
    )
}

/// Plain two-port instance without routing attributes.
pub fn device(component: &str, a: Point, b: Point) -> Instance {
    Instance::new(component).with_port("o1", a).with_port("o2", b)
}

/// Straights `s0..sN` laid end to end from the origin, each `o2` wired to the
/// next `o1`, exposing `in` (on `s0,o1`) and `out` (on the last `o2`).
pub fn chain(lengths: &[f64]) -> Netlist {
    let mut netlist = Netlist::new();
    let mut x = 0.0;

    for (i, &length) in lengths.iter().enumerate() {
        netlist = netlist.with_instance(format!("s{}", i), straight(length, Point::new(x, 0.0)));
        if i > 0 {
            netlist = netlist.with_connection(
                PortRef::new(format!("s{}", i - 1).as_str(), "o2"),
                PortRef::new(format!("s{}", i).as_str(), "o1"),
            );
        }
        x += length;
    }

    if !lengths.is_empty() {
        netlist = netlist
            .with_port("in", PortRef::new("s0", "o1"))
            .with_port(
                "out",
                PortRef::new(format!("s{}", lengths.len() - 1).as_str(), "o2"),
            );
    }

    netlist
}
