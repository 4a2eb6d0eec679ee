//! Incremental composition of routes from two-port segments.
//!
//! A [`ComposedRoute`] grows one segment (or one whole route) at a time from
//! either of its two free ends, keeping a running length. It complements the
//! graph-based measurement when a route is being assembled piece by piece and
//! its length is needed before the enclosing circuit exists.
//!
//! ```
//! use pathlen::compose::ComposedRoute;
//! use pathlen::graph::PortRef;
//! use pathlen::netlist::Instance;
//!
//! let wg = |len: f64| {
//!     Instance::new("straight")
//!         .with_port("o1", (0.0, 0.0))
//!         .with_port("o2", (len, 0.0))
//!         .with_info("route_info_length", len)
//! };
//!
//! let mut route = ComposedRoute::from_segment("w1", &wg(100.0), "o1", "o2").unwrap();
//! route
//!     .add_segment("w2", &wg(20.0), "o1", "o2", Some(&PortRef::new("w1", "o2")))
//!     .unwrap();
//!
//! assert_eq!(route.length(), 120.0);
//! assert_eq!(route.ends().unwrap().1, &PortRef::new("w2", "o2"));
//! ```

use crate::Symbol;
use crate::graph::{PortRef, RouteInfo};
use crate::netlist::Instance;
use std::collections::VecDeque;
use std::{error::Error, fmt};

/// Errors raised while composing routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    /// The segment has no numeric `route_info_length`.
    MissingLength(Symbol),
    /// The segment does not declare the requested port.
    UnknownPort { segment: Symbol, port: Symbol },
    /// The segment would be entered and left through the same port.
    SamePort { segment: Symbol, port: Symbol },
    /// A non-empty route was extended without naming where.
    MissingDestination,
    /// The destination is not one of the route's free ends.
    InvalidDestination(PortRef),
    /// The attaching port is not a free end of the appended route.
    InvalidAttachment(PortRef),
    /// An empty route was appended.
    EmptyRoute,
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeError::MissingLength(segment) => {
                write!(f, "segment \"{}\" has no numeric length", segment)
            }
            ComposeError::UnknownPort { segment, port } => {
                write!(f, "segment \"{}\" has no port \"{}\"", segment, port)
            }
            ComposeError::SamePort { segment, port } => write!(
                f,
                "segment \"{}\" cannot be entered and left through port \"{}\"",
                segment, port
            ),
            ComposeError::MissingDestination => write!(f, "destination port is missing"),
            ComposeError::InvalidDestination(port) => {
                write!(f, "destination port {} is not an end of the route", port)
            }
            ComposeError::InvalidAttachment(port) => {
                write!(f, "port {} is not an end of the appended route", port)
            }
            ComposeError::EmptyRoute => write!(f, "cannot append an empty route"),
        }
    }
}

impl Error for ComposeError {}

/// A chain of routing segments with two free ends.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComposedRoute {
    segments: VecDeque<Symbol>,
    ends: Option<(PortRef, PortRef)>,
    length: f64,
}

impl ComposedRoute {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route made of a single segment, running from `entry` to `exit`.
    pub fn from_segment(
        name: &str,
        segment: &Instance,
        entry: &str,
        exit: &str,
    ) -> Result<Self, ComposeError> {
        let mut route = Self::new();
        route.add_segment(name, segment, entry, exit, None)?;
        Ok(route)
    }

    /// Attach `segment` by its `entry` port to the free end `destination`;
    /// its `exit` port becomes the new free end on that side.
    ///
    /// The first segment of an empty route needs no destination.
    pub fn add_segment(
        &mut self,
        name: &str,
        segment: &Instance,
        entry: &str,
        exit: &str,
        destination: Option<&PortRef>,
    ) -> Result<(), ComposeError> {
        let name = Symbol::from(name);
        for port in [entry, exit] {
            if !segment.ports.contains_key(port) {
                return Err(ComposeError::UnknownPort {
                    segment: name,
                    port: port.into(),
                });
            }
        }
        if entry == exit {
            return Err(ComposeError::SamePort {
                segment: name,
                port: entry.into(),
            });
        }
        let length = RouteInfo::from_info(&segment.info)
            .and_then(|route| route.length)
            .ok_or_else(|| ComposeError::MissingLength(name.clone()))?;

        let entry = PortRef::new(name.clone(), entry);
        let exit = PortRef::new(name.clone(), exit);

        match (self.ends.take(), destination) {
            (None, _) => {
                self.ends = Some((entry, exit));
                self.segments.push_back(name);
            }
            (Some(ends), None) => {
                self.ends = Some(ends);
                return Err(ComposeError::MissingDestination);
            }
            (Some((front, back)), Some(destination)) => {
                if *destination == front {
                    self.ends = Some((exit, back));
                    self.segments.push_front(name);
                } else if *destination == back {
                    self.ends = Some((front, exit));
                    self.segments.push_back(name);
                } else {
                    self.ends = Some((front, back));
                    return Err(ComposeError::InvalidDestination(destination.clone()));
                }
            }
        }

        self.length += length;
        Ok(())
    }

    /// Join `other` to this route: its free end `attach` meets our free end
    /// `destination`, and its opposite end replaces `destination`.
    ///
    /// Appending to an empty route adopts `other` unchanged.
    pub fn append(
        &mut self,
        other: ComposedRoute,
        attach: &PortRef,
        destination: &PortRef,
    ) -> Result<(), ComposeError> {
        let (other_front, other_back) = other.ends.clone().ok_or(ComposeError::EmptyRoute)?;

        let Some((front, back)) = self.ends.clone() else {
            *self = other;
            return Ok(());
        };

        // `far` is the end of `other` that stays free after joining
        let (far, mut incoming) = if *attach == other_front {
            (other_back, other.segments)
        } else if *attach == other_back {
            (other_front, other.segments.into_iter().rev().collect())
        } else {
            return Err(ComposeError::InvalidAttachment(attach.clone()));
        };

        if *destination == back {
            self.segments.append(&mut incoming);
            self.ends = Some((front, far));
        } else if *destination == front {
            while let Some(segment) = incoming.pop_front() {
                self.segments.push_front(segment);
            }
            self.ends = Some((far, back));
        } else {
            return Err(ComposeError::InvalidDestination(destination.clone()));
        }

        self.length += other.length;
        Ok(())
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// The two free ends, `None` while empty.
    pub fn ends(&self) -> Option<(&PortRef, &PortRef)> {
        self.ends.as_ref().map(|(front, back)| (front, back))
    }

    /// Segment names from the first end to the second.
    pub fn segments(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.segments.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_none()
    }
}
