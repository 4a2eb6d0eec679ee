//! YAML hierarchy dumps.
//!
//! The layout host writes one document per design:
//!
//! ```yaml
//! top: mzi
//! circuits:
//!   mzi:
//!     instances:
//!       wg1:
//!         component: straight
//!         info: { route_info_length: 100.0, route_info_type: xs_sc }
//!         ports: { o1: [0, 0], o2: [100, 0] }
//!       arm:
//!         component: arm
//!         transform: { origin: [100, 0], rotation: 90, mirror: false }
//!         ports: { o1: [100, 0], o2: [100, 50] }
//!     connections:
//!       wg1,o2: arm,o1
//!     ports:
//!       in: wg1,o1
//!   arm:
//!     instances: {}
//! ```
//!
//! Instance port positions are given in the frame of the circuit that
//! contains the instance; `transform` maps the instance's own circuit frame
//! into that frame.

use super::NetlistSet;
use serde::Deserialize;
use std::{error::Error, fmt};

/// A parsed hierarchy dump.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NetlistDocument {
    /// Circuit measured when no other is requested.
    pub top: String,
    pub circuits: NetlistSet,
}

/// Error Response of [`parse`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetlistError {
    SyntaxError(String),
    UndefinedTop(String),
}

impl fmt::Display for NetlistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetlistError::SyntaxError(err) => write!(f, "{}", err),
            NetlistError::UndefinedTop(name) => {
                write!(f, "Top circuit \"{}\" has no netlist", name)
            }
        }
    }
}

impl Error for NetlistError {}

impl From<serde_yaml::Error> for NetlistError {
    fn from(err: serde_yaml::Error) -> Self {
        NetlistError::SyntaxError(format!("{}", err))
    }
}

/// Parse a YAML hierarchy dump.
pub fn parse(input: &str) -> Result<NetlistDocument, NetlistError> {
    let document: NetlistDocument = serde_yaml::from_str(input)?;

    if !document.circuits.contains(&document.top) {
        return Err(NetlistError::UndefinedTop(document.top));
    }

    Ok(document)
}
