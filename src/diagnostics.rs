//! Non-fatal findings reported while flattening a hierarchy.
//!
//! The graph builder never logs warnings itself; it hands them to a
//! [`Diagnostics`] sink supplied by the caller. [`LogSink`] forwards them to the
//! `log` facade, [`CollectingSink`] keeps them for inspection.

use crate::Symbol;
use std::fmt;
use std::sync::Mutex;

/// A recoverable problem in the input hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// An instance that is neither a routing segment nor has a netlist of its
    /// own; its internal links are ignored.
    OrphanInstance {
        circuit: Symbol,
        instance: Symbol,
        component: Symbol,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::OrphanInstance {
                circuit,
                instance,
                component,
            } => write!(
                f,
                "ignoring any links in {} ({}) of circuit {}",
                instance, component, circuit
            ),
        }
    }
}

/// Receiver for warnings. Shared between the threads expanding sibling
/// instances, hence `Sync`.
pub trait Diagnostics: Sync {
    fn warn(&self, warning: Warning);
}

/// Forwards every warning to `log::warn!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl Diagnostics for LogSink {
    fn warn(&self, warning: Warning) {
        log::warn!("{}", warning);
    }
}

/// Records warnings in arrival order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    warnings: Mutex<Vec<Warning>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the warnings received so far.
    pub fn warnings(&self) -> Vec<Warning> {
        match self.warnings.lock() {
            Ok(warnings) => warnings.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.warnings().is_empty()
    }
}

impl Diagnostics for CollectingSink {
    fn warn(&self, warning: Warning) {
        match self.warnings.lock() {
            Ok(mut warnings) => warnings.push(warning),
            Err(poisoned) => poisoned.into_inner().push(warning),
        }
    }
}
