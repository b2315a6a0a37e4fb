//! Alert state registry
//!
//! Tracks the current severity of every named condition reported by
//! scripts and detects level transitions.

pub mod model;
pub mod registry;

pub use model::{Alert, Level, ParseLevelError};
pub use registry::{AlertRef, AlertRegistry, RegistryError, ReportOutcome};
