//! Capability registry and built-in handlers

mod builtin;
mod registry;

pub use builtin::{MemorySearchHandler, ObservationHandler, RiskHandler};
pub use registry::{CapabilityHandler, CapabilityRegistry};
