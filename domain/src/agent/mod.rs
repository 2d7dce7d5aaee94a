//! Agent domain - who an agent is and what it has done so far.
//!
//! - [`config::AgentConfig`] - identity, archetype, weights, limits
//! - [`archetype::Archetype`] - behavioral preset
//! - [`weights::SignalWeights`] - normalized signal weights
//! - [`runtime_state::AgentRuntimeState`] - per (agent, target) counters
//! - [`validation::ConfigIssue`] - structured configuration issues

pub mod archetype;
pub mod config;
pub mod runtime_state;
pub mod validation;
pub mod weights;
