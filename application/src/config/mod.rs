//! Application-level configuration.
//!
//! - [`ReasoningParams`] - reasoning loop ceilings and recall size
//! - [`LifecycleParams`] - grace period, lease, validation and learning schedules
//! - [`ConsensusParams`] - voting policy and voter timeout
//! - [`FleetConfig`] - container of the above plus the memory policy

pub mod consensus_params;
pub mod fleet_config;
pub mod lifecycle_params;
pub mod reasoning_params;

pub use consensus_params::ConsensusParams;
pub use fleet_config::FleetConfig;
pub use lifecycle_params::LifecycleParams;
pub use reasoning_params::ReasoningParams;
