//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod actuator;
pub mod audit_log;
pub mod capability;
pub mod lease;
pub mod memory;
pub mod notifier;
pub mod observation;
pub mod persistence;
pub mod reasoning_provider;
pub mod voter;
