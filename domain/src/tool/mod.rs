//! Capability domain module
//!
//! Capabilities are the read-only tools the reasoning loop can call while it
//! thinks: market data lookups, indicator math, risk estimates and memory
//! search. None of them place orders.
//!
//! ```text
//! MetaAction::UseCapability { tool: "risk", args }
//!        │
//!        ▼  CapabilityName::resolve   ("risk" → estimate_risk)
//! Capability::EstimateRisk(EstimateRiskArgs)
//!        │
//!        ▼  CapabilityPort (application layer)
//! ToolOutcome { success, output }
//! ```
//!
//! Providers frequently invent near-miss tool names, so resolution accepts a
//! fixed set of aliases before giving up with
//! [`CapabilityError::UnknownCapability`].

pub mod capability;
pub mod indicators;
pub mod risk;

pub use capability::{
    Capability, CapabilityError, CapabilityName, ComputeIndicatorArgs, EstimateRiskArgs,
    FetchCandlesArgs, SearchMemoriesArgs, SearchNewsArgs, SearchWhalesArgs,
};
pub use indicators::Indicator;
pub use risk::RiskEstimate;
