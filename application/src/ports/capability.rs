//! Capability port
//!
//! Defines the interface for invoking the read-only tools the reasoning loop
//! can call. Name resolution happens in the domain
//! ([`Capability::parse`](fleet_domain::Capability::parse)); this port only
//! runs an already-typed capability.

use async_trait::async_trait;
use fleet_domain::{AgentId, Archetype, Capability, CapabilityError, CapabilityName, MarketSnapshot};

/// What a capability may know about its caller
pub struct CapabilityContext<'a> {
    pub agent_id: &'a AgentId,
    pub archetype: Archetype,
    /// Latest observation of the session
    pub observation: &'a MarketSnapshot,
    pub balance: f64,
}

/// Port for capability execution
#[async_trait]
pub trait CapabilityPort: Send + Sync {
    /// Capabilities this deployment can serve
    fn available(&self) -> Vec<CapabilityName>;

    /// Run a capability; the output is text for the next prompt
    async fn invoke(
        &self,
        context: &CapabilityContext<'_>,
        capability: &Capability,
    ) -> Result<String, CapabilityError>;
}
