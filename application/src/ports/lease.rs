//! Lease service port
//!
//! The fleet-wide mutual-exclusion primitive: at most one process holds the
//! lease of an agent at any instant. Leases expire on their own if never
//! released, so a crashed holder cannot block the agent forever.

use async_trait::async_trait;
use fleet_domain::AgentId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LeaseError {
    #[error("Lock service unavailable: {0}")]
    Unavailable(String),

    #[error("Lock service error: {0}")]
    Backend(String),
}

/// Port for the lock service
///
/// Each implementation instance acts on behalf of one holder (process).
#[async_trait]
pub trait LeaseService: Send + Sync {
    /// Identity of the holder this instance acts for
    fn holder(&self) -> &str;

    /// Take the lease if it is free or expired. `Ok(false)` when another
    /// holder owns a live lease.
    async fn try_acquire(&self, agent_id: &AgentId) -> Result<bool, LeaseError>;

    /// Extend a lease this holder owns. `Ok(false)` when the lease was lost.
    async fn renew(&self, agent_id: &AgentId) -> Result<bool, LeaseError>;

    /// Release a lease this holder owns; a lease held by someone else is
    /// left untouched.
    async fn release(&self, agent_id: &AgentId) -> Result<(), LeaseError>;
}
