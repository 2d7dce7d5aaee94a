//! Lease tables
//!
//! [`InMemoryLeaseTable`] is shared by every holder in one process.
//! [`FileLeaseService`] excludes processes on one host through a shared
//! directory. A multi-host deployment puts a shared store behind the same
//! [`LeaseService`] port.

mod file;

pub use file::FileLeaseService;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use fleet_application::ports::lease::{LeaseError, LeaseService};
use fleet_domain::AgentId;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct LeaseEntry {
    holder: String,
    expires_at: Instant,
}

impl LeaseEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

pub struct InMemoryLeaseTable {
    entries: DashMap<AgentId, LeaseEntry>,
    ttl: Duration,
}

impl InMemoryLeaseTable {
    pub fn new(ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            entries: DashMap::new(),
            ttl,
        })
    }

    /// A [`LeaseService`] acting for `holder`
    pub fn holder(self: &Arc<Self>, holder: impl Into<String>) -> InMemoryLease {
        InMemoryLease {
            table: Arc::clone(self),
            holder: holder.into(),
        }
    }

    /// Current live holder of an agent's lease
    pub fn holder_of(&self, agent_id: &AgentId) -> Option<String> {
        let now = Instant::now();
        self.entries
            .get(agent_id)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.holder.clone())
    }

    fn acquire(&self, agent_id: &AgentId, holder: &str) -> bool {
        let now = Instant::now();
        let fresh = LeaseEntry {
            holder: holder.to_string(),
            expires_at: now + self.ttl,
        };
        match self.entries.entry(agent_id.clone()) {
            Entry::Occupied(mut slot) => {
                let current = slot.get();
                if current.is_live(now) && current.holder != holder {
                    return false;
                }
                if current.holder != holder {
                    debug!(agent_id = %agent_id, previous = %current.holder, "Taking over expired lease");
                }
                slot.insert(fresh);
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                true
            }
        }
    }

    fn renew(&self, agent_id: &AgentId, holder: &str) -> bool {
        let now = Instant::now();
        match self.entries.get_mut(agent_id) {
            Some(mut entry) if entry.holder == holder && entry.is_live(now) => {
                entry.expires_at = now + self.ttl;
                true
            }
            _ => false,
        }
    }

    fn release(&self, agent_id: &AgentId, holder: &str) {
        self.entries
            .remove_if(agent_id, |_, entry| entry.holder == holder);
    }
}

/// One holder's handle on an [`InMemoryLeaseTable`]
pub struct InMemoryLease {
    table: Arc<InMemoryLeaseTable>,
    holder: String,
}

#[async_trait]
impl LeaseService for InMemoryLease {
    fn holder(&self) -> &str {
        &self.holder
    }

    async fn try_acquire(&self, agent_id: &AgentId) -> Result<bool, LeaseError> {
        Ok(self.table.acquire(agent_id, &self.holder))
    }

    async fn renew(&self, agent_id: &AgentId) -> Result<bool, LeaseError> {
        Ok(self.table.renew(agent_id, &self.holder))
    }

    async fn release(&self, agent_id: &AgentId) -> Result<(), LeaseError> {
        self.table.release(agent_id, &self.holder);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> AgentId {
        AgentId::new("alpha")
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_holder_at_a_time() {
        let table = InMemoryLeaseTable::new(Duration::from_secs(30));
        let a = table.holder("a");
        let b = table.holder("b");

        assert!(a.try_acquire(&agent()).await.unwrap());
        assert!(a.try_acquire(&agent()).await.unwrap());
        assert!(!b.try_acquire(&agent()).await.unwrap());
        assert_eq!(table.holder_of(&agent()).as_deref(), Some("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lease_can_be_taken_over() {
        let table = InMemoryLeaseTable::new(Duration::from_secs(30));
        let a = table.holder("a");
        let b = table.holder("b");
        assert!(a.try_acquire(&agent()).await.unwrap());

        tokio::time::advance(Duration::from_secs(31)).await;

        assert_eq!(table.holder_of(&agent()), None);
        assert!(b.try_acquire(&agent()).await.unwrap());
        // the former holder learns it lost the lease on its next renewal
        assert!(!a.renew(&agent()).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_renewal_extends_the_lease() {
        let table = InMemoryLeaseTable::new(Duration::from_secs(30));
        let a = table.holder("a");
        let b = table.holder("b");
        assert!(a.try_acquire(&agent()).await.unwrap());

        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(a.renew(&agent()).await.unwrap());
        tokio::time::advance(Duration::from_secs(20)).await;

        assert!(!b.try_acquire(&agent()).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_leaves_foreign_lease_alone() {
        let table = InMemoryLeaseTable::new(Duration::from_secs(30));
        let a = table.holder("a");
        let b = table.holder("b");
        assert!(a.try_acquire(&agent()).await.unwrap());

        b.release(&agent()).await.unwrap();
        assert_eq!(table.holder_of(&agent()).as_deref(), Some("a"));

        a.release(&agent()).await.unwrap();
        assert_eq!(table.holder_of(&agent()), None);
        assert!(b.try_acquire(&agent()).await.unwrap());
    }
}
