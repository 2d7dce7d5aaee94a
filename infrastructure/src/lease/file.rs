//! File-based lease table for processes sharing one host
//!
//! One `<stem>.lease` file per agent holds the holder and a wall-clock
//! expiry. Every read-modify-write runs under an exclusive OS lock on
//! `<dir>/.lock`, so two processes can never both see a lease as free.

use crate::persistence::agent_file_stem;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use fleet_application::ports::lease::{LeaseError, LeaseService};
use fleet_domain::AgentId;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LeaseRecord {
    holder: String,
    expires_at: DateTime<Utc>,
}

impl LeaseRecord {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Clone, Copy)]
enum LeaseOp {
    Acquire,
    Renew,
    Release,
}

/// A [`LeaseService`] acting for one holder over a lease directory
pub struct FileLeaseService {
    dir: PathBuf,
    holder: String,
    ttl: Duration,
}

impl FileLeaseService {
    pub fn new(dir: impl Into<PathBuf>, holder: impl Into<String>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            holder: holder.into(),
            ttl,
        }
    }

    /// Current live holder of an agent's lease
    pub async fn holder_of(&self, agent_id: &AgentId) -> Result<Option<String>, LeaseError> {
        let path = self.path_for(agent_id);
        let now = Utc::now();
        blocking(move || Ok(read_record(&path)?.filter(|r| r.is_live(now)).map(|r| r.holder)))
            .await
    }

    fn path_for(&self, agent_id: &AgentId) -> PathBuf {
        self.dir.join(format!("{}.lease", agent_file_stem(agent_id)))
    }

    async fn apply(&self, agent_id: &AgentId, op: LeaseOp) -> Result<bool, LeaseError> {
        let ttl = TimeDelta::from_std(self.ttl).map_err(|e| LeaseError::Backend(e.to_string()))?;
        let dir = self.dir.clone();
        let path = self.path_for(agent_id);
        let holder = self.holder.clone();
        let agent_id = agent_id.clone();
        blocking(move || locked_apply(&dir, &path, &holder, &agent_id, ttl, op)).await
    }
}

async fn blocking<T: Send + 'static>(
    f: impl FnOnce() -> Result<T, LeaseError> + Send + 'static,
) -> Result<T, LeaseError> {
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| LeaseError::Backend(e.to_string()))?
}

fn unavailable(e: std::io::Error) -> LeaseError {
    LeaseError::Unavailable(e.to_string())
}

fn locked_apply(
    dir: &Path,
    path: &Path,
    holder: &str,
    agent_id: &AgentId,
    ttl: TimeDelta,
    op: LeaseOp,
) -> Result<bool, LeaseError> {
    std::fs::create_dir_all(dir).map_err(unavailable)?;
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(dir.join(".lock"))
        .map_err(unavailable)?;
    let mut lock = fd_lock::RwLock::new(lock_file);
    let _guard = lock.write().map_err(unavailable)?;

    let now = Utc::now();
    let current = read_record(path)?;
    let fresh = LeaseRecord {
        holder: holder.to_string(),
        expires_at: now + ttl,
    };
    match op {
        LeaseOp::Acquire => match current {
            Some(record) if record.is_live(now) && record.holder != holder => Ok(false),
            previous => {
                if let Some(record) = previous.filter(|r| r.holder != holder) {
                    debug!(agent_id = %agent_id, previous = %record.holder, "Taking over expired lease");
                }
                write_record(path, &fresh)?;
                Ok(true)
            }
        },
        LeaseOp::Renew => match current {
            Some(record) if record.is_live(now) && record.holder == holder => {
                write_record(path, &fresh)?;
                Ok(true)
            }
            _ => Ok(false),
        },
        LeaseOp::Release => {
            if current.is_some_and(|r| r.holder == holder) {
                match std::fs::remove_file(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(unavailable(e)),
                }
            }
            Ok(true)
        }
    }
}

/// A garbled lease file counts as expired.
fn read_record(path: &Path) -> Result<Option<LeaseRecord>, LeaseError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(unavailable(e)),
    };
    match serde_json::from_slice(&bytes) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            warn!(path = %path.display(), "Ignoring unreadable lease file: {}", e);
            Ok(None)
        }
    }
}

fn write_record(path: &Path, record: &LeaseRecord) -> Result<(), LeaseError> {
    let body = serde_json::to_vec(record).map_err(|e| LeaseError::Backend(e.to_string()))?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::fs::write(&tmp, body).map_err(unavailable)?;
    std::fs::rename(&tmp, path).map_err(unavailable)
}

#[async_trait]
impl LeaseService for FileLeaseService {
    fn holder(&self) -> &str {
        &self.holder
    }

    async fn try_acquire(&self, agent_id: &AgentId) -> Result<bool, LeaseError> {
        self.apply(agent_id, LeaseOp::Acquire).await
    }

    async fn renew(&self, agent_id: &AgentId) -> Result<bool, LeaseError> {
        self.apply(agent_id, LeaseOp::Renew).await
    }

    async fn release(&self, agent_id: &AgentId) -> Result<(), LeaseError> {
        self.apply(agent_id, LeaseOp::Release).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(30);

    fn agent() -> AgentId {
        AgentId::new("alpha")
    }

    #[tokio::test]
    async fn test_one_holder_at_a_time_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let a = FileLeaseService::new(dir.path(), "a", TTL);
        let b = FileLeaseService::new(dir.path(), "b", TTL);

        assert!(a.try_acquire(&agent()).await.unwrap());
        assert!(a.try_acquire(&agent()).await.unwrap());
        assert!(!b.try_acquire(&agent()).await.unwrap());
        assert!(a.renew(&agent()).await.unwrap());
        assert!(!b.renew(&agent()).await.unwrap());
        assert_eq!(b.holder_of(&agent()).await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_release_leaves_foreign_lease_alone() {
        let dir = tempfile::tempdir().unwrap();
        let a = FileLeaseService::new(dir.path(), "a", TTL);
        let b = FileLeaseService::new(dir.path(), "b", TTL);
        assert!(a.try_acquire(&agent()).await.unwrap());

        b.release(&agent()).await.unwrap();
        assert_eq!(a.holder_of(&agent()).await.unwrap().as_deref(), Some("a"));

        a.release(&agent()).await.unwrap();
        assert_eq!(a.holder_of(&agent()).await.unwrap(), None);
        assert!(b.try_acquire(&agent()).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_lease_can_be_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let a = FileLeaseService::new(dir.path(), "a", Duration::from_millis(50));
        let b = FileLeaseService::new(dir.path(), "b", TTL);
        assert!(a.try_acquire(&agent()).await.unwrap());

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(b.holder_of(&agent()).await.unwrap(), None);
        assert!(b.try_acquire(&agent()).await.unwrap());
        // the former holder learns it lost the lease on its next renewal
        assert!(!a.renew(&agent()).await.unwrap());
    }

    #[tokio::test]
    async fn test_garbled_lease_file_counts_as_free() {
        let dir = tempfile::tempdir().unwrap();
        let a = FileLeaseService::new(dir.path(), "a", TTL);
        std::fs::write(dir.path().join("alpha.lease"), "garbage").unwrap();

        assert!(a.try_acquire(&agent()).await.unwrap());
        assert_eq!(a.holder_of(&agent()).await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquires_have_a_single_winner() {
        let dir = tempfile::tempdir().unwrap();
        let attempts: Vec<_> = (0..8)
            .map(|i| {
                let lease = FileLeaseService::new(dir.path(), format!("holder-{}", i), TTL);
                tokio::spawn(async move { lease.try_acquire(&agent()).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for attempt in attempts {
            if attempt.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
