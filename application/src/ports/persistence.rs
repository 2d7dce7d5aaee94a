//! Persistence ports
//!
//! Upsert-by-key for configs and runtime state, append for the decision /
//! reflection / plan journal, upsert/delete for checkpoints. All keys are
//! agent ids, so the single lease holder never races another writer.

use async_trait::async_trait;
use fleet_domain::{
    AgentConfig, AgentId, AgentRuntimeState, DecisionRecord, ReflectionRecord, SessionId,
    TradingPlan,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn get(&self, agent_id: &AgentId) -> Result<Option<AgentConfig>, PersistenceError>;

    async fn save(&self, config: &AgentConfig) -> Result<(), PersistenceError>;

    async fn list(&self) -> Result<Vec<AgentConfig>, PersistenceError>;
}

#[async_trait]
pub trait StateRepository: Send + Sync {
    async fn load(&self, agent_id: &AgentId) -> Result<Option<AgentRuntimeState>, PersistenceError>;

    async fn upsert(&self, state: &AgentRuntimeState) -> Result<(), PersistenceError>;

    /// States whose trading flag is set; used to restore agents on startup
    async fn list_trading(&self) -> Result<Vec<AgentRuntimeState>, PersistenceError>;
}

#[async_trait]
pub trait JournalRepository: Send + Sync {
    async fn append_decision(&self, record: &DecisionRecord) -> Result<(), PersistenceError>;

    /// Most recent decisions, oldest first
    async fn recent_decisions(
        &self,
        agent_id: &AgentId,
        limit: usize,
    ) -> Result<Vec<DecisionRecord>, PersistenceError>;

    async fn append_reflection(&self, record: &ReflectionRecord) -> Result<(), PersistenceError>;

    async fn append_plan(&self, plan: &TradingPlan) -> Result<(), PersistenceError>;

    async fn latest_plan(&self, agent_id: &AgentId) -> Result<Option<TradingPlan>, PersistenceError>;
}

/// A serialized checkpoint as stored
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCheckpoint {
    pub session_id: SessionId,
    pub json: String,
}

/// At most one open checkpoint per agent; saving replaces the previous one.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save(
        &self,
        agent_id: &AgentId,
        session_id: SessionId,
        json: String,
    ) -> Result<(), PersistenceError>;

    async fn load(&self, agent_id: &AgentId) -> Result<Option<StoredCheckpoint>, PersistenceError>;

    async fn delete(&self, agent_id: &AgentId) -> Result<(), PersistenceError>;
}
