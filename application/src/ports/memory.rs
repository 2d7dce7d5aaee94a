//! Memory ports
//!
//! [`Embedder`] turns text into vectors; [`MemoryRepository`] stores personal
//! and collective memories and answers nearest-neighbour queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_domain::{AgentId, Archetype, CollectiveMemory, Memory};
use thiserror::Error;
use uuid::Uuid;

use super::persistence::PersistenceError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    #[error("Embedding backend unreachable: {0}")]
    Unreachable(String),

    #[error("Embedding failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Port for memory storage with vector search
#[async_trait]
pub trait MemoryRepository: Send + Sync {
    async fn insert_personal(&self, memory: &Memory) -> Result<(), PersistenceError>;

    /// Nearest personal memories of `agent_id` with their cosine similarity,
    /// most similar first
    async fn nearest_personal(
        &self,
        agent_id: &AgentId,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<(Memory, f64)>, PersistenceError>;

    async fn nearest_collective(
        &self,
        archetype: Archetype,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<(CollectiveMemory, f64)>, PersistenceError>;

    async fn upsert_collective(&self, memory: &CollectiveMemory) -> Result<(), PersistenceError>;

    /// Bump access count and last-access time
    async fn touch_personal(
        &self,
        ids: &[Uuid],
        at: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;

    async fn list_personal(&self, agent_id: &AgentId) -> Result<Vec<Memory>, PersistenceError>;

    async fn update_personal(&self, memories: &[Memory]) -> Result<(), PersistenceError>;

    async fn delete_personal(&self, ids: &[Uuid]) -> Result<usize, PersistenceError>;
}
