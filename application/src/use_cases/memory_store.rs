//! Memory store
//!
//! Stores experiences as personal memories, pools important lessons into the
//! archetype's collective memory, and recalls the memories most relevant to
//! a situation.
//!
//! | Operation | Touches collective pool? |
//! |-----------|--------------------------|
//! | [`MemoryStore::store`] | when importance ≥ threshold |
//! | [`MemoryStore::recall_relevant`] | read only |
//! | [`MemoryStore::forget`] | never |
//! | [`MemoryStore::consolidate`] | never |

use crate::ports::memory::{Embedder, EmbeddingError, MemoryRepository};
use crate::ports::persistence::PersistenceError;
use crate::ports::reasoning_provider::{Prompt, ReasoningProvider, SummarizeRequest};
use chrono::Utc;
use fleet_domain::memory::{MemoryOrigin, rank};
use fleet_domain::reasoning::parsing::parse_memory_summary;
use fleet_domain::{
    AgentId, AgentPromptTemplate, Archetype, CollectiveMemory, Experience, Memory, MemoryPolicy,
    MemorySummary, ScoredMemory,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MemoryError {
    /// Callers treat this as "no memories"
    #[error("Embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Memory storage error: {0}")]
    Storage(#[from] PersistenceError),
}

impl MemoryError {
    pub fn is_embedding_unavailable(&self) -> bool {
        matches!(self, MemoryError::EmbeddingUnavailable(_))
    }
}

impl From<EmbeddingError> for MemoryError {
    fn from(e: EmbeddingError) -> Self {
        MemoryError::EmbeddingUnavailable(e.to_string())
    }
}

/// Outcome of a consolidation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsolidationReport {
    pub decayed: usize,
    pub forgotten: usize,
}

pub struct MemoryStore {
    repository: Arc<dyn MemoryRepository>,
    embedder: Arc<dyn Embedder>,
    summarizer: Option<Arc<dyn ReasoningProvider>>,
    policy: MemoryPolicy,
}

impl MemoryStore {
    pub fn new(
        repository: Arc<dyn MemoryRepository>,
        embedder: Arc<dyn Embedder>,
        policy: MemoryPolicy,
    ) -> Self {
        Self {
            repository,
            embedder,
            summarizer: None,
            policy,
        }
    }

    /// Distill experiences through a provider instead of the local summary
    pub fn with_summarizer(mut self, provider: Arc<dyn ReasoningProvider>) -> Self {
        self.summarizer = Some(provider);
        self
    }

    pub fn policy(&self) -> &MemoryPolicy {
        &self.policy
    }

    /// Persist an experience as a personal memory and, when it is important
    /// enough, contribute it to the archetype's collective pool.
    pub async fn store(
        &self,
        agent_id: &AgentId,
        archetype: Archetype,
        experience: &Experience,
    ) -> Result<Memory, MemoryError> {
        let summary = self.summarize(experience).await;
        let embedding = self.embedder.embed(&summary.embedding_text()).await?;

        let memory = Memory::new(agent_id.clone(), summary.clone(), embedding.clone());
        self.repository.insert_personal(&memory).await?;
        debug!(
            agent_id = %agent_id,
            importance = memory.importance,
            "Stored personal memory"
        );

        if self.policy.reaches_collective(memory.importance) {
            self.contribute(archetype, summary, embedding, experience.success.unwrap_or(false))
                .await?;
        }
        Ok(memory)
    }

    async fn summarize(&self, experience: &Experience) -> MemorySummary {
        // an upstream lesson is already distilled
        if experience.lesson.is_some() {
            return experience.summarize();
        }
        let Some(provider) = &self.summarizer else {
            return experience.summarize();
        };

        let request = SummarizeRequest {
            experience,
            prompt: Prompt::new(
                "You condense trading experiences into reusable lessons.",
                AgentPromptTemplate::memory_summary_prompt(experience),
            ),
        };
        match provider.summarize_memory(&request).await {
            Ok(response) => parse_memory_summary(&response).unwrap_or_else(|| {
                warn!("Unparsable memory summary, using local summary");
                experience.summarize()
            }),
            Err(e) => {
                warn!("Memory summary failed: {}", e);
                experience.summarize()
            }
        }
    }

    async fn contribute(
        &self,
        archetype: Archetype,
        summary: MemorySummary,
        embedding: Vec<f32>,
        success: bool,
    ) -> Result<(), MemoryError> {
        let nearest = self
            .repository
            .nearest_collective(archetype, &embedding, 1)
            .await?;

        match nearest.into_iter().next() {
            Some((mut existing, similarity)) if similarity >= self.policy.similarity_threshold => {
                existing.confirm(success, summary.importance);
                info!(
                    archetype = %archetype,
                    confirmations = existing.confirmations,
                    "Collective lesson confirmed"
                );
                self.repository.upsert_collective(&existing).await?;
            }
            _ => {
                let collective = CollectiveMemory::new(archetype, summary, embedding, success);
                info!(archetype = %archetype, "New collective lesson");
                self.repository.upsert_collective(&collective).await?;
            }
        }
        Ok(())
    }

    /// The `k` memories most relevant to `situation`, personal and
    /// collective merged. Returns fewer when fewer exist.
    ///
    /// Every personal memory returned is marked as read.
    pub async fn recall_relevant(
        &self,
        agent_id: &AgentId,
        archetype: Archetype,
        situation: &str,
        k: usize,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let embedding = self.embedder.embed(situation).await?;
        let now = Utc::now();

        let personal = self
            .repository
            .nearest_personal(agent_id, &embedding, k)
            .await?;
        let collective = self
            .repository
            .nearest_collective(archetype, &embedding, k)
            .await?;

        let scored: Vec<ScoredMemory> = personal
            .iter()
            .map(|(m, sim)| self.policy.score_personal(m, *sim, now))
            .chain(
                collective
                    .iter()
                    .map(|(m, sim)| self.policy.score_collective(m, *sim, now)),
            )
            .collect();
        let ranked = rank(scored, k);

        self.mark_read(&ranked).await;
        Ok(ranked)
    }

    /// Personal memories only, for the `search_memories` capability
    pub async fn search_personal(
        &self,
        agent_id: &AgentId,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let embedding = self.embedder.embed(query).await?;
        let now = Utc::now();
        let scored = self
            .repository
            .nearest_personal(agent_id, &embedding, k)
            .await?
            .iter()
            .map(|(m, sim)| self.policy.score_personal(m, *sim, now))
            .collect();
        let ranked = rank(scored, k);
        self.mark_read(&ranked).await;
        Ok(ranked)
    }

    async fn mark_read(&self, recalled: &[ScoredMemory]) {
        let ids: Vec<_> = recalled
            .iter()
            .filter(|m| m.origin == MemoryOrigin::Personal)
            .map(|m| m.id)
            .collect();
        if ids.is_empty() {
            return;
        }
        if let Err(e) = self.repository.touch_personal(&ids, Utc::now()).await {
            warn!("Failed to update memory access counts: {}", e);
        }
    }

    /// Delete this agent's personal memories that are below `threshold`,
    /// rarely read and old. Collective memories are never deleted here.
    pub async fn forget(&self, agent_id: &AgentId, threshold: f64) -> Result<usize, MemoryError> {
        let now = Utc::now();
        let ids: Vec<_> = self
            .repository
            .list_personal(agent_id)
            .await?
            .into_iter()
            .filter(|m| self.policy.is_forgettable(m, threshold, now))
            .map(|m| m.id)
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        let removed = self.repository.delete_personal(&ids).await?;
        info!(agent_id = %agent_id, removed, "Forgot stale memories");
        Ok(removed)
    }

    /// Decay idle memories, then forget.
    pub async fn consolidate(
        &self,
        agent_id: &AgentId,
        forget_threshold: f64,
    ) -> Result<ConsolidationReport, MemoryError> {
        let now = Utc::now();
        let mut idle: Vec<Memory> = self
            .repository
            .list_personal(agent_id)
            .await?
            .into_iter()
            .filter(|m| self.policy.is_idle(m, now))
            .collect();
        for memory in &mut idle {
            memory.decay(self.policy.decay_factor);
        }
        if !idle.is_empty() {
            self.repository.update_personal(&idle).await?;
        }

        let forgotten = self.forget(agent_id, forget_threshold).await?;
        Ok(ConsolidationReport {
            decayed: idle.len(),
            forgotten,
        })
    }
}
