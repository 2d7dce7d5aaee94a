//! In-memory vector memory repository with brute-force cosine search.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_application::ports::memory::MemoryRepository;
use fleet_application::ports::persistence::PersistenceError;
use fleet_domain::memory::cosine_similarity;
use fleet_domain::{AgentId, Archetype, CollectiveMemory, Memory};
use std::collections::HashSet;
use std::sync::RwLock;
use uuid::Uuid;

fn poisoned() -> PersistenceError {
    PersistenceError::Unavailable("memory lock poisoned".to_string())
}

/// Most similar first, at most `limit`
fn nearest<T: Clone>(
    items: impl Iterator<Item = (T, f64)>,
    limit: usize,
) -> Vec<(T, f64)> {
    let mut scored: Vec<(T, f64)> = items.collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);
    scored
}

#[derive(Default)]
pub struct InMemoryVectorRepository {
    personal: RwLock<Vec<Memory>>,
    collective: RwLock<Vec<CollectiveMemory>>,
}

impl InMemoryVectorRepository {
    pub fn personal_count(&self) -> usize {
        self.personal.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn collective_count(&self) -> usize {
        self.collective.read().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl MemoryRepository for InMemoryVectorRepository {
    async fn insert_personal(&self, memory: &Memory) -> Result<(), PersistenceError> {
        self.personal.write().map_err(|_| poisoned())?.push(memory.clone());
        Ok(())
    }

    async fn nearest_personal(
        &self,
        agent_id: &AgentId,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<(Memory, f64)>, PersistenceError> {
        let personal = self.personal.read().map_err(|_| poisoned())?;
        Ok(nearest(
            personal
                .iter()
                .filter(|m| &m.agent_id == agent_id)
                .map(|m| (m.clone(), cosine_similarity(&m.embedding, embedding))),
            limit,
        ))
    }

    async fn nearest_collective(
        &self,
        archetype: Archetype,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<(CollectiveMemory, f64)>, PersistenceError> {
        let collective = self.collective.read().map_err(|_| poisoned())?;
        Ok(nearest(
            collective
                .iter()
                .filter(|m| m.archetype == archetype)
                .map(|m| (m.clone(), cosine_similarity(&m.embedding, embedding))),
            limit,
        ))
    }

    async fn upsert_collective(&self, memory: &CollectiveMemory) -> Result<(), PersistenceError> {
        let mut collective = self.collective.write().map_err(|_| poisoned())?;
        match collective.iter_mut().find(|m| m.id == memory.id) {
            Some(existing) => *existing = memory.clone(),
            None => collective.push(memory.clone()),
        }
        Ok(())
    }

    async fn touch_personal(&self, ids: &[Uuid], at: DateTime<Utc>) -> Result<(), PersistenceError> {
        let ids: HashSet<&Uuid> = ids.iter().collect();
        let mut personal = self.personal.write().map_err(|_| poisoned())?;
        personal
            .iter_mut()
            .filter(|m| ids.contains(&m.id))
            .for_each(|m| m.touch(at));
        Ok(())
    }

    async fn list_personal(&self, agent_id: &AgentId) -> Result<Vec<Memory>, PersistenceError> {
        let personal = self.personal.read().map_err(|_| poisoned())?;
        Ok(personal
            .iter()
            .filter(|m| &m.agent_id == agent_id)
            .cloned()
            .collect())
    }

    async fn update_personal(&self, memories: &[Memory]) -> Result<(), PersistenceError> {
        let mut personal = self.personal.write().map_err(|_| poisoned())?;
        for updated in memories {
            if let Some(existing) = personal.iter_mut().find(|m| m.id == updated.id) {
                *existing = updated.clone();
            }
        }
        Ok(())
    }

    async fn delete_personal(&self, ids: &[Uuid]) -> Result<usize, PersistenceError> {
        let ids: HashSet<&Uuid> = ids.iter().collect();
        let mut personal = self.personal.write().map_err(|_| poisoned())?;
        let before = personal.len();
        personal.retain(|m| !ids.contains(&m.id));
        Ok(before - personal.len())
    }
}
