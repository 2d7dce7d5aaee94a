//! Ranking and forgetting rules for the memory store.
//!
//! Recall score = `importance × recency_boost`, with personal memories
//! boosted by [`MemoryPolicy::personal_boost`] over collective ones.
//!
//! Recency boost halves every `recency_half_life_days` and never drops
//! below [`MIN_RECENCY_BOOST`].

use super::entities::{CollectiveMemory, Memory, MemoryOrigin, ScoredMemory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_RECENCY_BOOST: f64 = 0.05;

/// Tunables of the memory subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryPolicy {
    /// Lessons at or above this importance reach the collective pool
    pub collective_importance_threshold: f64,
    /// Cosine similarity at which a lesson counts as "the same" lesson
    pub similarity_threshold: f64,
    pub personal_boost: f64,
    pub recency_half_life_days: f64,
    /// Memories read this often are never forgotten
    pub forget_max_access_count: u32,
    /// Memories younger than this are never forgotten
    pub forget_min_age_days: i64,
    /// Consolidation decays memories idle for this long
    pub decay_idle_days: i64,
    pub decay_factor: f64,
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self {
            collective_importance_threshold: 0.6,
            similarity_threshold: 0.85,
            personal_boost: 1.2,
            recency_half_life_days: 30.0,
            forget_max_access_count: 2,
            forget_min_age_days: 30,
            decay_idle_days: 7,
            decay_factor: 0.95,
        }
    }
}

impl MemoryPolicy {
    pub fn reaches_collective(&self, importance: f64) -> bool {
        importance >= self.collective_importance_threshold
    }

    pub fn recency_boost(&self, since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let age_days = (now - since).num_seconds().max(0) as f64 / 86_400.0;
        let half_life = self.recency_half_life_days.max(f64::EPSILON);
        0.5_f64.powf(age_days / half_life).max(MIN_RECENCY_BOOST)
    }

    pub fn score_personal(&self, memory: &Memory, similarity: f64, now: DateTime<Utc>) -> ScoredMemory {
        let score =
            memory.importance * self.recency_boost(memory.last_accessed, now) * self.personal_boost;
        ScoredMemory {
            id: memory.id,
            origin: MemoryOrigin::Personal,
            context: memory.context.clone(),
            action: memory.action.clone(),
            outcome: memory.outcome.clone(),
            lesson: memory.lesson.clone(),
            importance: memory.importance,
            similarity,
            score,
            confirmations: None,
            success_rate: None,
        }
    }

    pub fn score_collective(
        &self,
        memory: &CollectiveMemory,
        similarity: f64,
        now: DateTime<Utc>,
    ) -> ScoredMemory {
        let score = memory.importance * self.recency_boost(memory.updated_at, now);
        ScoredMemory {
            id: memory.id,
            origin: MemoryOrigin::Collective,
            context: memory.context.clone(),
            action: memory.action.clone(),
            outcome: memory.outcome.clone(),
            lesson: memory.lesson.clone(),
            importance: memory.importance,
            similarity,
            score,
            confirmations: Some(memory.confirmations),
            success_rate: Some(memory.success_rate),
        }
    }

    /// Low importance, rarely read and old: all three must hold.
    pub fn is_forgettable(&self, memory: &Memory, threshold: f64, now: DateTime<Utc>) -> bool {
        memory.importance < threshold
            && memory.access_count < self.forget_max_access_count
            && (now - memory.created_at).num_days() > self.forget_min_age_days
    }

    pub fn is_idle(&self, memory: &Memory, now: DateTime<Utc>) -> bool {
        (now - memory.last_accessed).num_days() >= self.decay_idle_days
    }
}

/// Cosine similarity in [-1, 1]; 0 for empty, zero or mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0)
}

/// Sort by score descending; ties keep the more similar memory first.
pub fn rank(mut memories: Vec<ScoredMemory>, k: usize) -> Vec<ScoredMemory> {
    memories.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.similarity.total_cmp(&a.similarity))
    });
    memories.truncate(k);
    memories
}
