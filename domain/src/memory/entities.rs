//! Memory records.
//!
//! - [`Experience`] - raw input handed to the store after a cycle or reflection
//! - [`MemorySummary`] - compact (context, action, outcome, lesson, importance)
//! - [`Memory`] - personal memory of one agent
//! - [`CollectiveMemory`] - lesson pooled across one archetype
//! - [`ScoredMemory`] - a recall result, personal or collective

use crate::agent::archetype::Archetype;
use crate::core::ids::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Something that happened to an agent and may be worth remembering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    /// Market situation at the time
    pub context: String,
    /// What the agent did
    pub action: String,
    /// What came of it
    pub outcome: String,
    /// Realized PnL in percent, if the experience was a trade
    pub pnl_pct: Option<f64>,
    /// Whether the outcome counts as a success
    pub success: Option<bool>,
    /// Lesson already distilled upstream (e.g. by reflection)
    pub lesson: Option<String>,
    /// Importance proposed upstream, in [0, 1]
    pub importance_hint: Option<f64>,
}

impl Experience {
    pub fn new(
        context: impl Into<String>,
        action: impl Into<String>,
        outcome: impl Into<String>,
    ) -> Self {
        Self {
            context: context.into(),
            action: action.into(),
            outcome: outcome.into(),
            ..Default::default()
        }
    }

    pub fn with_pnl(mut self, pnl_pct: f64) -> Self {
        self.pnl_pct = Some(pnl_pct);
        self.success = Some(pnl_pct > 0.0);
        self
    }

    pub fn with_lesson(mut self, lesson: impl Into<String>) -> Self {
        self.lesson = Some(lesson.into());
        self
    }

    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance_hint = Some(importance);
        self
    }

    /// Local summary used when no summarizing provider is available.
    ///
    /// Importance grows with the magnitude of the PnL and with an explicit
    /// lesson; an explicit hint wins.
    pub fn summarize(&self) -> MemorySummary {
        let derived = match self.pnl_pct {
            Some(pnl) if pnl.is_finite() => 0.3 + (pnl.abs() / 10.0).min(0.6),
            _ => 0.3,
        } + if self.lesson.is_some() { 0.1 } else { 0.0 };

        let importance = self.importance_hint.unwrap_or(derived);
        let lesson = self.lesson.clone().unwrap_or_else(|| {
            format!("After '{}', the result was: {}", self.action, self.outcome)
        });

        MemorySummary {
            context: self.context.clone(),
            action: self.action.clone(),
            outcome: self.outcome.clone(),
            lesson,
            importance,
        }
        .clamped()
    }
}

/// Compact form of an experience, the unit that gets embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySummary {
    pub context: String,
    pub action: String,
    pub outcome: String,
    pub lesson: String,
    pub importance: f64,
}

impl MemorySummary {
    /// Keep importance in [0, 1]; non-finite becomes 0.
    pub fn clamped(mut self) -> Self {
        self.importance = clamp_unit(self.importance);
        self
    }

    /// Text fed to the embedding backend
    pub fn embedding_text(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}",
            self.context, self.action, self.outcome, self.lesson
        )
    }
}

/// A personal memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: Uuid,
    pub agent_id: AgentId,
    pub context: String,
    pub action: String,
    pub outcome: String,
    pub lesson: String,
    pub embedding: Vec<f32>,
    pub importance: f64,
    pub access_count: u32,
    pub last_accessed: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Memory {
    pub fn new(agent_id: AgentId, summary: MemorySummary, embedding: Vec<f32>) -> Self {
        let now = Utc::now();
        let summary = summary.clamped();
        Self {
            id: Uuid::new_v4(),
            agent_id,
            context: summary.context,
            action: summary.action,
            outcome: summary.outcome,
            lesson: summary.lesson,
            embedding,
            importance: summary.importance,
            access_count: 0,
            last_accessed: now,
            created_at: now,
        }
    }

    /// Record one read.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed = now;
    }

    /// Multiply importance, staying in [0, 1].
    pub fn decay(&mut self, factor: f64) {
        self.importance = clamp_unit(self.importance * factor);
    }
}

/// A lesson shared by every agent of one archetype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectiveMemory {
    pub id: Uuid,
    pub archetype: Archetype,
    pub context: String,
    pub action: String,
    pub outcome: String,
    pub lesson: String,
    pub embedding: Vec<f32>,
    pub importance: f64,
    /// Independent confirmations, starting at 1
    pub confirmations: u32,
    /// Running mean of the boolean outcome across confirmations
    pub success_rate: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CollectiveMemory {
    pub fn new(
        archetype: Archetype,
        summary: MemorySummary,
        embedding: Vec<f32>,
        success: bool,
    ) -> Self {
        let now = Utc::now();
        let summary = summary.clamped();
        Self {
            id: Uuid::new_v4(),
            archetype,
            context: summary.context,
            action: summary.action,
            outcome: summary.outcome,
            lesson: summary.lesson,
            embedding,
            importance: summary.importance,
            confirmations: 1,
            success_rate: if success { 1.0 } else { 0.0 },
            created_at: now,
            updated_at: now,
        }
    }

    /// Another agent reported a similar lesson.
    pub fn confirm(&mut self, success: bool, importance: f64) {
        let n = self.confirmations as f64;
        let outcome = if success { 1.0 } else { 0.0 };
        self.success_rate = clamp_unit((self.success_rate * n + outcome) / (n + 1.0));
        self.confirmations = self.confirmations.saturating_add(1);
        self.importance = clamp_unit(self.importance.max(importance));
        self.updated_at = Utc::now();
    }
}

/// Where a recalled memory came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryOrigin {
    Personal,
    Collective,
}

/// A memory returned by recall, with its ranking score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMemory {
    pub id: Uuid,
    pub origin: MemoryOrigin,
    pub context: String,
    pub action: String,
    pub outcome: String,
    pub lesson: String,
    pub importance: f64,
    pub similarity: f64,
    pub score: f64,
    /// Collective memories only
    pub confirmations: Option<u32>,
    /// Collective memories only
    pub success_rate: Option<f64>,
}

impl ScoredMemory {
    /// One line for prompts and self-question answers
    pub fn to_prompt_line(&self) -> String {
        match self.origin {
            MemoryOrigin::Personal => format!(
                "[own, importance {:.2}] {} -> {} | lesson: {}",
                self.importance, self.action, self.outcome, self.lesson
            ),
            MemoryOrigin::Collective => format!(
                "[shared x{}, success {:.0}%] {}",
                self.confirmations.unwrap_or(1),
                self.success_rate.unwrap_or(0.0) * 100.0,
                self.lesson
            ),
        }
    }
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 }
}
