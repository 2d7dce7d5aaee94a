//! Periodic self-reflection and the records it produces.

use crate::agent::weights::WeightAdjustment;
use crate::core::ids::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the provider concluded from recent decisions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub summary: String,
    #[serde(default)]
    pub lessons: Vec<String>,
    /// Proposed signal weight deltas; applied through normalization
    #[serde(default)]
    pub weight_adjustment: Option<WeightAdjustment>,
}

/// The provider's assessment of the agent's own performance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelfAnalysis {
    pub assessment: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    /// Positive when the agent has been overconfident
    #[serde(default)]
    pub overconfidence: Option<f64>,
}

/// Appended to persistence after every reflection round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionRecord {
    pub id: Uuid,
    pub agent_id: AgentId,
    pub reflection: Reflection,
    pub analysis: Option<SelfAnalysis>,
    /// Deltas actually applied, if any
    pub applied_adjustment: Option<WeightAdjustment>,
    pub decisions_reviewed: usize,
    pub created_at: DateTime<Utc>,
}

impl ReflectionRecord {
    pub fn new(agent_id: AgentId, reflection: Reflection, decisions_reviewed: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            reflection,
            analysis: None,
            applied_adjustment: None,
            decisions_reviewed,
            created_at: Utc::now(),
        }
    }
}
