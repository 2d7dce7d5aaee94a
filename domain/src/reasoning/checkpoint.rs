//! Versioned snapshot of an interrupted reasoning session.
//!
//! Stored as JSON keyed by agent (one open checkpoint per agent). A snapshot
//! with an unknown version or that fails to decode is "no checkpoint": the
//! session restarts from scratch.

use super::session::ThoughtStep;
use super::state::ReasoningState;
use crate::core::ids::{AgentId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub session_id: SessionId,
    pub agent_id: AgentId,
    pub state: ReasoningState,
    pub steps: Vec<ThoughtStep>,
    pub started_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(
        session_id: SessionId,
        agent_id: AgentId,
        state: ReasoningState,
        steps: Vec<ThoughtStep>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            session_id,
            agent_id,
            state,
            steps,
            started_at,
            created_at: Utc::now(),
        }
    }

    /// Iteration the resumed session continues from
    pub fn next_iteration(&self) -> u32 {
        self.state.next_iteration
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a stored snapshot; `None` for other versions or bad JSON.
    pub fn from_json(json: &str) -> Option<Self> {
        // peek at the version first so future layouts don't fail noisily
        let version = serde_json::from_str::<serde_json::Value>(json)
            .ok()?
            .get("version")?
            .as_u64()?;
        if version != CHECKPOINT_VERSION as u64 {
            return None;
        }
        serde_json::from_str(json).ok()
    }
}
