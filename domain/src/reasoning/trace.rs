//! Audit record of how a decision was reached.

use super::session::ThoughtStep;
use crate::core::ids::{AgentId, DecisionId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// `decide` chosen with at least one evaluated option
    Decided,
    IterationCeiling,
    TimeCeiling,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TerminationReason::Decided => "decided",
            TerminationReason::IterationCeiling => "iteration ceiling",
            TerminationReason::TimeCeiling => "time ceiling",
        };
        write!(f, "{}", s)
    }
}

/// Points at its decision; the decision never points back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningTrace {
    pub session_id: SessionId,
    pub agent_id: AgentId,
    pub decision_id: DecisionId,
    pub steps: Vec<ThoughtStep>,
    pub termination: TerminationReason,
    pub resumed: bool,
    pub memories_used: usize,
    pub options_generated: usize,
    pub elapsed_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl ReasoningTrace {
    pub fn iterations(&self) -> usize {
        self.steps.len()
    }

    /// Number of steps per meta-action kind, in first-seen order
    pub fn action_histogram(&self) -> Vec<(&'static str, usize)> {
        let mut counts: Vec<(&'static str, usize)> = Vec::new();
        for step in &self.steps {
            let kind = step.action.kind();
            match counts.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, n)) => *n += 1,
                None => counts.push((kind, 1)),
            }
        }
        counts
    }
}
