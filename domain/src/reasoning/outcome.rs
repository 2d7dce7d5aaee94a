//! What happened to a decision after the loop produced it.

use super::decision::{Decision, TradeAction};
use crate::consensus::ConsensusResult;
use crate::core::ids::DecisionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fill reported by the actuator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub decision_id: DecisionId,
    pub action: TradeAction,
    pub price: f64,
    /// Filled quantity in units of the target
    pub quantity: f64,
    pub notional: f64,
    pub fee: f64,
    /// Set when the execution closed a position
    pub realized_pnl: Option<f64>,
    /// Account balance after the execution, if the venue reports it
    pub balance_after: Option<f64>,
    pub executed_at: DateTime<Utc>,
}

/// Why a decision did or did not reach the actuator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DecisionDisposition {
    NoOp,
    /// Consensus did not approve
    Blocked { verdict: String },
    Executed,
    ExecutionFailed { error: String },
}

/// Appended after every cycle that produced a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision: Decision,
    pub consensus: Option<ConsensusResult>,
    pub execution: Option<ExecutionReport>,
    pub disposition: DecisionDisposition,
    pub recorded_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new(decision: Decision, disposition: DecisionDisposition) -> Self {
        Self {
            decision,
            consensus: None,
            execution: None,
            disposition,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_consensus(mut self, consensus: Option<ConsensusResult>) -> Self {
        self.consensus = consensus;
        self
    }

    pub fn with_execution(mut self, execution: ExecutionReport) -> Self {
        self.execution = Some(execution);
        self
    }

    pub fn realized_pnl(&self) -> Option<f64> {
        self.execution.as_ref().and_then(|e| e.realized_pnl)
    }

    /// One line for reflection prompts
    pub fn to_prompt_line(&self) -> String {
        let outcome = match (&self.disposition, self.realized_pnl()) {
            (DecisionDisposition::Executed, Some(pnl)) => format!("executed, realized {:+.2}", pnl),
            (DecisionDisposition::Executed, None) => "executed".to_string(),
            (DecisionDisposition::Blocked { verdict }, _) => format!("blocked ({})", verdict),
            (DecisionDisposition::ExecutionFailed { error }, _) => format!("failed: {}", error),
            (DecisionDisposition::NoOp, _) => "no-op".to_string(),
        };
        format!(
            "[{}] {} -> {} | {}",
            self.decision.created_at.format("%m-%d %H:%M"),
            self.decision.headline(),
            outcome,
            self.decision.reason
        )
    }
}
