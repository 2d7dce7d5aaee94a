//! Agent configuration - identity, archetype, weights and strategy limits.
//!
//! Created once by an operator; mutated only by the learning step
//! ([`AgentConfig::apply_weight_adjustment`]).

use super::archetype::Archetype;
use super::weights::{SignalWeights, WeightAdjustment};
use crate::core::error::DomainError;
use crate::core::ids::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Risk and sizing limits of an agent's strategy.
///
/// Percentages are expressed in percent (e.g. `2.0` = 2%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyLimits {
    /// Maximum position size as a percentage of balance
    pub max_position_pct: f64,
    pub max_leverage: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    /// Decisions below this confidence are downgraded to hold
    pub min_confidence: f64,
}

impl Default for StrategyLimits {
    fn default() -> Self {
        Self {
            max_position_pct: 20.0,
            max_leverage: 5.0,
            stop_loss_pct: 3.0,
            take_profit_pct: 6.0,
            min_confidence: 0.65,
        }
    }
}

impl StrategyLimits {
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(self.max_position_pct > 0.0 && self.max_position_pct <= 100.0) {
            return Err(DomainError::InvalidLimits(format!(
                "max_position_pct must be in (0, 100], got {}",
                self.max_position_pct
            )));
        }
        if !(self.max_leverage >= 1.0 && self.max_leverage <= 125.0) {
            return Err(DomainError::InvalidLimits(format!(
                "max_leverage must be in [1, 125], got {}",
                self.max_leverage
            )));
        }
        if !(self.stop_loss_pct > 0.0 && self.take_profit_pct > 0.0) {
            return Err(DomainError::InvalidLimits(
                "stop_loss_pct and take_profit_pct must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(DomainError::InvalidLimits(format!(
                "min_confidence must be in [0, 1], got {}",
                self.min_confidence
            )));
        }
        Ok(())
    }
}

/// Static configuration of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: AgentId,
    pub owner: String,
    pub archetype: Archetype,
    pub signal_weights: SignalWeights,
    pub limits: StrategyLimits,
    /// Seconds between two periodic cycles
    pub decision_interval_secs: u64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentConfig {
    /// Create a config with the archetype's default weights and limits.
    pub fn new(id: impl Into<AgentId>, owner: impl Into<String>, archetype: Archetype) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            owner: owner.into(),
            archetype,
            signal_weights: archetype.default_weights(),
            limits: archetype.default_limits(),
            decision_interval_secs: 300,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_weights(mut self, weights: SignalWeights) -> Self {
        self.signal_weights = weights;
        self
    }

    pub fn with_limits(mut self, limits: StrategyLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_decision_interval(mut self, secs: u64) -> Self {
        self.decision_interval_secs = secs;
        self
    }

    /// Validate at creation time; configuration errors are never corrected.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.as_str().trim().is_empty() {
            return Err(DomainError::InvalidAgentConfig(
                "agent id cannot be empty".to_string(),
            ));
        }
        if self.decision_interval_secs == 0 {
            return Err(DomainError::InvalidAgentConfig(
                "decision_interval_secs cannot be 0".to_string(),
            ));
        }
        if !self.signal_weights.is_normalized(1e-9) {
            return Err(DomainError::InvalidWeights(format!(
                "weights {:?} are not normalized",
                self.signal_weights
            )));
        }
        self.limits.validate()
    }

    pub fn decision_interval(&self) -> Duration {
        Duration::from_secs(self.decision_interval_secs)
    }

    /// The learning step's only mutation.
    pub fn apply_weight_adjustment(&mut self, adjustment: &WeightAdjustment) {
        self.signal_weights = self.signal_weights.adjusted(adjustment);
        self.updated_at = Utc::now();
    }
}
