//! Lifecycle parameters - periodic cycle and shutdown control.

use fleet_domain::TradeAction;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleParams {
    /// Upper bound on how long shutdown waits for agent tasks
    pub grace_period: Duration,
    /// Fleet-wide lease lifetime; tasks renew every third of it
    pub lease_ttl: Duration,
    /// Actions that go through consensus before execution
    pub must_validate: Vec<TradeAction>,
    /// Validation only runs for decisions above this confidence
    pub validation_confidence_threshold: f64,
    /// Reflect every N completed cycles (0 disables)
    pub reflection_every: u64,
    /// Consolidate memory every N completed cycles (0 disables)
    pub consolidation_every: u64,
    /// Decision records reviewed by a reflection round
    pub reflection_window: usize,
    /// Importance below which idle personal memories may be forgotten
    pub forget_threshold: f64,
    /// Create and revise trading plans
    pub planning: bool,
}

impl Default for LifecycleParams {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(10),
            lease_ttl: Duration::from_secs(30),
            must_validate: vec![TradeAction::Long, TradeAction::Short],
            validation_confidence_threshold: 0.5,
            reflection_every: 12,
            consolidation_every: 48,
            reflection_window: 20,
            forget_threshold: 0.3,
            planning: true,
        }
    }
}

impl LifecycleParams {
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    pub fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = ttl;
        self
    }

    pub fn with_must_validate(mut self, actions: Vec<TradeAction>) -> Self {
        self.must_validate = actions;
        self
    }

    pub fn with_reflection_every(mut self, cycles: u64) -> Self {
        self.reflection_every = cycles;
        self
    }

    pub fn with_consolidation_every(mut self, cycles: u64) -> Self {
        self.consolidation_every = cycles;
        self
    }

    pub fn with_planning(mut self, enabled: bool) -> Self {
        self.planning = enabled;
        self
    }

    /// Interval between lease renewals
    pub fn lease_renewal_interval(&self) -> Duration {
        (self.lease_ttl / 3).max(Duration::from_millis(100))
    }

    /// Whether a decision with this action and confidence goes to consensus
    pub fn requires_validation(&self, action: TradeAction, confidence: f64) -> bool {
        self.must_validate.contains(&action) && confidence > self.validation_confidence_threshold
    }

    /// True on every `every`-th completed cycle
    pub fn is_due(every: u64, cycles: u64) -> bool {
        every > 0 && cycles > 0 && cycles % every == 0
    }
}
