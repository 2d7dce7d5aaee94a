//! Per (agent, target) mutable counters.
//!
//! Upserted after every cycle; the persisted row is the source of truth
//! when a process restarts and restores its agents.

use crate::core::ids::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRuntimeState {
    pub agent_id: AgentId,
    /// Traded instrument (e.g. "BTCUSDT")
    pub target: String,
    /// Budget the agent was started with
    #[serde(default)]
    pub initial_budget: f64,
    pub balance: f64,
    pub equity: f64,
    pub cumulative_pnl: f64,
    pub wins: u32,
    pub losses: u32,
    /// Losses since the last win
    #[serde(default)]
    pub consecutive_losses: u32,
    pub trading_enabled: bool,
    /// Completed periodic cycles since creation
    pub cycles: u64,
    pub updated_at: DateTime<Utc>,
}

impl AgentRuntimeState {
    pub fn new(agent_id: AgentId, target: impl Into<String>, initial_budget: f64) -> Self {
        Self {
            agent_id,
            target: target.into(),
            initial_budget,
            balance: initial_budget,
            equity: initial_budget,
            cumulative_pnl: 0.0,
            wins: 0,
            losses: 0,
            consecutive_losses: 0,
            trading_enabled: false,
            cycles: 0,
            updated_at: Utc::now(),
        }
    }

    /// Book a realized profit or loss.
    pub fn record_realized(&mut self, pnl: f64) {
        self.cumulative_pnl += pnl;
        self.balance += pnl;
        self.equity += pnl;
        if pnl > 0.0 {
            self.wins += 1;
            self.consecutive_losses = 0;
        } else if pnl < 0.0 {
            self.losses += 1;
            self.consecutive_losses += 1;
        }
        self.touch();
    }

    pub fn set_equity(&mut self, equity: f64) {
        self.equity = equity;
        self.touch();
    }

    pub fn set_trading(&mut self, enabled: bool) {
        self.trading_enabled = enabled;
        self.touch();
    }

    pub fn complete_cycle(&mut self) {
        self.cycles += 1;
        self.touch();
    }

    pub fn win_rate(&self) -> f64 {
        let total = self.wins + self.losses;
        if total == 0 {
            0.0
        } else {
            self.wins as f64 / total as f64
        }
    }

    /// Drawdown of equity below the initial budget, in percent.
    pub fn drawdown_pct(&self, initial_budget: f64) -> f64 {
        if initial_budget <= 0.0 {
            return 0.0;
        }
        ((initial_budget - self.equity) / initial_budget * 100.0).max(0.0)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
