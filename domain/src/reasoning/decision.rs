//! Trade options, their evaluations and the final decision.

use super::signals::SignalScores;
use crate::agent::config::StrategyLimits;
use crate::core::ids::{AgentId, DecisionId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do with the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    #[default]
    Hold,
    Long,
    Short,
    Close,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Hold => "hold",
            TradeAction::Long => "long",
            TradeAction::Short => "short",
            TradeAction::Close => "close",
        }
    }

    /// Opens exposure (as opposed to holding or closing)
    pub fn opens_position(&self) -> bool {
        matches!(self, TradeAction::Long | TradeAction::Short)
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TradeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hold" | "wait" | "none" | "no_op" | "noop" => Ok(TradeAction::Hold),
            "long" | "buy" | "open_long" => Ok(TradeAction::Long),
            "short" | "sell" | "open_short" => Ok(TradeAction::Short),
            "close" | "exit" | "close_position" | "flat" => Ok(TradeAction::Close),
            other => Err(format!("unknown trade action: {}", other)),
        }
    }
}

/// A candidate course of action produced by `generate_options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOption {
    pub action: TradeAction,
    #[serde(default)]
    pub size_pct: f64,
    #[serde(default = "default_leverage")]
    pub leverage: f64,
    #[serde(default)]
    pub stop_loss_pct: Option<f64>,
    #[serde(default)]
    pub take_profit_pct: Option<f64>,
    #[serde(default)]
    pub rationale: String,
}

fn default_leverage() -> f64 {
    1.0
}

impl TradeOption {
    pub fn hold(rationale: impl Into<String>) -> Self {
        Self {
            action: TradeAction::Hold,
            size_pct: 0.0,
            leverage: 1.0,
            stop_loss_pct: None,
            take_profit_pct: None,
            rationale: rationale.into(),
        }
    }

    pub fn describe(&self) -> String {
        if self.action.opens_position() {
            format!(
                "{} {:.1}% x{:.1} (SL {}, TP {}) - {}",
                self.action,
                self.size_pct,
                self.leverage,
                fmt_pct(self.stop_loss_pct),
                fmt_pct(self.take_profit_pct),
                self.rationale
            )
        } else {
            format!("{} - {}", self.action, self.rationale)
        }
    }
}

fn fmt_pct(v: Option<f64>) -> String {
    v.map(|x| format!("{:.1}%", x))
        .unwrap_or_else(|| "default".to_string())
}

/// Score given to one option by `evaluate_option`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionEvaluation {
    pub option_index: usize,
    /// Attractiveness in [0, 1]
    pub score: f64,
    pub confidence: f64,
    #[serde(default)]
    pub rationale: String,
}

/// The provider's pick when asked to finalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalChoice {
    pub option: TradeOption,
    pub confidence: f64,
    pub reason: String,
}

/// The terminal output of a reasoning session.
///
/// Sizing is in percent of balance. Decisions never reference their trace;
/// the trace points at [`Decision::id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: DecisionId,
    pub agent_id: AgentId,
    pub session_id: SessionId,
    pub action: TradeAction,
    pub size_pct: f64,
    pub leverage: f64,
    pub stop_loss_pct: Option<f64>,
    pub take_profit_pct: Option<f64>,
    pub confidence: f64,
    pub reason: String,
    /// Recomputed for audit after the loop ends; never drives the decision
    #[serde(default)]
    pub signal_scores: SignalScores,
    pub created_at: DateTime<Utc>,
}

impl Decision {
    /// The conservative no-op.
    pub fn hold(
        agent_id: AgentId,
        session_id: SessionId,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: DecisionId::generate(),
            agent_id,
            session_id,
            action: TradeAction::Hold,
            size_pct: 0.0,
            leverage: 1.0,
            stop_loss_pct: None,
            take_profit_pct: None,
            confidence: confidence.clamp(0.0, 1.0),
            reason: reason.into(),
            signal_scores: SignalScores::default(),
            created_at: Utc::now(),
        }
    }

    pub fn from_option(
        agent_id: AgentId,
        session_id: SessionId,
        option: &TradeOption,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            action: option.action,
            size_pct: option.size_pct,
            leverage: option.leverage,
            stop_loss_pct: option.stop_loss_pct,
            take_profit_pct: option.take_profit_pct,
            ..Self::hold(agent_id, session_id, confidence, reason)
        }
    }

    /// Nothing to execute.
    pub fn is_no_op(&self) -> bool {
        self.action == TradeAction::Hold || (self.action.opens_position() && self.size_pct <= 0.0)
    }

    /// Clamp sizing to the agent's limits and fill default stops.
    ///
    /// Opening decisions below `min_confidence` become holds.
    pub fn constrained_by(mut self, limits: &StrategyLimits) -> Self {
        if self.action.opens_position() && self.confidence < limits.min_confidence {
            let reason = format!(
                "confidence {:.2} below minimum {:.2}; was: {} ({})",
                self.confidence, limits.min_confidence, self.action, self.reason
            );
            self.action = TradeAction::Hold;
            self.size_pct = 0.0;
            self.leverage = 1.0;
            self.stop_loss_pct = None;
            self.take_profit_pct = None;
            self.reason = reason;
            return self;
        }
        if self.action.opens_position() {
            self.size_pct = finite_or(self.size_pct, 0.0).clamp(0.0, limits.max_position_pct);
            self.leverage = finite_or(self.leverage, 1.0).clamp(1.0, limits.max_leverage);
            self.stop_loss_pct = Some(
                self.stop_loss_pct
                    .filter(|x| x.is_finite() && *x > 0.0)
                    .unwrap_or(limits.stop_loss_pct),
            );
            self.take_profit_pct = Some(
                self.take_profit_pct
                    .filter(|x| x.is_finite() && *x > 0.0)
                    .unwrap_or(limits.take_profit_pct),
            );
        }
        self.confidence = finite_or(self.confidence, 0.0).clamp(0.0, 1.0);
        self
    }

    pub fn with_signal_scores(mut self, scores: SignalScores) -> Self {
        self.signal_scores = scores;
        self
    }

    pub fn headline(&self) -> String {
        if self.action.opens_position() {
            format!(
                "{} {:.1}% x{:.1} @ conf {:.2}",
                self.action, self.size_pct, self.leverage, self.confidence
            )
        } else {
            format!("{} @ conf {:.2}", self.action, self.confidence)
        }
    }
}

fn finite_or(x: f64, fallback: f64) -> f64 {
    if x.is_finite() { x } else { fallback }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_option(size: f64, leverage: f64) -> TradeOption {
        TradeOption {
            action: TradeAction::Long,
            size_pct: size,
            leverage,
            stop_loss_pct: None,
            take_profit_pct: Some(8.0),
            rationale: "breakout".to_string(),
        }
    }

    #[test]
    fn test_trade_action_aliases() {
        assert_eq!("BUY".parse::<TradeAction>().unwrap(), TradeAction::Long);
        assert_eq!(" sell ".parse::<TradeAction>().unwrap(), TradeAction::Short);
        assert_eq!("exit".parse::<TradeAction>().unwrap(), TradeAction::Close);
        assert_eq!("wait".parse::<TradeAction>().unwrap(), TradeAction::Hold);
        assert!("moon".parse::<TradeAction>().is_err());
    }

    #[test]
    fn test_constrained_clamps_sizing_and_fills_stops() {
        let limits = StrategyLimits::default();
        let decision = Decision::from_option(
            AgentId::new("a"),
            SessionId::generate(),
            &long_option(80.0, 50.0),
            0.9,
            "go",
        )
        .constrained_by(&limits);

        assert_eq!(decision.action, TradeAction::Long);
        assert_eq!(decision.size_pct, limits.max_position_pct);
        assert_eq!(decision.leverage, limits.max_leverage);
        assert_eq!(decision.stop_loss_pct, Some(limits.stop_loss_pct));
        assert_eq!(decision.take_profit_pct, Some(8.0));
    }

    #[test]
    fn test_constrained_low_confidence_becomes_hold() {
        let decision = Decision::from_option(
            AgentId::new("a"),
            SessionId::generate(),
            &long_option(10.0, 2.0),
            0.4,
            "weak",
        )
        .constrained_by(&StrategyLimits::default());

        assert_eq!(decision.action, TradeAction::Hold);
        assert!(decision.is_no_op());
        assert!(decision.reason.contains("below minimum"));
    }

    #[test]
    fn test_is_no_op() {
        let hold = Decision::hold(AgentId::new("a"), SessionId::generate(), 0.0, "nothing");
        assert!(hold.is_no_op());

        let zero = Decision::from_option(
            AgentId::new("a"),
            SessionId::generate(),
            &long_option(0.0, 1.0),
            0.9,
            "",
        );
        assert!(zero.is_no_op());

        let close = Decision::from_option(
            AgentId::new("a"),
            SessionId::generate(),
            &TradeOption { action: TradeAction::Close, ..TradeOption::hold("take profit") },
            0.9,
            "",
        );
        assert!(!close.is_no_op());
    }

    #[test]
    fn test_option_deserialize_defaults() {
        let option: TradeOption = serde_json::from_str(r#"{"action": "short"}"#).unwrap();
        assert_eq!(option.action, TradeAction::Short);
        assert_eq!(option.leverage, 1.0);
        assert_eq!(option.size_pct, 0.0);
    }
}
