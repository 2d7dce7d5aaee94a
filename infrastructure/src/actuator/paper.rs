//! Paper trading actuator.
//!
//! Fills every order at the observed price adjusted by a fixed slippage and
//! charges a fee on notional. One position per agent; an opposite-side open
//! closes the current position first. Margin stays part of the reported
//! balance, so `balance_after` moves only by fees and realized PnL.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use fleet_application::ports::actuator::{Actuator, ActuatorError};
use fleet_domain::{AgentId, AgentRuntimeState, Decision, ExecutionReport, TradeAction};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct PaperPosition {
    /// `Long` or `Short`
    pub side: TradeAction,
    pub quantity: f64,
    pub entry_price: f64,
    pub margin: f64,
}

impl PaperPosition {
    fn direction(&self) -> f64 {
        if self.side == TradeAction::Short { -1.0 } else { 1.0 }
    }

    fn pnl_at(&self, price: f64) -> f64 {
        self.direction() * (price - self.entry_price) * self.quantity
    }
}

struct Settlement {
    realized: f64,
    notional: f64,
    fill: f64,
    fee: f64,
}

pub struct PaperActuator {
    positions: DashMap<AgentId, PaperPosition>,
    /// As a fraction (0.001 = 0.1%)
    slippage_pct: f64,
    fee_rate: f64,
}

impl Default for PaperActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperActuator {
    /// Frictionless fills
    pub fn new() -> Self {
        Self::with_costs(0.0, 0.0)
    }

    pub fn with_costs(slippage_pct: f64, fee_rate: f64) -> Self {
        Self {
            positions: DashMap::new(),
            slippage_pct: slippage_pct.max(0.0),
            fee_rate: fee_rate.max(0.0),
        }
    }

    pub fn position(&self, agent_id: &AgentId) -> Option<PaperPosition> {
        self.positions.get(agent_id).map(|p| p.clone())
    }

    /// Buying fills higher, selling lower
    fn fill_price(&self, price: f64, buying: bool) -> f64 {
        if buying {
            price * (1.0 + self.slippage_pct)
        } else {
            price * (1.0 - self.slippage_pct)
        }
    }

    /// Realized PnL net of the closing fee
    fn settle(&self, position: &PaperPosition, price: f64) -> Settlement {
        let fill = self.fill_price(price, position.side == TradeAction::Short);
        let notional = fill * position.quantity;
        let fee = notional * self.fee_rate;
        Settlement {
            realized: position.pnl_at(fill) - fee,
            notional,
            fill,
            fee,
        }
    }

    fn close(
        &self,
        decision: &Decision,
        state: &AgentRuntimeState,
        price: f64,
    ) -> Result<ExecutionReport, ActuatorError> {
        let (_, position) = self
            .positions
            .remove(&decision.agent_id)
            .ok_or(ActuatorError::NoPosition)?;
        let settled = self.settle(&position, price);
        Ok(ExecutionReport {
            decision_id: decision.id,
            action: TradeAction::Close,
            price: settled.fill,
            quantity: position.quantity,
            notional: settled.notional,
            fee: settled.fee,
            realized_pnl: Some(settled.realized),
            balance_after: Some(state.balance + settled.realized),
            executed_at: Utc::now(),
        })
    }

    fn open(
        &self,
        decision: &Decision,
        state: &AgentRuntimeState,
        price: f64,
    ) -> Result<ExecutionReport, ActuatorError> {
        if !(decision.size_pct > 0.0) {
            return Err(ActuatorError::Rejected(format!(
                "position size must be positive, got {}%",
                decision.size_pct
            )));
        }

        let entry = self.positions.entry(decision.agent_id.clone());
        let mut balance = state.balance;
        let mut realized = None;
        let mut committed = 0.0;

        if let Entry::Occupied(occupied) = &entry {
            let current = occupied.get();
            if current.side == decision.action {
                committed = current.margin;
            } else {
                let pnl = self.settle(current, price).realized;
                balance += pnl;
                realized = Some(pnl);
            }
        }

        let margin = state.balance * decision.size_pct / 100.0;
        let leverage = decision.leverage.max(1.0);
        let fill = self.fill_price(price, decision.action == TradeAction::Long);
        let notional = margin * leverage;
        let fee = notional * self.fee_rate;
        let available = balance - committed;
        if margin + fee > available {
            return Err(ActuatorError::InsufficientBalance {
                needed: margin + fee,
                available,
            });
        }
        let quantity = notional / fill;

        let opened = PaperPosition {
            side: decision.action,
            quantity,
            entry_price: fill,
            margin,
        };
        match entry {
            Entry::Occupied(mut occupied) if realized.is_none() => {
                let current = occupied.get_mut();
                let total = current.quantity + quantity;
                current.entry_price =
                    (current.entry_price * current.quantity + fill * quantity) / total;
                current.quantity = total;
                current.margin += margin;
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(opened);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(opened);
            }
        }

        Ok(ExecutionReport {
            decision_id: decision.id,
            action: decision.action,
            price: fill,
            quantity,
            notional,
            fee,
            realized_pnl: realized,
            balance_after: Some(balance - fee),
            executed_at: Utc::now(),
        })
    }
}

#[async_trait]
impl Actuator for PaperActuator {
    fn name(&self) -> &str {
        "paper"
    }

    async fn execute(
        &self,
        decision: &Decision,
        state: &AgentRuntimeState,
        price: f64,
    ) -> Result<ExecutionReport, ActuatorError> {
        if !(price.is_finite() && price > 0.0) {
            return Err(ActuatorError::Venue(format!("no usable price: {}", price)));
        }
        let report = match decision.action {
            TradeAction::Hold => {
                return Err(ActuatorError::Rejected(
                    "hold decisions are not executed".to_string(),
                ));
            }
            TradeAction::Close => self.close(decision, state, price)?,
            TradeAction::Long | TradeAction::Short => self.open(decision, state, price)?,
        };
        info!(
            agent_id = %decision.agent_id,
            action = %report.action,
            price = report.price,
            quantity = report.quantity,
            realized = ?report.realized_pnl,
            "Paper fill"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_domain::{SessionId, TradeOption};

    fn decision(action: TradeAction, size_pct: f64, leverage: f64) -> Decision {
        let agent = AgentId::new("paper");
        let mut decision = Decision::hold(agent, SessionId::generate(), 0.9, "test");
        decision.action = action;
        decision.size_pct = size_pct;
        decision.leverage = leverage;
        decision
    }

    fn state(balance: f64) -> AgentRuntimeState {
        AgentRuntimeState::new(AgentId::new("paper"), "BTCUSDT", balance)
    }

    #[tokio::test]
    async fn test_open_then_close_realizes_pnl() {
        let actuator = PaperActuator::new();
        let account = state(1_000.0);

        let opened = actuator
            .execute(&decision(TradeAction::Long, 10.0, 2.0), &account, 100.0)
            .await
            .unwrap();
        assert_eq!(opened.notional, 200.0);
        assert_eq!(opened.quantity, 2.0);
        assert_eq!(opened.balance_after, Some(1_000.0));
        assert!(opened.realized_pnl.is_none());

        let closed = actuator
            .execute(&decision(TradeAction::Close, 0.0, 1.0), &account, 110.0)
            .await
            .unwrap();
        assert_eq!(closed.realized_pnl, Some(20.0));
        assert_eq!(closed.balance_after, Some(1_020.0));
        assert!(actuator.position(&AgentId::new("paper")).is_none());
    }

    #[tokio::test]
    async fn test_close_without_position() {
        let actuator = PaperActuator::new();
        let err = actuator
            .execute(&decision(TradeAction::Close, 0.0, 1.0), &state(1_000.0), 100.0)
            .await
            .unwrap_err();
        assert_eq!(err, ActuatorError::NoPosition);
    }

    #[tokio::test]
    async fn test_opposite_open_flips_the_position() {
        let actuator = PaperActuator::new();
        let account = state(1_000.0);
        actuator
            .execute(&decision(TradeAction::Long, 10.0, 1.0), &account, 100.0)
            .await
            .unwrap();

        let flipped = actuator
            .execute(&decision(TradeAction::Short, 10.0, 1.0), &account, 90.0)
            .await
            .unwrap();
        assert_eq!(flipped.realized_pnl, Some(-10.0));
        let position = actuator.position(&AgentId::new("paper")).unwrap();
        assert_eq!(position.side, TradeAction::Short);
        assert_eq!(position.entry_price, 90.0);
    }

    #[tokio::test]
    async fn test_adding_beyond_balance_is_refused() {
        let actuator = PaperActuator::with_costs(0.0, 0.001);
        let account = state(1_000.0);
        actuator
            .execute(&decision(TradeAction::Long, 60.0, 1.0), &account, 100.0)
            .await
            .unwrap();

        let err = actuator
            .execute(&decision(TradeAction::Long, 60.0, 1.0), &account, 100.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ActuatorError::InsufficientBalance { .. }));
    }

    #[tokio::test]
    async fn test_hold_is_rejected() {
        let actuator = PaperActuator::new();
        let hold = Decision::from_option(
            AgentId::new("paper"),
            SessionId::generate(),
            &TradeOption::hold("flat"),
            0.5,
            "nothing to do",
        );
        let err = actuator
            .execute(&hold, &state(1_000.0), 100.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ActuatorError::Rejected(_)));
    }
}
