//! Actuator port
//!
//! Executes an approved decision against a trading venue. Failures propagate
//! as ordinary errors; the cycle records them on the decision.

use async_trait::async_trait;
use fleet_domain::{AgentRuntimeState, Decision, ExecutionReport};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActuatorError {
    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("Insufficient balance: need {needed:.2}, have {available:.2}")]
    InsufficientBalance { needed: f64, available: f64 },

    #[error("No open position to close")]
    NoPosition,

    #[error("Venue error: {0}")]
    Venue(String),
}

#[async_trait]
pub trait Actuator: Send + Sync {
    fn name(&self) -> &str;

    /// Execute `decision` at the current `price`
    async fn execute(
        &self,
        decision: &Decision,
        state: &AgentRuntimeState,
        price: f64,
    ) -> Result<ExecutionReport, ActuatorError>;
}
