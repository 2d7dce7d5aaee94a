//! Notifier port
//!
//! Best-effort notifications for operators. Failures are logged by the
//! caller and never escalated.

use async_trait::async_trait;
use fleet_domain::reasoning::AlertPriority;
use fleet_domain::{AgentId, Decision};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotifyError {
    #[error("Notification channel unavailable: {0}")]
    Unavailable(String),

    #[error("Notification rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FleetNotification {
    AgentStarted {
        agent_id: AgentId,
        target: String,
    },
    AgentStopped {
        agent_id: AgentId,
        reason: String,
    },
    Alert {
        agent_id: AgentId,
        priority: AlertPriority,
        message: String,
    },
    DecisionExecuted {
        decision: Decision,
        price: f64,
    },
}

impl FleetNotification {
    pub fn agent_id(&self) -> &AgentId {
        match self {
            FleetNotification::AgentStarted { agent_id, .. }
            | FleetNotification::AgentStopped { agent_id, .. }
            | FleetNotification::Alert { agent_id, .. } => agent_id,
            FleetNotification::DecisionExecuted { decision, .. } => &decision.agent_id,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &FleetNotification) -> Result<(), NotifyError>;
}

/// No-op notifier for tests and headless runs
pub struct NoNotifier;

#[async_trait]
impl Notifier for NoNotifier {
    async fn notify(&self, _notification: &FleetNotification) -> Result<(), NotifyError> {
        Ok(())
    }
}
