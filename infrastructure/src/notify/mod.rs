//! Notifier adapters

use async_trait::async_trait;
use fleet_application::ports::notifier::{FleetNotification, Notifier, NotifyError};
use fleet_domain::reasoning::AlertPriority;
use tracing::{error, info, warn};

/// Writes notifications to the log under the `fleet::notify` target.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: &FleetNotification) -> Result<(), NotifyError> {
        match notification {
            FleetNotification::AgentStarted { agent_id, target } => {
                info!(target: "fleet::notify", agent_id = %agent_id, symbol = %target, "Agent started");
            }
            FleetNotification::AgentStopped { agent_id, reason } => {
                info!(target: "fleet::notify", agent_id = %agent_id, reason = %reason, "Agent stopped");
            }
            FleetNotification::Alert {
                agent_id,
                priority,
                message,
            } => match priority {
                AlertPriority::Critical | AlertPriority::High => {
                    error!(target: "fleet::notify", agent_id = %agent_id, priority = ?priority, "{}", message);
                }
                AlertPriority::Medium => {
                    warn!(target: "fleet::notify", agent_id = %agent_id, "{}", message);
                }
                AlertPriority::Low => {
                    info!(target: "fleet::notify", agent_id = %agent_id, "{}", message);
                }
            },
            FleetNotification::DecisionExecuted { decision, price } => {
                info!(
                    target: "fleet::notify",
                    agent_id = %decision.agent_id,
                    price,
                    "Executed {}",
                    decision.headline()
                );
            }
        }
        Ok(())
    }
}
