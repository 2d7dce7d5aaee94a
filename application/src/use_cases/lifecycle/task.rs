//! The per-agent task: owns the agent's runtime state, runs one cycle per
//! decision interval and answers commands from the manager.

use super::cycle::CycleReport;
use super::{AgentSlot, FleetServices};
use crate::config::LifecycleParams;
use crate::ports::actuator::Actuator;
use crate::ports::audit_log::AuditEvent;
use crate::ports::lease::LeaseService;
use crate::ports::notifier::FleetNotification;
use crate::use_cases::planning::Planner;
use crate::use_cases::reasoning_loop::ReasoningLoop;
use crate::use_cases::reflection::Reflector;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fleet_domain::{AgentConfig, AgentId, AgentRuntimeState};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shortest decision interval a task will schedule
const MIN_DECISION_INTERVAL: Duration = Duration::from_secs(1);

pub(crate) enum AgentCommand {
    /// Run one cycle now and report it
    RunCycle { reply: oneshot::Sender<CycleReport> },
    /// Stop trading; sent right before the task's token is cancelled
    Stop { reason: String },
}

/// Why a task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskExit {
    Stopped(String),
    Shutdown,
    /// Renewal reported the lease lost; nothing is persisted or released
    LeaseLost,
}

/// Published by the task after every change
#[derive(Debug, Clone)]
pub struct AgentStatus {
    pub state: AgentRuntimeState,
    pub started_at: DateTime<Utc>,
    pub last_cycle: Option<CycleReport>,
}

pub(crate) struct AgentTask {
    pub(super) instance: Uuid,
    pub(super) agent: AgentConfig,
    pub(super) state: AgentRuntimeState,
    pub(super) services: Arc<FleetServices>,
    pub(super) params: LifecycleParams,
    pub(super) actuator: Arc<dyn Actuator>,
    pub(super) reasoning: ReasoningLoop,
    pub(super) planner: Planner,
    pub(super) reflector: Reflector,
    pub(super) cancel: CancellationToken,
    pub(super) lease_lost: Arc<AtomicBool>,
    pub(super) status: watch::Sender<AgentStatus>,
    pub(super) running: Arc<DashMap<AgentId, AgentSlot>>,
}

impl AgentTask {
    pub(super) async fn run(mut self, mut commands: mpsc::Receiver<AgentCommand>) -> TaskExit {
        let renewal = spawn_renewal(
            self.services.lease.clone(),
            self.agent.id.clone(),
            self.params.lease_renewal_interval(),
            self.cancel.clone(),
            self.lease_lost.clone(),
        );

        let mut ticker = tokio::time::interval(self.agent.decision_interval().max(MIN_DECISION_INTERVAL));
        // an unfinished cycle swallows the ticks it overlaps
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let exit = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break self.exit_reason(&mut commands),
                command = commands.recv() => match command {
                    Some(AgentCommand::RunCycle { reply }) => {
                        let report = self.cycle().await;
                        let _ = reply.send(report);
                    }
                    Some(AgentCommand::Stop { reason }) => break TaskExit::Stopped(reason),
                    None => break TaskExit::Shutdown,
                },
                _ = ticker.tick() => {
                    self.cycle().await;
                }
            }
        };

        renewal.abort();
        self.finish(&exit).await;
        exit
    }

    fn exit_reason(&self, commands: &mut mpsc::Receiver<AgentCommand>) -> TaskExit {
        if self.lease_lost.load(Ordering::SeqCst) {
            return TaskExit::LeaseLost;
        }
        while let Ok(command) = commands.try_recv() {
            if let AgentCommand::Stop { reason } = command {
                return TaskExit::Stopped(reason);
            }
        }
        TaskExit::Shutdown
    }

    pub(super) fn publish(&self, last_cycle: Option<CycleReport>) {
        self.status.send_modify(|status| {
            status.state = self.state.clone();
            if last_cycle.is_some() {
                status.last_cycle = last_cycle;
            }
        });
    }

    async fn finish(&mut self, exit: &TaskExit) {
        let id = self.agent.id.clone();
        let reason = match exit {
            TaskExit::Stopped(reason) => reason.clone(),
            TaskExit::Shutdown => "shutdown".to_string(),
            TaskExit::LeaseLost => "lease lost".to_string(),
        };

        // a newer instance owns the lease now; leave it and its state alone
        let superseded = self.running.get(&id).is_some_and(|slot| {
            slot.instance()
                .is_some_and(|instance| instance != self.instance)
        });
        if *exit != TaskExit::LeaseLost && !superseded {
            if matches!(exit, TaskExit::Stopped(_)) {
                self.state.set_trading(false);
            }
            if let Err(e) = self.services.states.upsert(&self.state).await {
                warn!(agent_id = %id, "Failed to persist final state: {}", e);
            }
            if let Err(e) = self.services.lease.release(&id).await {
                warn!(agent_id = %id, "Failed to release lease: {}", e);
            }
        }
        self.publish(None);

        self.running
            .remove_if(&id, |_, slot| slot.instance() == Some(self.instance));

        let notification = FleetNotification::AgentStopped {
            agent_id: id.clone(),
            reason: reason.clone(),
        };
        if let Err(e) = self.services.notifier.notify(&notification).await {
            warn!(agent_id = %id, "Stop notification failed: {}", e);
        }
        self.services.audit.log(AuditEvent::new(
            "agent_stopped",
            json!({ "agent_id": id, "reason": reason, "cycles": self.state.cycles }),
        ));
        info!(agent_id = %id, reason = %reason, "Agent task finished");
    }
}

/// Renew the lease every `every` until cancelled; a lost lease cancels the
/// agent's token.
fn spawn_renewal(
    lease: Arc<dyn LeaseService>,
    agent_id: AgentId,
    every: Duration,
    cancel: CancellationToken,
    lost: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => match lease.renew(&agent_id).await {
                    Ok(true) => debug!(agent_id = %agent_id, "Lease renewed"),
                    Ok(false) => {
                        warn!(agent_id = %agent_id, "Lease lost, stopping agent");
                        lost.store(true, Ordering::SeqCst);
                        cancel.cancel();
                        break;
                    }
                    // the lease may still be valid; try again next tick
                    Err(e) => warn!(agent_id = %agent_id, "Lease renewal failed: {}", e),
                },
            }
        }
    })
}
