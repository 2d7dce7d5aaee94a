//! Agent lifecycle manager
//!
//! Owns one task per locally running agent. The fleet-wide lease guarantees
//! that at most one process runs a given agent; the local map only answers
//! "is it running here".
//!
//! | Operation | Fails with |
//! |-----------|------------|
//! | [`AgentLifecycleManager::start`] | `AlreadyRunningLocally`, `LeaseHeldElsewhere`, `AgentNotFound`, `InactiveAgent` |
//! | [`AgentLifecycleManager::stop`] | `NotRunning` |
//! | [`AgentLifecycleManager::restore_all`] | persistence errors only; held leases are skipped |
//! | [`AgentLifecycleManager::shutdown`] | never; bounded by the grace period |

mod cycle;
mod task;

pub use cycle::{CycleOutcome, CycleReport};
pub use task::{AgentStatus, TaskExit};

use crate::config::FleetConfig;
use crate::ports::actuator::Actuator;
use crate::ports::audit_log::{AuditEvent, AuditLog};
use crate::ports::capability::CapabilityPort;
use crate::ports::lease::{LeaseError, LeaseService};
use crate::ports::notifier::{FleetNotification, Notifier};
use crate::ports::observation::ObservationSource;
use crate::ports::persistence::{
    AgentRepository, CheckpointStore, JournalRepository, PersistenceError, StateRepository,
};
use crate::ports::reasoning_provider::ReasoningProvider;
use crate::use_cases::consensus::ConsensusEngine;
use crate::use_cases::memory_store::MemoryStore;
use crate::use_cases::planning::Planner;
use crate::use_cases::reasoning_loop::ReasoningLoop;
use crate::use_cases::reflection::Reflector;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use fleet_domain::{AgentId, AgentRuntimeState, DomainError};
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use task::{AgentCommand, AgentTask};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("Agent {0} is already running in this process")]
    AlreadyRunningLocally(AgentId),

    #[error("Agent {0} is held by another process")]
    LeaseHeldElsewhere(AgentId),

    #[error("Agent {0} is not running")]
    NotRunning(AgentId),

    #[error("Agent {0} not found")]
    AgentNotFound(AgentId),

    #[error("Agent {0} is inactive")]
    InactiveAgent(AgentId),

    #[error("Fleet is shutting down")]
    ShuttingDown,

    #[error("Invalid agent configuration: {0}")]
    Configuration(#[from] DomainError),

    #[error("Lock service error: {0}")]
    Lease(#[from] LeaseError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl LifecycleError {
    /// Expected outcomes of fleet coordination, not failures
    pub fn is_coordination(&self) -> bool {
        matches!(
            self,
            LifecycleError::AlreadyRunningLocally(_) | LifecycleError::LeaseHeldElsewhere(_)
        )
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LifecycleError::AgentNotFound(_)
                | LifecycleError::InactiveAgent(_)
                | LifecycleError::Configuration(_)
        )
    }
}

/// Collaborators shared by every agent task
pub struct FleetServices {
    pub agents: Arc<dyn AgentRepository>,
    pub states: Arc<dyn StateRepository>,
    pub journal: Arc<dyn JournalRepository>,
    pub checkpoints: Arc<dyn CheckpointStore>,
    pub lease: Arc<dyn LeaseService>,
    pub provider: Arc<dyn ReasoningProvider>,
    pub capabilities: Arc<dyn CapabilityPort>,
    pub memory: Arc<MemoryStore>,
    pub consensus: Arc<ConsensusEngine>,
    pub observation: Arc<dyn ObservationSource>,
    pub notifier: Arc<dyn Notifier>,
    pub audit: Arc<dyn AuditLog>,
    /// Used by [`AgentLifecycleManager::restore_all`]
    pub default_actuator: Arc<dyn Actuator>,
}

pub(crate) enum AgentSlot {
    /// Reserved while `start` acquires the lease
    Starting,
    Running(AgentHandle),
    /// Held by `stop` until the old task is gone and its lease released
    Stopping,
}

impl AgentSlot {
    fn instance(&self) -> Option<Uuid> {
        match self {
            AgentSlot::Starting | AgentSlot::Stopping => None,
            AgentSlot::Running(handle) => Some(handle.instance),
        }
    }

    /// Whether this slot blocks a local `start`
    fn is_occupied(&self) -> bool {
        match self {
            AgentSlot::Starting | AgentSlot::Stopping => true,
            AgentSlot::Running(handle) => handle.is_live(),
        }
    }
}

pub(crate) struct AgentHandle {
    instance: Uuid,
    cancel: CancellationToken,
    commands: mpsc::Sender<AgentCommand>,
    status: watch::Receiver<AgentStatus>,
    join: JoinHandle<TaskExit>,
}

impl AgentHandle {
    fn is_live(&self) -> bool {
        !self.join.is_finished()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreReport {
    pub started: Vec<AgentId>,
    /// Held by another process or already running here
    pub skipped: Vec<AgentId>,
    pub failed: Vec<(AgentId, String)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShutdownReport {
    pub stopped: Vec<AgentId>,
    /// Still busy when the grace period ended; aborted
    pub timed_out: Vec<AgentId>,
}

pub struct AgentLifecycleManager {
    services: Arc<FleetServices>,
    config: FleetConfig,
    running: Arc<DashMap<AgentId, AgentSlot>>,
    root: CancellationToken,
}

impl AgentLifecycleManager {
    pub fn new(services: FleetServices, config: FleetConfig) -> Self {
        Self {
            services: Arc::new(services),
            config,
            running: Arc::new(DashMap::new()),
            root: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// Start an agent. Returns once its task is running.
    pub async fn start(
        &self,
        agent_id: &AgentId,
        target: &str,
        initial_budget: f64,
        actuator: Arc<dyn Actuator>,
    ) -> Result<(), LifecycleError> {
        if self.root.is_cancelled() {
            return Err(LifecycleError::ShuttingDown);
        }
        match self.running.entry(agent_id.clone()) {
            Entry::Occupied(slot) => {
                if slot.get().is_occupied() {
                    return Err(LifecycleError::AlreadyRunningLocally(agent_id.clone()));
                }
                slot.replace_entry(AgentSlot::Starting);
            }
            Entry::Vacant(slot) => {
                slot.insert(AgentSlot::Starting);
            }
        }

        match self.launch(agent_id, target, initial_budget, actuator).await {
            Ok(handle) => {
                self.running
                    .insert(agent_id.clone(), AgentSlot::Running(handle));
                Ok(())
            }
            Err(e) => {
                self.running.remove(agent_id);
                Err(e)
            }
        }
    }

    async fn launch(
        &self,
        agent_id: &AgentId,
        target: &str,
        initial_budget: f64,
        actuator: Arc<dyn Actuator>,
    ) -> Result<AgentHandle, LifecycleError> {
        let services = &self.services;
        let agent = services
            .agents
            .get(agent_id)
            .await?
            .ok_or_else(|| LifecycleError::AgentNotFound(agent_id.clone()))?;
        if !agent.active {
            return Err(LifecycleError::InactiveAgent(agent_id.clone()));
        }
        agent.validate()?;

        if !services.lease.try_acquire(agent_id).await? {
            return Err(LifecycleError::LeaseHeldElsewhere(agent_id.clone()));
        }

        let state = match self.prepare_state(agent_id, target, initial_budget).await {
            Ok(state) => state,
            Err(e) => {
                if let Err(release) = services.lease.release(agent_id).await {
                    warn!(agent_id = %agent_id, "Failed to release lease: {}", release);
                }
                return Err(e);
            }
        };

        let reasoning = ReasoningLoop::new(
            services.provider.clone(),
            services.capabilities.clone(),
            services.memory.clone(),
            services.checkpoints.clone(),
            self.config.reasoning.clone(),
        )
        .with_audit(services.audit.clone())
        .with_notifier(services.notifier.clone());
        let planner = Planner::new(services.provider.clone(), services.journal.clone());
        let reflector = Reflector::new(
            services.provider.clone(),
            services.journal.clone(),
            services.agents.clone(),
            services.memory.clone(),
            self.config.lifecycle.reflection_window,
        )
        .with_audit(services.audit.clone());

        let instance = Uuid::new_v4();
        let cancel = self.root.child_token();
        let (command_tx, command_rx) = mpsc::channel(8);
        let (status_tx, status_rx) = watch::channel(AgentStatus {
            state: state.clone(),
            started_at: Utc::now(),
            last_cycle: None,
        });

        let task = AgentTask {
            instance,
            agent,
            state: state.clone(),
            services: services.clone(),
            params: self.config.lifecycle.clone(),
            actuator,
            reasoning,
            planner,
            reflector,
            cancel: cancel.clone(),
            lease_lost: Arc::new(AtomicBool::new(false)),
            status: status_tx,
            running: self.running.clone(),
        };
        let join = tokio::spawn(task.run(command_rx));

        info!(agent_id = %agent_id, symbol = %state.target, "Agent started");
        let notification = FleetNotification::AgentStarted {
            agent_id: agent_id.clone(),
            target: state.target.clone(),
        };
        if let Err(e) = services.notifier.notify(&notification).await {
            warn!(agent_id = %agent_id, "Start notification failed: {}", e);
        }
        services.audit.log(AuditEvent::new(
            "agent_started",
            json!({ "agent_id": agent_id, "target": state.target, "balance": state.balance }),
        ));

        Ok(AgentHandle {
            instance,
            cancel,
            commands: command_tx,
            status: status_rx,
            join,
        })
    }

    async fn prepare_state(
        &self,
        agent_id: &AgentId,
        target: &str,
        initial_budget: f64,
    ) -> Result<AgentRuntimeState, LifecycleError> {
        let mut state = match self.services.states.load(agent_id).await? {
            Some(mut state) => {
                state.target = target.to_string();
                state
            }
            None => AgentRuntimeState::new(agent_id.clone(), target, initial_budget),
        };
        state.set_trading(true);
        self.services.states.upsert(&state).await?;
        Ok(state)
    }

    /// Stop a local agent: cancel its task, mark it not trading, persist.
    ///
    /// The slot stays `Stopping` until the lease is released, so a `start`
    /// racing this call sees `AlreadyRunningLocally`.
    pub async fn stop(&self, agent_id: &AgentId) -> Result<AgentRuntimeState, LifecycleError> {
        let taken = match self.running.entry(agent_id.clone()) {
            Entry::Occupied(mut slot)
                if matches!(slot.get(), AgentSlot::Running(handle) if handle.is_live()) =>
            {
                match slot.insert(AgentSlot::Stopping) {
                    AgentSlot::Running(handle) => Some(handle),
                    _ => None,
                }
            }
            _ => None,
        };
        let Some(mut handle) = taken else {
            return Err(LifecycleError::NotRunning(agent_id.clone()));
        };
        let state = self.wind_down(agent_id, &mut handle).await;
        self.running
            .remove_if(agent_id, |_, slot| matches!(slot, AgentSlot::Stopping));
        Ok(state)
    }

    async fn wind_down(&self, agent_id: &AgentId, handle: &mut AgentHandle) -> AgentRuntimeState {
        let _ = handle.commands.try_send(AgentCommand::Stop {
            reason: "stopped by operator".to_string(),
        });
        handle.cancel.cancel();

        let grace = self.config.lifecycle.grace_period;
        let exit = match tokio::time::timeout(grace, &mut handle.join).await {
            Ok(Ok(exit)) => Some(exit),
            Ok(Err(e)) => {
                warn!(agent_id = %agent_id, "Agent task panicked: {}", e);
                None
            }
            Err(_) => {
                warn!(agent_id = %agent_id, "Agent task did not stop in time, aborting");
                handle.join.abort();
                None
            }
        };

        let mut state = handle.status.borrow().state.clone();
        match exit {
            Some(TaskExit::Stopped(_)) | Some(TaskExit::LeaseLost) => {}
            _ => {
                state.set_trading(false);
                self.finalize(agent_id, &state).await;
            }
        }
        state
    }

    /// Persist and release on behalf of a task that could not do it itself
    async fn finalize(&self, agent_id: &AgentId, state: &AgentRuntimeState) {
        if let Err(e) = self.services.states.upsert(state).await {
            warn!(agent_id = %agent_id, "Failed to persist final state: {}", e);
        }
        if let Err(e) = self.services.lease.release(agent_id).await {
            warn!(agent_id = %agent_id, "Failed to release lease: {}", e);
        }
    }

    /// Start every agent whose persisted state says it should be trading.
    ///
    /// Each lease is probed first and released right away, so the regular
    /// start path does the real acquisition.
    pub async fn restore_all(&self) -> Result<RestoreReport, LifecycleError> {
        let mut report = RestoreReport::default();
        for state in self.services.states.list_trading().await? {
            let id = state.agent_id.clone();
            if self.is_running(&id) {
                report.skipped.push(id);
                continue;
            }
            match self.services.lease.try_acquire(&id).await {
                Ok(true) => {
                    if let Err(e) = self.services.lease.release(&id).await {
                        warn!(agent_id = %id, "Failed to release probe lease: {}", e);
                    }
                }
                Ok(false) => {
                    info!(agent_id = %id, "Held elsewhere, not restoring");
                    report.skipped.push(id);
                    continue;
                }
                Err(e) => {
                    report.failed.push((id, e.to_string()));
                    continue;
                }
            }

            let actuator = self.services.default_actuator.clone();
            match self
                .start(&id, &state.target, state.initial_budget, actuator)
                .await
            {
                Ok(()) => report.started.push(id),
                Err(e) if e.is_coordination() => report.skipped.push(id),
                Err(e) => {
                    warn!(agent_id = %id, "Restore failed: {}", e);
                    report.failed.push((id, e.to_string()));
                }
            }
        }
        info!(
            started = report.started.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Restore complete"
        );
        Ok(report)
    }

    /// Cancel every local agent and wait for them at most `grace`. Tasks that
    /// finished persisted and released on their own; aborted ones are
    /// finalized here.
    pub async fn shutdown(&self, grace: Duration) -> ShutdownReport {
        let deadline = Instant::now() + grace;
        self.root.cancel();

        let ids: Vec<AgentId> = self.running.iter().map(|e| e.key().clone()).collect();
        let mut handles: Vec<(AgentId, AgentHandle)> = ids
            .into_iter()
            .filter_map(|id| match self.running.remove(&id) {
                Some((id, AgentSlot::Running(handle))) => Some((id, handle)),
                _ => None,
            })
            .collect();

        let waits = handles.iter_mut().map(|(_, handle)| &mut handle.join);
        if tokio::time::timeout_at(deadline, join_all(waits)).await.is_err() {
            warn!("Grace period elapsed with agents still running");
        }

        let mut report = ShutdownReport::default();
        for (id, handle) in handles {
            if handle.join.is_finished() {
                report.stopped.push(id.clone());
                match handle.join.await {
                    Ok(_) => continue,
                    Err(e) => warn!(agent_id = %id, "Agent task panicked: {}", e),
                }
            } else {
                handle.join.abort();
                report.timed_out.push(id.clone());
            }
            let state = handle.status.borrow().state.clone();
            if tokio::time::timeout_at(deadline, self.finalize(&id, &state))
                .await
                .is_err()
            {
                warn!(agent_id = %id, "Final persistence cut off by grace period");
            }
        }
        info!(
            stopped = report.stopped.len(),
            timed_out = report.timed_out.len(),
            "Fleet shut down"
        );
        report
    }

    pub fn is_running(&self, agent_id: &AgentId) -> bool {
        self.running
            .get(agent_id)
            .is_some_and(|slot| slot.value().is_occupied())
    }

    /// Latest status of every live local agent, ordered by id
    pub fn status(&self) -> Vec<(AgentId, AgentStatus)> {
        let mut all: Vec<(AgentId, AgentStatus)> = self
            .running
            .iter()
            .filter_map(|entry| match entry.value() {
                AgentSlot::Running(handle) if handle.is_live() => {
                    Some((entry.key().clone(), handle.status.borrow().clone()))
                }
                _ => None,
            })
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Run one cycle now, outside the agent's schedule.
    pub async fn run_cycle_now(&self, agent_id: &AgentId) -> Result<CycleReport, LifecycleError> {
        let commands = match self.running.get(agent_id).as_deref() {
            Some(AgentSlot::Running(handle)) if handle.is_live() => handle.commands.clone(),
            _ => return Err(LifecycleError::NotRunning(agent_id.clone())),
        };
        let (reply, response) = oneshot::channel();
        commands
            .send(AgentCommand::RunCycle { reply })
            .await
            .map_err(|_| LifecycleError::NotRunning(agent_id.clone()))?;
        response
            .await
            .map_err(|_| LifecycleError::NotRunning(agent_id.clone()))
    }
}
