//! One periodic cycle of an agent:
//!
//! ```text
//! observe ─▶ enrich sentiment ─▶ plan ─▶ reason ─▶ no-op? ─▶ stop
//!                                            │
//!                        validate (if required) ─▶ blocked? ─▶ record
//!                                            │
//!                                 actuate ─▶ book outcome ─▶ record + remember
//!
//! every N cycles: reflect / consolidate memory
//! ```

use super::task::AgentTask;
use crate::config::LifecycleParams;
use crate::ports::audit_log::AuditEvent;
use crate::ports::notifier::FleetNotification;
use crate::use_cases::memory_store::ConsolidationReport;
use crate::use_cases::reasoning_loop::ReasoningOutcome;
use fleet_domain::{
    ConsensusResult, Decision, DecisionDisposition, DecisionRecord, ExecutionReport, Experience,
    MarketSnapshot, ValidationRequest,
};
use tracing::{debug, info, warn};

/// How a cycle ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    ObservationFailed(String),
    ReasoningFailed(String),
    /// Cancelled mid-reasoning; the session was checkpointed
    Interrupted,
    /// Cancelled after deciding, before actuation
    Abandoned,
    NoOp,
    Blocked(ConsensusResult),
    Executed(ExecutionReport),
    ExecutionFailed(String),
}

impl CycleOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::ObservationFailed(_) => "observation failed",
            CycleOutcome::ReasoningFailed(_) => "reasoning failed",
            CycleOutcome::Interrupted => "interrupted",
            CycleOutcome::Abandoned => "abandoned",
            CycleOutcome::NoOp => "no-op",
            CycleOutcome::Blocked(_) => "blocked",
            CycleOutcome::Executed(_) => "executed",
            CycleOutcome::ExecutionFailed(_) => "execution failed",
        }
    }

    /// Whether the cycle ran to a decision and counts toward schedules
    pub fn is_complete(&self) -> bool {
        matches!(
            self,
            CycleOutcome::NoOp
                | CycleOutcome::Blocked(_)
                | CycleOutcome::Executed(_)
                | CycleOutcome::ExecutionFailed(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub outcome: CycleOutcome,
    pub decision: Option<Decision>,
    pub reflected: bool,
    pub consolidation: Option<ConsolidationReport>,
}

impl CycleReport {
    fn new(cycle: u64, outcome: CycleOutcome) -> Self {
        Self {
            cycle,
            outcome,
            decision: None,
            reflected: false,
            consolidation: None,
        }
    }
}

impl AgentTask {
    pub(super) async fn cycle(&mut self) -> CycleReport {
        let cycle = self.state.cycles + 1;
        let report = self.run_cycle(cycle).await;
        info!(
            agent_id = %self.agent.id,
            cycle,
            outcome = report.outcome.label(),
            "Cycle finished"
        );
        self.publish(Some(report.clone()));
        report
    }

    async fn run_cycle(&mut self, cycle: u64) -> CycleReport {
        let id = self.agent.id.clone();

        let mut snapshot = match self.services.observation.observe(&self.state.target).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(agent_id = %id, symbol = %self.state.target, "Observation failed: {}", e);
                return CycleReport::new(cycle, CycleOutcome::ObservationFailed(e.to_string()));
            }
        };
        if self.services.consensus.has_sentiment_voters() && !snapshot.news.is_empty() {
            let scored = self.services.consensus.enrich_snapshot(&mut snapshot).await;
            debug!(agent_id = %id, scored, "Sentiment enrichment");
        }

        let plan_summary = if self.params.planning {
            self.planner
                .current_plan(&self.agent, &self.state, &snapshot)
                .await
                .map(|plan| plan.summary())
        } else {
            None
        };

        let outcome = self
            .reasoning
            .run(&self.agent, &self.state, snapshot.clone(), plan_summary, &self.cancel)
            .await;
        let decision = match outcome {
            Ok(ReasoningOutcome::Decided { decision, .. }) => decision,
            Ok(ReasoningOutcome::Interrupted { .. }) => {
                return CycleReport::new(cycle, CycleOutcome::Interrupted);
            }
            Err(e) => {
                warn!(agent_id = %id, "Reasoning failed: {}", e);
                return CycleReport::new(cycle, CycleOutcome::ReasoningFailed(e.to_string()));
            }
        };

        let outcome = self.act(&decision, &snapshot).await;
        let mut report = CycleReport::new(cycle, outcome);
        report.decision = Some(decision);
        if !report.outcome.is_complete() {
            return report;
        }

        self.state.complete_cycle();
        if LifecycleParams::is_due(self.params.reflection_every, self.state.cycles) {
            report.reflected = self.reflect().await;
        }
        if LifecycleParams::is_due(self.params.consolidation_every, self.state.cycles) {
            report.consolidation = match self
                .services
                .memory
                .consolidate(&id, self.params.forget_threshold)
                .await
            {
                Ok(consolidation) => Some(consolidation),
                Err(e) => {
                    warn!(agent_id = %id, "Memory consolidation failed: {}", e);
                    None
                }
            };
        }
        if let Err(e) = self.services.states.upsert(&self.state).await {
            warn!(agent_id = %id, "Failed to persist runtime state: {}", e);
        }
        report
    }

    /// Validate and execute a decision, then record it.
    async fn act(&mut self, decision: &Decision, snapshot: &MarketSnapshot) -> CycleOutcome {
        if decision.is_no_op() {
            self.record(DecisionRecord::new(decision.clone(), DecisionDisposition::NoOp))
                .await;
            return CycleOutcome::NoOp;
        }

        let consensus = if self
            .params
            .requires_validation(decision.action, decision.confidence)
            && self.services.consensus.voter_count() > 0
        {
            let request = ValidationRequest {
                decision: decision.clone(),
                archetype: self.agent.archetype,
                market_summary: snapshot.summary(),
                balance: self.state.balance,
            };
            let result = self.services.consensus.validate(&request).await;
            self.services
                .audit
                .log(AuditEvent::from_serializable("consensus_result", &result));
            if !result.allows_execution() {
                info!(
                    agent_id = %self.agent.id,
                    verdict = %result.verdict,
                    votes = %result.vote_summary(),
                    "Decision blocked by consensus"
                );
                let record = DecisionRecord::new(
                    decision.clone(),
                    DecisionDisposition::Blocked {
                        verdict: result.verdict.to_string(),
                    },
                )
                .with_consensus(Some(result.clone()));
                self.record(record).await;
                return CycleOutcome::Blocked(result);
            }
            Some(result)
        } else {
            None
        };

        if self.cancel.is_cancelled() {
            info!(agent_id = %self.agent.id, "Cancelled before execution");
            return CycleOutcome::Abandoned;
        }

        match self
            .actuator
            .execute(decision, &self.state, snapshot.price)
            .await
        {
            Ok(execution) => {
                self.book(&execution);
                let record = DecisionRecord::new(decision.clone(), DecisionDisposition::Executed)
                    .with_consensus(consensus)
                    .with_execution(execution.clone());
                self.record(record).await;
                self.remember(decision, &execution, snapshot).await;

                let notification = FleetNotification::DecisionExecuted {
                    decision: decision.clone(),
                    price: execution.price,
                };
                if let Err(e) = self.services.notifier.notify(&notification).await {
                    warn!(agent_id = %self.agent.id, "Execution notification failed: {}", e);
                }
                CycleOutcome::Executed(execution)
            }
            Err(e) => {
                warn!(
                    agent_id = %self.agent.id,
                    actuator = self.actuator.name(),
                    "Execution failed: {}",
                    e
                );
                let record = DecisionRecord::new(
                    decision.clone(),
                    DecisionDisposition::ExecutionFailed {
                        error: e.to_string(),
                    },
                )
                .with_consensus(consensus);
                self.record(record).await;
                CycleOutcome::ExecutionFailed(e.to_string())
            }
        }
    }

    /// Apply an execution report to the runtime state.
    fn book(&mut self, execution: &ExecutionReport) {
        if let Some(pnl) = execution.realized_pnl {
            self.state.record_realized(pnl);
        }
        if let Some(balance) = execution.balance_after {
            self.state.balance = balance;
            self.state.set_equity(balance);
        }
    }

    async fn record(&self, record: DecisionRecord) {
        if let Err(e) = self.services.journal.append_decision(&record).await {
            warn!(agent_id = %self.agent.id, "Failed to append decision record: {}", e);
        }
    }

    async fn remember(&self, decision: &Decision, execution: &ExecutionReport, snapshot: &MarketSnapshot) {
        let outcome = match execution.realized_pnl {
            Some(pnl) => format!("filled at {:.4}, realized {:+.2}", execution.price, pnl),
            None => format!("filled at {:.4}", execution.price),
        };
        let mut experience = Experience::new(snapshot.summary(), decision.headline(), outcome);
        if let Some(pnl) = execution.realized_pnl
            && self.state.initial_budget > 0.0
        {
            experience = experience.with_pnl(pnl / self.state.initial_budget * 100.0);
        }
        if let Err(e) = self
            .services
            .memory
            .store(&self.agent.id, self.agent.archetype, &experience)
            .await
        {
            debug!(agent_id = %self.agent.id, "Experience not stored: {}", e);
        }
    }

    async fn reflect(&mut self) -> bool {
        match self.reflector.reflect(&mut self.agent, &self.state).await {
            Ok(record) => record.is_some(),
            Err(e) => {
                warn!(agent_id = %self.agent.id, "Reflection failed: {}", e);
                false
            }
        }
    }
}
