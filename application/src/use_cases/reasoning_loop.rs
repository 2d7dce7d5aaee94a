//! Reasoning loop use case
//!
//! Drives one [`ReasoningSession`] from `thinking` to a decision, or to an
//! interruption with a checkpoint:
//!
//! ```text
//! checkpoint? ──yes──▶ resume at next_iteration (observation refreshed)
//!      │no
//!      ▼
//! recall memories ─▶ ┌───────────────────────────────────────┐
//!                    │ ceiling? ─▶ finalize                  │
//!                    │ provider.decide ─▶ meta-action        │
//!                    │ execute side effect on a state copy   │
//!                    │ commit copy + step                    │
//!                    │ decide with evaluations? ─▶ finalize  │
//!                    └───────────────────────────────────────┘
//! ```
//!
//! Cancellation is raced against every provider call. The state copy of an
//! unfinished iteration is dropped, so a checkpoint always reflects the last
//! completed iteration.

use crate::config::ReasoningParams;
use crate::ports::audit_log::{AuditEvent, AuditLog, NoAuditLog};
use crate::ports::capability::{CapabilityContext, CapabilityPort};
use crate::ports::notifier::{FleetNotification, NoNotifier, Notifier};
use crate::ports::persistence::CheckpointStore;
use crate::ports::reasoning_provider::{
    DecideRequest, EvaluateRequest, FinalDecisionRequest, OptionsRequest, Prompt,
    ReasoningProvider,
};
use crate::use_cases::memory_store::MemoryStore;
use chrono::Utc;
use fleet_domain::reasoning::parsing::{parse_evaluation, parse_final_choice, parse_options};
use fleet_domain::reasoning::{RaisedAlert, ToolOutcome, parse_meta_action};
use fleet_domain::{
    AgentConfig, AgentId, AgentRuntimeState, Capability, Checkpoint, Decision, MarketSnapshot,
    MetaAction, MetaActionChoice, PromptTemplate, ReasoningSession, ReasoningState,
    ReasoningTrace, SessionId, SignalScores, TerminationReason, ThoughtStep,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReasoningError {
    #[error("Runtime state belongs to agent {found}, not {expected}")]
    AgentMismatch { expected: AgentId, found: AgentId },

    #[error("Invalid reasoning parameters: {0}")]
    InvalidParams(String),
}

/// How a run ended
#[derive(Debug, Clone)]
pub enum ReasoningOutcome {
    Decided {
        decision: Decision,
        trace: ReasoningTrace,
    },
    /// Cancelled mid-loop. `checkpointed` is false when the checkpoint
    /// could not be written; the next run then starts from scratch.
    Interrupted {
        session_id: SessionId,
        checkpointed: bool,
    },
}

impl ReasoningOutcome {
    pub fn decision(&self) -> Option<&Decision> {
        match self {
            ReasoningOutcome::Decided { decision, .. } => Some(decision),
            ReasoningOutcome::Interrupted { .. } => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, ReasoningOutcome::Interrupted { .. })
    }
}

/// Result of one iteration before it is committed
struct IterationResult {
    state: ReasoningState,
    step: ThoughtStep,
    decide: bool,
}

pub struct ReasoningLoop {
    provider: Arc<dyn ReasoningProvider>,
    capabilities: Arc<dyn CapabilityPort>,
    memory: Arc<MemoryStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    audit: Arc<dyn AuditLog>,
    notifier: Arc<dyn Notifier>,
    params: ReasoningParams,
}

impl ReasoningLoop {
    pub fn new(
        provider: Arc<dyn ReasoningProvider>,
        capabilities: Arc<dyn CapabilityPort>,
        memory: Arc<MemoryStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        params: ReasoningParams,
    ) -> Self {
        Self {
            provider,
            capabilities,
            memory,
            checkpoints,
            audit: Arc::new(NoAuditLog),
            notifier: Arc::new(NoNotifier),
            params,
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn params(&self) -> &ReasoningParams {
        &self.params
    }

    /// Reason until a decision, a ceiling, or cancellation.
    pub async fn run(
        &self,
        agent: &AgentConfig,
        runtime: &AgentRuntimeState,
        observation: MarketSnapshot,
        plan_summary: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<ReasoningOutcome, ReasoningError> {
        if runtime.agent_id != agent.id {
            return Err(ReasoningError::AgentMismatch {
                expected: agent.id.clone(),
                found: runtime.agent_id.clone(),
            });
        }
        if self.params.max_iterations == 0 {
            return Err(ReasoningError::InvalidParams(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        let clock = Instant::now();
        let mut session = self.open_session(agent, observation, plan_summary).await;

        if !session.resumed && self.params.recall_k > 0 {
            let situation = session.state.observation.summary();
            let recalled = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                memories = self.recall(agent, &situation) => Some(memories),
            };
            let Some(memories) = recalled else {
                return Ok(self.interrupt(&mut session).await);
            };
            session.state.add_memories(memories);
        }

        let termination = loop {
            if cancel.is_cancelled() {
                return Ok(self.interrupt(&mut session).await);
            }
            let iteration = session.state.next_iteration;
            if iteration >= self.params.max_iterations {
                break TerminationReason::IterationCeiling;
            }
            if clock.elapsed() >= self.params.max_duration {
                break TerminationReason::TimeCeiling;
            }

            let completed = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.iterate(agent, runtime, &session, iteration) => Some(result),
            };
            let Some(result) = completed else {
                return Ok(self.interrupt(&mut session).await);
            };

            debug!(
                agent_id = %agent.id,
                iteration,
                action = result.step.action.kind(),
                "Reasoning step"
            );
            session.state = result.state;
            session.push_step(result.step);
            if result.decide {
                break TerminationReason::Decided;
            }
        };

        let finalized = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            decision = self.finalize(agent, &session, termination) => Some(decision),
        };
        let Some(decision) = finalized else {
            return Ok(self.interrupt(&mut session).await);
        };
        session.complete(decision.clone());

        if let Err(e) = self.checkpoints.delete(&agent.id).await {
            warn!(agent_id = %agent.id, "Failed to delete checkpoint: {}", e);
        }

        let trace = ReasoningTrace {
            session_id: session.id,
            agent_id: agent.id.clone(),
            decision_id: decision.id,
            steps: session.steps().to_vec(),
            termination,
            resumed: session.resumed,
            memories_used: session.state.memories.len(),
            options_generated: session.state.options.len(),
            elapsed_ms: clock.elapsed().as_millis() as u64,
            created_at: Utc::now(),
        };

        info!(
            agent_id = %agent.id,
            iterations = trace.iterations(),
            termination = %termination,
            decision = %decision.headline(),
            "Reasoning finished"
        );
        self.audit
            .log(AuditEvent::from_serializable("reasoning_trace", &trace));
        self.audit.log(AuditEvent::from_serializable("decision", &decision));

        Ok(ReasoningOutcome::Decided { decision, trace })
    }

    async fn open_session(
        &self,
        agent: &AgentConfig,
        observation: MarketSnapshot,
        plan_summary: Option<String>,
    ) -> ReasoningSession {
        match self.checkpoints.load(&agent.id).await {
            Ok(Some(stored)) => {
                match Checkpoint::from_json(&stored.json).filter(|c| c.agent_id == agent.id) {
                    Some(checkpoint) => {
                        info!(
                            agent_id = %agent.id,
                            session_id = %checkpoint.session_id,
                            next_iteration = checkpoint.next_iteration(),
                            "Resuming interrupted reasoning session"
                        );
                        return ReasoningSession::resume(checkpoint, observation);
                    }
                    None => {
                        warn!(
                            agent_id = %agent.id,
                            session_id = %stored.session_id,
                            "Discarding unreadable checkpoint"
                        );
                        if let Err(e) = self.checkpoints.delete(&agent.id).await {
                            warn!(agent_id = %agent.id, "Failed to delete checkpoint: {}", e);
                        }
                    }
                }
            }
            Ok(None) => {}
            Err(e) => warn!(agent_id = %agent.id, "Checkpoint load failed, starting fresh: {}", e),
        }
        ReasoningSession::new(agent.id.clone(), observation, plan_summary)
    }

    async fn interrupt(&self, session: &mut ReasoningSession) -> ReasoningOutcome {
        let checkpoint = session.interrupt();
        let checkpointed = match checkpoint.to_json() {
            Ok(json) => match self
                .checkpoints
                .save(&session.agent_id, session.id, json)
                .await
            {
                Ok(()) => true,
                Err(e) => {
                    warn!(agent_id = %session.agent_id, "Checkpoint write failed: {}", e);
                    false
                }
            },
            Err(e) => {
                warn!(agent_id = %session.agent_id, "Checkpoint encoding failed: {}", e);
                false
            }
        };
        info!(
            agent_id = %session.agent_id,
            session_id = %session.id,
            completed_steps = session.steps().len(),
            checkpointed,
            "Reasoning interrupted"
        );
        ReasoningOutcome::Interrupted {
            session_id: session.id,
            checkpointed,
        }
    }

    async fn recall(&self, agent: &AgentConfig, situation: &str) -> Vec<fleet_domain::ScoredMemory> {
        match self
            .memory
            .recall_relevant(&agent.id, agent.archetype, situation, self.params.recall_k)
            .await
        {
            Ok(memories) => memories,
            Err(e) => {
                if e.is_embedding_unavailable() {
                    debug!(agent_id = %agent.id, "Memory recall unavailable: {}", e);
                } else {
                    warn!(agent_id = %agent.id, "Memory recall failed: {}", e);
                }
                Vec::new()
            }
        }
    }

    fn system_prompt(&self, agent: &AgentConfig) -> String {
        PromptTemplate::reasoning_system(agent)
    }

    async fn iterate(
        &self,
        agent: &AgentConfig,
        runtime: &AgentRuntimeState,
        session: &ReasoningSession,
        iteration: u32,
    ) -> IterationResult {
        let mut state = session.state.clone();

        let request = DecideRequest {
            agent,
            state: &state,
            iteration,
            prompt: Prompt::new(
                self.system_prompt(agent),
                PromptTemplate::iteration_prompt(
                    agent,
                    &state,
                    session.steps(),
                    iteration,
                    self.params.max_iterations,
                ),
            ),
        };
        let choice = match self.provider.decide(&request).await {
            Ok(response) => parse_meta_action(&response),
            Err(e) => {
                warn!(agent_id = %agent.id, iteration, "Meta-action request failed: {}", e);
                MetaActionChoice::fallback(&format!("provider error: {}", e))
            }
        };
        if choice.malformed {
            debug!(agent_id = %agent.id, iteration, "Malformed meta-action, treating as decide");
        }

        let step = ThoughtStep::new(
            iteration,
            choice.action.clone(),
            choice.reasoning,
            choice.confidence,
        );
        let (step, decide) = self
            .execute(agent, runtime, &mut state, step, choice.action, iteration)
            .await;

        IterationResult {
            state,
            step,
            decide,
        }
    }

    /// Apply one meta-action's side effect. Returns the annotated step and
    /// whether the loop should finalize.
    async fn execute(
        &self,
        agent: &AgentConfig,
        runtime: &AgentRuntimeState,
        state: &mut ReasoningState,
        step: ThoughtStep,
        action: MetaAction,
        iteration: u32,
    ) -> (ThoughtStep, bool) {
        match action {
            MetaAction::UseCapability { tool, args } => {
                let context = CapabilityContext {
                    agent_id: &agent.id,
                    archetype: agent.archetype,
                    observation: &state.observation,
                    balance: runtime.balance,
                };
                let result = match Capability::parse(&tool, &args) {
                    Ok(capability) => self.capabilities.invoke(&context, &capability).await,
                    Err(e) => Err(e),
                };
                let (success, output) = match result {
                    Ok(output) => (true, output),
                    Err(e) => {
                        warn!(agent_id = %agent.id, tool = %tool, "Capability failed: {}", e);
                        (false, e.to_string())
                    }
                };
                state.tool_results.push(ToolOutcome {
                    iteration,
                    tool: tool.clone(),
                    args: args.clone(),
                    success,
                    output: output.clone(),
                });
                (step.with_tool(tool, args, output), false)
            }

            MetaAction::AskSelfQuestion { question } => {
                let answer = state.answer_self_question(&question);
                (step.with_question(question, answer), false)
            }

            MetaAction::RecallMemory { query } => {
                let query = query.unwrap_or_else(|| state.observation.summary());
                let added = state.add_memories(self.recall(agent, &query).await);
                (step.with_note(format!("recalled {} new memories", added)), false)
            }

            MetaAction::GenerateOptions => {
                let request = OptionsRequest {
                    agent,
                    state,
                    iteration,
                    prompt: Prompt::new(
                        self.system_prompt(agent),
                        PromptTemplate::options_prompt(agent, state),
                    ),
                };
                let note = match self.provider.generate_options(&request).await {
                    Ok(response) => {
                        let options = parse_options(&response);
                        if options.is_empty() {
                            "no usable options in response".to_string()
                        } else {
                            let count = options.len();
                            state.set_options(options);
                            format!("{} options generated", count)
                        }
                    }
                    Err(e) => {
                        warn!(agent_id = %agent.id, "Option generation failed: {}", e);
                        format!("option generation failed: {}", e)
                    }
                };
                (step.with_note(note), false)
            }

            MetaAction::EvaluateOption { option_index } => {
                let Some(index) = state.evaluation_target(option_index) else {
                    return (step.with_note("no option left to evaluate"), false);
                };
                let option = state.options[index].clone();
                let request = EvaluateRequest {
                    agent,
                    state,
                    iteration,
                    option_index: index,
                    prompt: Prompt::new(
                        self.system_prompt(agent),
                        PromptTemplate::evaluate_prompt(state, index, &option),
                    ),
                };
                let note = match self.provider.evaluate_option(&request).await {
                    Ok(response) => match parse_evaluation(&response, index) {
                        Some(evaluation) => {
                            let note = format!(
                                "option {} scored {:.2} (confidence {:.2})",
                                index, evaluation.score, evaluation.confidence
                            );
                            state.record_evaluation(evaluation);
                            note
                        }
                        None => format!("evaluation of option {} was unusable", index),
                    },
                    Err(e) => {
                        warn!(agent_id = %agent.id, option = index, "Evaluation failed: {}", e);
                        format!("evaluation of option {} failed: {}", index, e)
                    }
                };
                (step.with_note(note), false)
            }

            MetaAction::LogInsight { insight } => {
                state.insights.push(insight);
                (step, false)
            }

            MetaAction::RaiseAlert { priority, message } => {
                state.alerts.push(RaisedAlert {
                    iteration,
                    priority,
                    message: message.clone(),
                });
                let notification = FleetNotification::Alert {
                    agent_id: agent.id.clone(),
                    priority,
                    message,
                };
                if let Err(e) = self.notifier.notify(&notification).await {
                    warn!(agent_id = %agent.id, "Alert notification failed: {}", e);
                }
                (step, false)
            }

            MetaAction::Reconsider => {
                let dropped = state.reconsider();
                (step.with_note(format!("dropped {} options", dropped)), false)
            }

            MetaAction::Decide => {
                if state.has_evaluations() {
                    (step, true)
                } else {
                    (step.with_note("no evaluated option yet, continuing"), false)
                }
            }
        }
    }

    async fn finalize(
        &self,
        agent: &AgentConfig,
        session: &ReasoningSession,
        termination: TerminationReason,
    ) -> Decision {
        let state = &session.state;
        let scores = SignalScores::compute(&state.observation, &agent.signal_weights);

        let Some((best, best_eval)) = state.best_evaluation() else {
            return Decision::hold(
                agent.id.clone(),
                session.id,
                0.0,
                format!("no option evaluated before the {}", termination),
            )
            .with_signal_scores(scores);
        };

        let request = FinalDecisionRequest {
            agent,
            state,
            iteration: state.next_iteration,
            prompt: Prompt::new(
                self.system_prompt(agent),
                PromptTemplate::final_decision_prompt(agent, state),
            ),
        };
        let choice = match self.provider.make_final_decision(&request).await {
            Ok(response) => parse_final_choice(&response, &state.options),
            Err(e) => {
                warn!(agent_id = %agent.id, "Final decision request failed: {}", e);
                None
            }
        };

        let decision = match choice {
            Some(choice) => Decision::from_option(
                agent.id.clone(),
                session.id,
                &choice.option,
                choice.confidence,
                choice.reason,
            ),
            None => Decision::from_option(
                agent.id.clone(),
                session.id,
                best,
                best_eval.confidence,
                format!("best evaluated option: {}", best_eval.rationale),
            ),
        };
        decision.constrained_by(&agent.limits).with_signal_scores(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::persistence::StoredCheckpoint;
    use crate::ports::reasoning_provider::{
        PlanRequest, ProviderError, ReviewRequest, SummarizeRequest,
    };
    use crate::use_cases::memory_store::tests::{VecRepository, WordEmbedder};
    use crate::use_cases::test_support::{EchoCapabilities, MemoryCheckpoints};
    use async_trait::async_trait;
    use fleet_domain::reasoning::TradeAction;
    use fleet_domain::{Archetype, MemoryPolicy};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers `decide` from a per-iteration script; everything else is fixed.
    struct ScriptedProvider {
        script: Vec<&'static str>,
        fallback: &'static str,
        decide_delay: Option<Duration>,
        /// Cancelled (then never answers) on the first evaluation
        cancel_on_evaluate: Option<CancellationToken>,
        evaluations: AtomicUsize,
        final_fails: bool,
    }

    impl ScriptedProvider {
        fn new(script: Vec<&'static str>) -> Self {
            Self {
                script,
                fallback: r#"{"action": "decide"}"#,
                decide_delay: None,
                cancel_on_evaluate: None,
                evaluations: AtomicUsize::new(0),
                final_fails: false,
            }
        }

        fn standard() -> Self {
            Self::new(vec![
                r#"{"action": "generate_options", "reasoning": "need choices"}"#,
                r#"{"action": "evaluate_option", "option_index": 0}"#,
                r#"{"action": "decide", "reasoning": "enough"}"#,
            ])
        }
    }

    #[async_trait]
    impl ReasoningProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn decide(&self, request: &DecideRequest<'_>) -> Result<String, ProviderError> {
            if let Some(delay) = self.decide_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self
                .script
                .get(request.iteration as usize)
                .copied()
                .unwrap_or(self.fallback)
                .to_string())
        }

        async fn generate_options(&self, _: &OptionsRequest<'_>) -> Result<String, ProviderError> {
            Ok(r#"{"options": [
                {"action": "long", "size_pct": 10, "leverage": 2, "rationale": "trend"},
                {"action": "hold", "rationale": "wait"}
            ]}"#
            .to_string())
        }

        async fn evaluate_option(&self, _: &EvaluateRequest<'_>) -> Result<String, ProviderError> {
            if self.evaluations.fetch_add(1, Ordering::SeqCst) == 0
                && let Some(token) = &self.cancel_on_evaluate
            {
                token.cancel();
                std::future::pending::<()>().await;
            }
            Ok(r#"{"score": 0.8, "confidence": 0.7, "rationale": "solid"}"#.to_string())
        }

        async fn make_final_decision(
            &self,
            _: &FinalDecisionRequest<'_>,
        ) -> Result<String, ProviderError> {
            if self.final_fails {
                return Err(ProviderError::Timeout);
            }
            Ok(r#"{"option_index": 0, "confidence": 0.8, "reason": "trend intact"}"#.to_string())
        }

        async fn reflect(&self, _: &ReviewRequest<'_>) -> Result<String, ProviderError> {
            Err(ProviderError::Unsupported("reflect"))
        }

        async fn self_analyze(&self, _: &ReviewRequest<'_>) -> Result<String, ProviderError> {
            Err(ProviderError::Unsupported("self_analyze"))
        }

        async fn create_plan(&self, _: &PlanRequest<'_>) -> Result<String, ProviderError> {
            Err(ProviderError::Unsupported("create_plan"))
        }

        async fn summarize_memory(&self, _: &SummarizeRequest<'_>) -> Result<String, ProviderError> {
            Err(ProviderError::Unsupported("summarize_memory"))
        }
    }

    fn agent() -> AgentConfig {
        AgentConfig::new("agent-1", "owner", Archetype::Balanced)
    }

    fn runtime() -> AgentRuntimeState {
        AgentRuntimeState::new(AgentId::new("agent-1"), "BTCUSDT", 1_000.0)
    }

    fn snapshot(price: f64) -> MarketSnapshot {
        MarketSnapshot::new("BTCUSDT", price)
    }

    fn reasoning_loop(
        provider: ScriptedProvider,
        checkpoints: Arc<MemoryCheckpoints>,
        params: ReasoningParams,
    ) -> ReasoningLoop {
        let memory = MemoryStore::new(
            Arc::new(VecRepository::default()),
            Arc::new(WordEmbedder),
            MemoryPolicy::default(),
        );
        ReasoningLoop::new(
            Arc::new(provider),
            Arc::new(EchoCapabilities),
            Arc::new(memory),
            checkpoints,
            params,
        )
    }

    fn decided(outcome: ReasoningOutcome) -> (Decision, ReasoningTrace) {
        match outcome {
            ReasoningOutcome::Decided { decision, trace } => (decision, trace),
            ReasoningOutcome::Interrupted { .. } => panic!("expected a decision"),
        }
    }

    #[tokio::test]
    async fn test_decides_after_evaluation() {
        let checkpoints = Arc::new(MemoryCheckpoints::default());
        let lp = reasoning_loop(ScriptedProvider::standard(), checkpoints, ReasoningParams::default());

        let outcome = lp
            .run(&agent(), &runtime(), snapshot(100.0), None, &CancellationToken::new())
            .await
            .unwrap();
        let (decision, trace) = decided(outcome);

        assert_eq!(decision.action, TradeAction::Long);
        assert_eq!(decision.size_pct, 10.0);
        assert_eq!(decision.confidence, 0.8);
        assert_eq!(decision.reason, "trend intact");
        assert!(decision.stop_loss_pct.is_some());
        assert_eq!(trace.termination, TerminationReason::Decided);
        assert_eq!(trace.iterations(), 3);
        assert_eq!(trace.decision_id, decision.id);
        assert_eq!(trace.options_generated, 2);
        assert!(!trace.resumed);
    }

    #[tokio::test]
    async fn test_malformed_output_acts_as_decide_and_holds_at_ceiling() {
        let mut provider = ScriptedProvider::new(vec![]);
        provider.fallback = "I think we should buy, probably";
        let lp = reasoning_loop(
            provider,
            Arc::new(MemoryCheckpoints::default()),
            ReasoningParams::default().with_max_iterations(3),
        );

        let (decision, trace) = decided(
            lp.run(&agent(), &runtime(), snapshot(100.0), None, &CancellationToken::new())
                .await
                .unwrap(),
        );

        // decide without evaluations is ignored until the ceiling
        assert_eq!(trace.iterations(), 3);
        assert!(trace.steps.iter().all(|s| s.action == MetaAction::Decide));
        assert!(trace.steps.iter().all(|s| s.note.is_some()));
        assert_eq!(trace.termination, TerminationReason::IterationCeiling);
        assert_eq!(decision.action, TradeAction::Hold);
        assert_eq!(decision.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_ceiling_with_evaluations_falls_back_to_best_option() {
        let mut provider = ScriptedProvider::new(vec![
            r#"{"action": "generate_options"}"#,
            r#"{"action": "evaluate_option"}"#,
        ]);
        provider.fallback = r#"{"action": "log_insight", "insight": "still thinking"}"#;
        provider.final_fails = true;
        let lp = reasoning_loop(
            provider,
            Arc::new(MemoryCheckpoints::default()),
            ReasoningParams::default().with_max_iterations(4),
        );

        let (decision, trace) = decided(
            lp.run(&agent(), &runtime(), snapshot(100.0), None, &CancellationToken::new())
                .await
                .unwrap(),
        );
        assert_eq!(trace.termination, TerminationReason::IterationCeiling);
        assert_eq!(decision.action, TradeAction::Long);
        assert_eq!(decision.confidence, 0.7);
        assert!(decision.reason.contains("solid"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wall_clock_ceiling() {
        let mut provider = ScriptedProvider::new(vec![]);
        provider.fallback = r#"{"action": "reconsider"}"#;
        provider.decide_delay = Some(Duration::from_secs(1));
        let lp = reasoning_loop(
            provider,
            Arc::new(MemoryCheckpoints::default()),
            ReasoningParams::default().with_max_duration(Duration::from_secs(2)),
        );

        let (decision, trace) = decided(
            lp.run(&agent(), &runtime(), snapshot(100.0), None, &CancellationToken::new())
                .await
                .unwrap(),
        );
        assert_eq!(trace.termination, TerminationReason::TimeCeiling);
        assert_eq!(trace.iterations(), 2);
        assert_eq!(decision.action, TradeAction::Hold);
    }

    #[tokio::test]
    async fn test_unknown_capability_is_recorded_and_loop_continues() {
        let provider = ScriptedProvider::new(vec![
            r#"{"action": "use_capability", "tool": "launch_rockets"}"#,
            r#"{"action": "use_capability", "tool": "risk", "args": {"size_pct": 5}}"#,
            r#"{"action": "generate_options"}"#,
            r#"{"action": "evaluate_option"}"#,
        ]);
        let lp = reasoning_loop(
            provider,
            Arc::new(MemoryCheckpoints::default()),
            ReasoningParams::default(),
        );

        let (_, trace) = decided(
            lp.run(&agent(), &runtime(), snapshot(100.0), None, &CancellationToken::new())
                .await
                .unwrap(),
        );
        assert_eq!(trace.termination, TerminationReason::Decided);
        assert!(trace.steps[0].tool_result.as_deref().unwrap().contains("launch_rockets"));
        assert_eq!(trace.steps[1].tool_result.as_deref(), Some("risk ok"));
    }

    #[tokio::test]
    async fn test_interrupt_and_resume_reproduces_decision() {
        let agent = agent();
        let runtime = runtime();

        let reference = reasoning_loop(
            ScriptedProvider::standard(),
            Arc::new(MemoryCheckpoints::default()),
            ReasoningParams::default(),
        );
        let (expected, _) = decided(
            reference
                .run(&agent, &runtime, snapshot(100.0), None, &CancellationToken::new())
                .await
                .unwrap(),
        );

        let checkpoints = Arc::new(MemoryCheckpoints::default());
        let cancel = CancellationToken::new();
        let mut provider = ScriptedProvider::standard();
        provider.cancel_on_evaluate = Some(cancel.clone());
        let first = reasoning_loop(provider, checkpoints.clone(), ReasoningParams::default());

        let outcome = first
            .run(&agent, &runtime, snapshot(100.0), None, &cancel)
            .await
            .unwrap();
        let ReasoningOutcome::Interrupted {
            session_id,
            checkpointed,
        } = outcome
        else {
            panic!("expected an interruption");
        };
        assert!(checkpointed);

        let stored = checkpoints.rows.lock().unwrap().get(&agent.id).cloned().unwrap();
        assert_eq!(stored.session_id, session_id);
        let checkpoint = Checkpoint::from_json(&stored.json).unwrap();
        // only the generate_options iteration completed
        assert_eq!(checkpoint.next_iteration(), 1);
        assert_eq!(checkpoint.steps.len(), 1);
        assert_eq!(checkpoint.state.options.len(), 2);

        let second = reasoning_loop(
            ScriptedProvider::standard(),
            checkpoints.clone(),
            ReasoningParams::default(),
        );
        let (resumed, trace) = decided(
            second
                .run(&agent, &runtime, snapshot(105.0), None, &CancellationToken::new())
                .await
                .unwrap(),
        );

        assert!(trace.resumed);
        assert_eq!(trace.session_id, session_id);
        assert_eq!(trace.iterations(), 3);
        assert_eq!(resumed.action, expected.action);
        assert_eq!(resumed.size_pct, expected.size_pct);
        assert_eq!(resumed.leverage, expected.leverage);
        assert_eq!(resumed.stop_loss_pct, expected.stop_loss_pct);
        assert_eq!(resumed.confidence, expected.confidence);
        assert_eq!(resumed.reason, expected.reason);
        assert!(checkpoints.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_checkpoint_starts_fresh() {
        let checkpoints = Arc::new(MemoryCheckpoints::default());
        checkpoints.rows.lock().unwrap().insert(
            AgentId::new("agent-1"),
            StoredCheckpoint {
                session_id: SessionId::generate(),
                json: "{not json".to_string(),
            },
        );
        let lp = reasoning_loop(
            ScriptedProvider::standard(),
            checkpoints.clone(),
            ReasoningParams::default(),
        );

        let (_, trace) = decided(
            lp.run(&agent(), &runtime(), snapshot(100.0), None, &CancellationToken::new())
                .await
                .unwrap(),
        );
        assert!(!trace.resumed);
        assert_eq!(trace.iterations(), 3);
        // stale row deleted on load, then again on completion
        assert_eq!(checkpoints.deletes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rejects_foreign_runtime_state() {
        let lp = reasoning_loop(
            ScriptedProvider::standard(),
            Arc::new(MemoryCheckpoints::default()),
            ReasoningParams::default(),
        );
        let other = AgentRuntimeState::new(AgentId::new("agent-2"), "BTCUSDT", 10.0);
        let err = lp
            .run(&agent(), &other, snapshot(1.0), None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ReasoningError::AgentMismatch { .. }));
    }
}
