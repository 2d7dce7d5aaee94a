//! Reflection use case
//!
//! The periodic learning step: review recent decisions, store the lessons as
//! memories and nudge the agent's signal weights.

use crate::ports::audit_log::{AuditEvent, AuditLog, NoAuditLog};
use crate::ports::persistence::{AgentRepository, JournalRepository, PersistenceError};
use crate::ports::reasoning_provider::{Prompt, ReasoningProvider, ReviewRequest};
use crate::use_cases::memory_store::MemoryStore;
use fleet_domain::reasoning::parsing::{parse_reflection, parse_self_analysis};
use fleet_domain::{
    AgentConfig, AgentPromptTemplate, AgentRuntimeState, Experience, ReflectionRecord,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Importance given to lessons distilled by reflection
const LESSON_IMPORTANCE: f64 = 0.7;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReflectionError {
    #[error("Reflection persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}

pub struct Reflector {
    provider: Arc<dyn ReasoningProvider>,
    journal: Arc<dyn JournalRepository>,
    agents: Arc<dyn AgentRepository>,
    memory: Arc<MemoryStore>,
    audit: Arc<dyn AuditLog>,
    window: usize,
}

impl Reflector {
    pub fn new(
        provider: Arc<dyn ReasoningProvider>,
        journal: Arc<dyn JournalRepository>,
        agents: Arc<dyn AgentRepository>,
        memory: Arc<MemoryStore>,
        window: usize,
    ) -> Self {
        Self {
            provider,
            journal,
            agents,
            memory,
            audit: Arc::new(NoAuditLog),
            window,
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    /// Run one reflection round.
    ///
    /// Returns `Ok(None)` when the round is skipped: no decisions to review,
    /// or the provider failed. A weight adjustment is applied to `agent` and
    /// persisted.
    pub async fn reflect(
        &self,
        agent: &mut AgentConfig,
        runtime: &AgentRuntimeState,
    ) -> Result<Option<ReflectionRecord>, ReflectionError> {
        let records = self.journal.recent_decisions(&agent.id, self.window).await?;
        if records.is_empty() {
            debug!(agent_id = %agent.id, "Nothing to reflect on");
            return Ok(None);
        }

        let request = ReviewRequest {
            agent,
            runtime,
            records: &records,
            prompt: Prompt::new(
                AgentPromptTemplate::reflection_system(),
                AgentPromptTemplate::reflection_prompt(agent, runtime, &records),
            ),
        };
        let reflection = match self.provider.reflect(&request).await {
            Ok(response) => match parse_reflection(&response) {
                Some(reflection) => reflection,
                None => {
                    warn!(agent_id = %agent.id, "Unparsable reflection, skipping round");
                    return Ok(None);
                }
            },
            Err(e) => {
                warn!(agent_id = %agent.id, "Reflection failed, skipping round: {}", e);
                return Ok(None);
            }
        };

        let analysis_request = ReviewRequest {
            prompt: Prompt::new(
                AgentPromptTemplate::reflection_system(),
                AgentPromptTemplate::self_analysis_prompt(agent, runtime, &records),
            ),
            ..request
        };
        let analysis = match self.provider.self_analyze(&analysis_request).await {
            Ok(response) => parse_self_analysis(&response),
            Err(e) => {
                warn!(agent_id = %agent.id, "Self-analysis failed: {}", e);
                None
            }
        };

        let mut record = ReflectionRecord::new(agent.id.clone(), reflection, records.len());
        record.analysis = analysis;

        if let Some(adjustment) = record.reflection.weight_adjustment.clone() {
            let before = agent.signal_weights.clone();
            agent.apply_weight_adjustment(&adjustment);
            self.agents.save(agent).await?;
            info!(
                agent_id = %agent.id,
                before = ?before.as_array(),
                after = ?agent.signal_weights.as_array(),
                "Signal weights adjusted"
            );
            record.applied_adjustment = Some(adjustment);
        }

        let outcome = format!(
            "win rate {:.0}% over {} decisions, cumulative PnL {:+.2}",
            runtime.win_rate() * 100.0,
            records.len(),
            runtime.cumulative_pnl
        );
        let mut stored = 0;
        for lesson in &record.reflection.lessons {
            let mut experience =
                Experience::new(record.reflection.summary.clone(), "reflection", outcome.clone())
                    .with_lesson(lesson.clone())
                    .with_importance(LESSON_IMPORTANCE);
            experience.success = Some(runtime.win_rate() >= 0.5);
            match self.memory.store(&agent.id, agent.archetype, &experience).await {
                Ok(_) => stored += 1,
                Err(e) => warn!(agent_id = %agent.id, "Failed to store lesson: {}", e),
            }
        }

        self.journal.append_reflection(&record).await?;
        self.audit
            .log(AuditEvent::from_serializable("reflection", &record));
        info!(
            agent_id = %agent.id,
            reviewed = record.decisions_reviewed,
            lessons = stored,
            adjusted = record.applied_adjustment.is_some(),
            "Reflection complete"
        );
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::memory_store::tests::{VecRepository, WordEmbedder};
    use crate::use_cases::test_support::{CannedProvider, MemoryAgents, MemoryJournal};
    use fleet_domain::{
        AgentId, Archetype, Decision, DecisionDisposition, DecisionRecord, MemoryPolicy, SessionId,
    };

    fn agent() -> AgentConfig {
        AgentConfig::new("agent-1", "owner", Archetype::Balanced)
    }

    async fn journal_with_decisions(n: usize) -> Arc<MemoryJournal> {
        let journal = Arc::new(MemoryJournal::default());
        for _ in 0..n {
            let decision = Decision::hold(AgentId::new("agent-1"), SessionId::generate(), 0.4, "flat");
            journal
                .append_decision(&DecisionRecord::new(decision, DecisionDisposition::NoOp))
                .await
                .unwrap();
        }
        journal
    }

    fn reflector(
        provider: CannedProvider,
        journal: Arc<MemoryJournal>,
        agents: Arc<MemoryAgents>,
        repo: Arc<VecRepository>,
    ) -> Reflector {
        let memory = MemoryStore::new(repo, Arc::new(WordEmbedder), MemoryPolicy::default());
        Reflector::new(Arc::new(provider), journal, agents, Arc::new(memory), 20)
    }

    #[tokio::test]
    async fn test_reflection_stores_lessons_and_adjusts_weights() {
        let provider = CannedProvider {
            reflection: Some(
                r#"{"summary": "too passive", "lessons": ["act on strong RSI", "size up on volume"],
                    "weight_adjustment": {"technical": 0.1, "news": -0.05, "onchain": 0, "sentiment": 0}}"#
                    .to_string(),
            ),
            analysis: Some(r#"{"assessment": "hesitant", "weaknesses": ["late entries"]}"#.to_string()),
            ..Default::default()
        };
        let journal = journal_with_decisions(3).await;
        let agents = Arc::new(MemoryAgents::with([agent()]));
        let repo = Arc::new(VecRepository::default());
        let reflector = reflector(provider, journal.clone(), agents.clone(), repo.clone());

        let mut config = agent();
        let before = config.signal_weights.clone();
        let runtime = AgentRuntimeState::new(config.id.clone(), "BTCUSDT", 1_000.0);
        let record = reflector.reflect(&mut config, &runtime).await.unwrap().unwrap();

        assert_eq!(record.decisions_reviewed, 3);
        assert_eq!(record.analysis.as_ref().unwrap().assessment, "hesitant");
        assert!(record.applied_adjustment.is_some());
        assert!(config.signal_weights.technical > before.technical);
        assert!(config.signal_weights.is_normalized(1e-9));
        assert_eq!(
            agents.configs.lock().unwrap()[&config.id].signal_weights,
            config.signal_weights
        );
        assert_eq!(repo.personal.lock().unwrap().len(), 2);
        assert_eq!(journal.reflections.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_skips_round() {
        let journal = journal_with_decisions(2).await;
        let agents = Arc::new(MemoryAgents::with([agent()]));
        let reflector = reflector(
            CannedProvider::default(),
            journal.clone(),
            agents,
            Arc::new(VecRepository::default()),
        );

        let mut config = agent();
        let before = config.signal_weights.clone();
        let runtime = AgentRuntimeState::new(config.id.clone(), "BTCUSDT", 1_000.0);
        assert!(reflector.reflect(&mut config, &runtime).await.unwrap().is_none());
        assert_eq!(config.signal_weights, before);
        assert!(journal.reflections.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_decisions_skips_provider() {
        let reflector = reflector(
            CannedProvider {
                reflection: Some(r#"{"summary": "x"}"#.to_string()),
                ..Default::default()
            },
            Arc::new(MemoryJournal::default()),
            Arc::new(MemoryAgents::default()),
            Arc::new(VecRepository::default()),
        );
        let mut config = agent();
        let runtime = AgentRuntimeState::new(config.id.clone(), "BTCUSDT", 1_000.0);
        assert!(reflector.reflect(&mut config, &runtime).await.unwrap().is_none());
    }
}
