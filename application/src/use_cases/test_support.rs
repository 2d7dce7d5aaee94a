//! Hand-written port doubles shared by the use case tests.

use crate::ports::capability::{CapabilityContext, CapabilityPort};
use crate::ports::persistence::{
    AgentRepository, CheckpointStore, JournalRepository, PersistenceError, StateRepository,
    StoredCheckpoint,
};
use crate::ports::reasoning_provider::{
    DecideRequest, EvaluateRequest, FinalDecisionRequest, OptionsRequest, PlanRequest,
    ProviderError, ReasoningProvider, ReviewRequest, SummarizeRequest,
};
use async_trait::async_trait;
use fleet_domain::{
    AgentConfig, AgentId, AgentRuntimeState, Capability, CapabilityError, CapabilityName,
    DecisionRecord, ReflectionRecord, SessionId, TradingPlan,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub(crate) struct MemoryJournal {
    pub decisions: Mutex<Vec<DecisionRecord>>,
    pub reflections: Mutex<Vec<ReflectionRecord>>,
    pub plans: Mutex<Vec<TradingPlan>>,
}

#[async_trait]
impl JournalRepository for MemoryJournal {
    async fn append_decision(&self, record: &DecisionRecord) -> Result<(), PersistenceError> {
        self.decisions.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn recent_decisions(
        &self,
        agent_id: &AgentId,
        limit: usize,
    ) -> Result<Vec<DecisionRecord>, PersistenceError> {
        let all: Vec<_> = self
            .decisions
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.decision.agent_id == agent_id)
            .cloned()
            .collect();
        Ok(all[all.len().saturating_sub(limit)..].to_vec())
    }

    async fn append_reflection(&self, record: &ReflectionRecord) -> Result<(), PersistenceError> {
        self.reflections.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn append_plan(&self, plan: &TradingPlan) -> Result<(), PersistenceError> {
        self.plans.lock().unwrap().push(plan.clone());
        Ok(())
    }

    async fn latest_plan(&self, agent_id: &AgentId) -> Result<Option<TradingPlan>, PersistenceError> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|p| &p.agent_id == agent_id)
            .cloned())
    }
}

#[derive(Default)]
pub(crate) struct MemoryAgents {
    pub configs: Mutex<HashMap<AgentId, AgentConfig>>,
}

impl MemoryAgents {
    pub fn with(configs: impl IntoIterator<Item = AgentConfig>) -> Self {
        Self {
            configs: Mutex::new(configs.into_iter().map(|c| (c.id.clone(), c)).collect()),
        }
    }
}

#[async_trait]
impl AgentRepository for MemoryAgents {
    async fn get(&self, agent_id: &AgentId) -> Result<Option<AgentConfig>, PersistenceError> {
        Ok(self.configs.lock().unwrap().get(agent_id).cloned())
    }

    async fn save(&self, config: &AgentConfig) -> Result<(), PersistenceError> {
        self.configs
            .lock()
            .unwrap()
            .insert(config.id.clone(), config.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<AgentConfig>, PersistenceError> {
        Ok(self.configs.lock().unwrap().values().cloned().collect())
    }
}

#[derive(Default)]
pub(crate) struct MemoryStates {
    pub states: Mutex<HashMap<AgentId, AgentRuntimeState>>,
}

#[async_trait]
impl StateRepository for MemoryStates {
    async fn load(&self, agent_id: &AgentId) -> Result<Option<AgentRuntimeState>, PersistenceError> {
        Ok(self.states.lock().unwrap().get(agent_id).cloned())
    }

    async fn upsert(&self, state: &AgentRuntimeState) -> Result<(), PersistenceError> {
        self.states
            .lock()
            .unwrap()
            .insert(state.agent_id.clone(), state.clone());
        Ok(())
    }

    async fn list_trading(&self) -> Result<Vec<AgentRuntimeState>, PersistenceError> {
        Ok(self
            .states
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.trading_enabled)
            .cloned()
            .collect())
    }
}

/// Returns the same canned text per call kind; `None` fails the call.
#[derive(Default)]
pub(crate) struct CannedProvider {
    pub decide: Option<String>,
    pub options: Option<String>,
    pub evaluation: Option<String>,
    pub final_choice: Option<String>,
    pub reflection: Option<String>,
    pub analysis: Option<String>,
    pub plan: Option<String>,
    pub summary: Option<String>,
    /// Every evaluation waits this long first
    pub evaluate_delay: Option<Duration>,
    pub plan_calls: AtomicUsize,
    pub option_calls: AtomicUsize,
}

impl CannedProvider {
    /// Long 10% on every cycle
    pub fn trading() -> Self {
        Self {
            decide: None,
            options: Some(r#"{"options": [{"action": "long", "size_pct": 10}]}"#.to_string()),
            evaluation: Some(r#"{"score": 0.9, "confidence": 0.9, "rationale": "clean"}"#.to_string()),
            final_choice: Some(r#"{"option_index": 0, "confidence": 0.9, "reason": "go"}"#.to_string()),
            ..Default::default()
        }
    }

    fn answer(text: &Option<String>) -> Result<String, ProviderError> {
        text.clone()
            .ok_or_else(|| ProviderError::RequestFailed("no canned answer".to_string()))
    }
}

#[async_trait]
impl ReasoningProvider for CannedProvider {
    fn name(&self) -> &str {
        "canned"
    }

    async fn decide(&self, request: &DecideRequest<'_>) -> Result<String, ProviderError> {
        if let Some(text) = &self.decide {
            return Ok(text.clone());
        }
        // options, then evaluation, then decide
        let action = if request.state.options.is_empty() {
            "generate_options"
        } else if !request.state.has_evaluations() {
            "evaluate_option"
        } else {
            "decide"
        };
        Ok(format!(r#"{{"action": "{}"}}"#, action))
    }

    async fn generate_options(&self, _: &OptionsRequest<'_>) -> Result<String, ProviderError> {
        self.option_calls.fetch_add(1, Ordering::SeqCst);
        Self::answer(&self.options)
    }

    async fn evaluate_option(&self, _: &EvaluateRequest<'_>) -> Result<String, ProviderError> {
        if let Some(delay) = self.evaluate_delay {
            tokio::time::sleep(delay).await;
        }
        Self::answer(&self.evaluation)
    }

    async fn make_final_decision(
        &self,
        _: &FinalDecisionRequest<'_>,
    ) -> Result<String, ProviderError> {
        Self::answer(&self.final_choice)
    }

    async fn reflect(&self, _: &ReviewRequest<'_>) -> Result<String, ProviderError> {
        Self::answer(&self.reflection)
    }

    async fn self_analyze(&self, _: &ReviewRequest<'_>) -> Result<String, ProviderError> {
        Self::answer(&self.analysis)
    }

    async fn create_plan(&self, _: &PlanRequest<'_>) -> Result<String, ProviderError> {
        self.plan_calls.fetch_add(1, Ordering::SeqCst);
        Self::answer(&self.plan)
    }

    async fn summarize_memory(&self, _: &SummarizeRequest<'_>) -> Result<String, ProviderError> {
        Self::answer(&self.summary)
    }
}

/// Only `estimate_risk` answers
pub(crate) struct EchoCapabilities;

#[async_trait]
impl CapabilityPort for EchoCapabilities {
    fn available(&self) -> Vec<CapabilityName> {
        vec![CapabilityName::EstimateRisk]
    }

    async fn invoke(
        &self,
        _context: &CapabilityContext<'_>,
        capability: &Capability,
    ) -> Result<String, CapabilityError> {
        match capability.name() {
            CapabilityName::EstimateRisk => Ok("risk ok".to_string()),
            other => Err(CapabilityError::Unavailable(other.to_string())),
        }
    }
}

#[derive(Default)]
pub(crate) struct MemoryCheckpoints {
    pub rows: Mutex<HashMap<AgentId, StoredCheckpoint>>,
    pub deletes: AtomicUsize,
}

#[async_trait]
impl CheckpointStore for MemoryCheckpoints {
    async fn save(
        &self,
        agent_id: &AgentId,
        session_id: SessionId,
        json: String,
    ) -> Result<(), PersistenceError> {
        self.rows
            .lock()
            .unwrap()
            .insert(agent_id.clone(), StoredCheckpoint { session_id, json });
        Ok(())
    }

    async fn load(&self, agent_id: &AgentId) -> Result<Option<StoredCheckpoint>, PersistenceError> {
        Ok(self.rows.lock().unwrap().get(agent_id).cloned())
    }

    async fn delete(&self, agent_id: &AgentId) -> Result<(), PersistenceError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.rows.lock().unwrap().remove(agent_id);
        Ok(())
    }
}
