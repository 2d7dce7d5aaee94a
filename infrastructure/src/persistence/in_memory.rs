//! In-memory repositories for agent configs, runtime state and the decision
//! journal. State survives only as long as the process.

use async_trait::async_trait;
use dashmap::DashMap;
use fleet_application::ports::persistence::{
    AgentRepository, JournalRepository, PersistenceError, StateRepository,
};
use fleet_domain::{
    AgentConfig, AgentId, AgentRuntimeState, DecisionRecord, ReflectionRecord, TradingPlan,
};
use std::sync::RwLock;

fn poisoned() -> PersistenceError {
    PersistenceError::Unavailable("journal lock poisoned".to_string())
}

#[derive(Default)]
pub struct InMemoryAgentRepository {
    configs: DashMap<AgentId, AgentConfig>,
}

impl InMemoryAgentRepository {
    pub fn with_agents(configs: impl IntoIterator<Item = AgentConfig>) -> Self {
        let repo = Self::default();
        for config in configs {
            repo.configs.insert(config.id.clone(), config);
        }
        repo
    }
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn get(&self, agent_id: &AgentId) -> Result<Option<AgentConfig>, PersistenceError> {
        Ok(self.configs.get(agent_id).map(|c| c.clone()))
    }

    async fn save(&self, config: &AgentConfig) -> Result<(), PersistenceError> {
        self.configs.insert(config.id.clone(), config.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<AgentConfig>, PersistenceError> {
        let mut all: Vec<AgentConfig> = self.configs.iter().map(|c| c.value().clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}

#[derive(Default)]
pub struct InMemoryStateRepository {
    states: DashMap<AgentId, AgentRuntimeState>,
}

#[async_trait]
impl StateRepository for InMemoryStateRepository {
    async fn load(&self, agent_id: &AgentId) -> Result<Option<AgentRuntimeState>, PersistenceError> {
        Ok(self.states.get(agent_id).map(|s| s.clone()))
    }

    async fn upsert(&self, state: &AgentRuntimeState) -> Result<(), PersistenceError> {
        self.states.insert(state.agent_id.clone(), state.clone());
        Ok(())
    }

    async fn list_trading(&self) -> Result<Vec<AgentRuntimeState>, PersistenceError> {
        let mut trading: Vec<AgentRuntimeState> = self
            .states
            .iter()
            .filter(|s| s.trading_enabled)
            .map(|s| s.value().clone())
            .collect();
        trading.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(trading)
    }
}

/// Append-only journal of decisions, reflections and plans
#[derive(Default)]
pub struct InMemoryJournal {
    decisions: RwLock<Vec<DecisionRecord>>,
    reflections: RwLock<Vec<ReflectionRecord>>,
    plans: RwLock<Vec<TradingPlan>>,
}

impl InMemoryJournal {
    /// Every decision recorded so far, oldest first
    pub fn decisions(&self) -> Vec<DecisionRecord> {
        self.decisions.read().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn reflection_count(&self) -> usize {
        self.reflections.read().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl JournalRepository for InMemoryJournal {
    async fn append_decision(&self, record: &DecisionRecord) -> Result<(), PersistenceError> {
        self.decisions.write().map_err(|_| poisoned())?.push(record.clone());
        Ok(())
    }

    async fn recent_decisions(
        &self,
        agent_id: &AgentId,
        limit: usize,
    ) -> Result<Vec<DecisionRecord>, PersistenceError> {
        let decisions = self.decisions.read().map_err(|_| poisoned())?;
        let mut recent: Vec<DecisionRecord> = decisions
            .iter()
            .rev()
            .filter(|r| &r.decision.agent_id == agent_id)
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        Ok(recent)
    }

    async fn append_reflection(&self, record: &ReflectionRecord) -> Result<(), PersistenceError> {
        self.reflections.write().map_err(|_| poisoned())?.push(record.clone());
        Ok(())
    }

    async fn append_plan(&self, plan: &TradingPlan) -> Result<(), PersistenceError> {
        self.plans.write().map_err(|_| poisoned())?.push(plan.clone());
        Ok(())
    }

    async fn latest_plan(&self, agent_id: &AgentId) -> Result<Option<TradingPlan>, PersistenceError> {
        let plans = self.plans.read().map_err(|_| poisoned())?;
        Ok(plans.iter().rev().find(|p| &p.agent_id == agent_id).cloned())
    }
}
