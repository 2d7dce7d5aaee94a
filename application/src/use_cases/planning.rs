//! Planning use case
//!
//! Keeps one current [`TradingPlan`] per agent: created on the first cycle,
//! re-created whenever one of its revision triggers fires.

use crate::ports::persistence::JournalRepository;
use crate::ports::reasoning_provider::{PlanRequest, Prompt, ReasoningProvider};
use chrono::Utc;
use fleet_domain::{
    AgentConfig, AgentPromptTemplate, AgentRuntimeState, MarketSnapshot, PromptTemplate,
    TradingPlan, TriggerContext, TriggerRegistry,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Planner {
    provider: Arc<dyn ReasoningProvider>,
    journal: Arc<dyn JournalRepository>,
    triggers: TriggerRegistry,
}

impl Planner {
    pub fn new(provider: Arc<dyn ReasoningProvider>, journal: Arc<dyn JournalRepository>) -> Self {
        Self {
            provider,
            journal,
            triggers: TriggerRegistry::with_builtins(),
        }
    }

    /// Replace the trigger predicates, e.g. to add custom ones
    pub fn with_triggers(mut self, triggers: TriggerRegistry) -> Self {
        self.triggers = triggers;
        self
    }

    /// The plan to reason under this cycle.
    ///
    /// A stale plan is kept when a revision fails; `None` only when no plan
    /// could ever be made.
    pub async fn current_plan(
        &self,
        agent: &AgentConfig,
        runtime: &AgentRuntimeState,
        snapshot: &MarketSnapshot,
    ) -> Option<TradingPlan> {
        let latest = match self.journal.latest_plan(&agent.id).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!(agent_id = %agent.id, "Failed to load plan: {}", e);
                None
            }
        };

        if let Some(plan) = &latest {
            let ctx = TriggerContext {
                plan,
                snapshot,
                state: runtime,
                initial_budget: runtime.initial_budget,
                now: Utc::now(),
            };
            let fired: Vec<String> = self.triggers.fired(&ctx).iter().map(|t| t.describe()).collect();
            if fired.is_empty() {
                debug!(agent_id = %agent.id, plan_id = %plan.id, "Plan still valid");
                return latest;
            }
            info!(agent_id = %agent.id, triggers = ?fired, "Revising plan");
        }

        match self.create(agent, runtime, snapshot).await {
            Some(plan) => Some(plan),
            None => latest,
        }
    }

    async fn create(
        &self,
        agent: &AgentConfig,
        runtime: &AgentRuntimeState,
        snapshot: &MarketSnapshot,
    ) -> Option<TradingPlan> {
        let request = PlanRequest {
            agent,
            snapshot,
            runtime,
            prompt: Prompt::new(
                PromptTemplate::reasoning_system(agent),
                AgentPromptTemplate::plan_prompt(agent, snapshot, runtime),
            ),
        };
        let response = match self.provider.create_plan(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(agent_id = %agent.id, "Plan creation failed: {}", e);
                return None;
            }
        };
        let Some(plan) = TradingPlan::from_response(agent.id.clone(), &response, snapshot.price)
        else {
            warn!(agent_id = %agent.id, "Unparsable plan response");
            return None;
        };

        if let Err(e) = self.journal.append_plan(&plan).await {
            warn!(agent_id = %agent.id, "Failed to persist plan: {}", e);
        }
        info!(agent_id = %agent.id, plan = %plan.summary(), "New trading plan");
        Some(plan)
    }
}
