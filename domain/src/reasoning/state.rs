//! Everything a reasoning session has accumulated so far.
//!
//! [`ReasoningState`] is the part of a session that gets checkpointed
//! together with the step history. It is plain data; the loop mutates it
//! one meta-action at a time.

use super::action::AlertPriority;
use super::decision::{OptionEvaluation, TradeOption};
use super::signals::MarketSnapshot;
use crate::core::string::{keywords, truncate};
use crate::memory::ScoredMemory;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Result of one capability invocation, kept for later prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub iteration: u32,
    pub tool: String,
    pub args: Value,
    pub success: bool,
    /// Output on success, error message on failure
    pub output: String,
}

/// An alert raised by the loop, forwarded to the notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaisedAlert {
    pub iteration: u32,
    pub priority: AlertPriority,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningState {
    pub observation: MarketSnapshot,
    #[serde(default)]
    pub tool_results: Vec<ToolOutcome>,
    #[serde(default)]
    pub memories: Vec<ScoredMemory>,
    #[serde(default)]
    pub options: Vec<TradeOption>,
    #[serde(default)]
    pub evaluations: Vec<OptionEvaluation>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub alerts: Vec<RaisedAlert>,
    #[serde(default)]
    pub plan_summary: Option<String>,
    /// Index of the next iteration to run
    #[serde(default)]
    pub next_iteration: u32,
}

impl ReasoningState {
    pub fn new(observation: MarketSnapshot, plan_summary: Option<String>) -> Self {
        Self {
            observation,
            tool_results: Vec::new(),
            memories: Vec::new(),
            options: Vec::new(),
            evaluations: Vec::new(),
            insights: Vec::new(),
            alerts: Vec::new(),
            plan_summary,
            next_iteration: 0,
        }
    }

    /// Replace the market snapshot after resuming from a checkpoint.
    pub fn refresh_observation(&mut self, observation: MarketSnapshot) {
        self.observation = observation;
    }

    /// Merge recalled memories, skipping ones already present.
    pub fn add_memories(&mut self, memories: Vec<ScoredMemory>) -> usize {
        let known: HashSet<_> = self.memories.iter().map(|m| m.id).collect();
        let before = self.memories.len();
        self.memories
            .extend(memories.into_iter().filter(|m| !known.contains(&m.id)));
        self.memories.len() - before
    }

    pub fn set_options(&mut self, options: Vec<TradeOption>) {
        self.options = options;
        self.evaluations.clear();
    }

    /// Store an evaluation, replacing an earlier one for the same option.
    pub fn record_evaluation(&mut self, evaluation: OptionEvaluation) {
        self.evaluations
            .retain(|e| e.option_index != evaluation.option_index);
        self.evaluations.push(evaluation);
    }

    /// Option targeted by `evaluate_option`: the requested index when valid,
    /// else the first option without an evaluation.
    pub fn evaluation_target(&self, requested: Option<usize>) -> Option<usize> {
        if let Some(i) = requested
            && i < self.options.len()
        {
            return Some(i);
        }
        (0..self.options.len()).find(|i| !self.evaluations.iter().any(|e| e.option_index == *i))
    }

    /// Highest-scoring evaluated option; ties go to the higher confidence.
    pub fn best_evaluation(&self) -> Option<(&TradeOption, &OptionEvaluation)> {
        self.evaluations
            .iter()
            .filter_map(|e| self.options.get(e.option_index).map(|o| (o, e)))
            .max_by(|(_, a), (_, b)| {
                a.score
                    .total_cmp(&b.score)
                    .then_with(|| a.confidence.total_cmp(&b.confidence))
            })
    }

    pub fn has_evaluations(&self) -> bool {
        self.best_evaluation().is_some()
    }

    /// Drop options and evaluations so the loop can start over.
    pub fn reconsider(&mut self) -> usize {
        let dropped = self.options.len();
        self.options.clear();
        self.evaluations.clear();
        dropped
    }

    /// Answer a self-posed question from what has already been gathered.
    ///
    /// Every known fact is ranked by keyword overlap with the question; the
    /// best few are returned. No provider is involved.
    pub fn answer_self_question(&self, question: &str) -> String {
        let wanted: HashSet<String> = keywords(question, 3).into_iter().collect();
        if wanted.is_empty() {
            return "The question has no searchable terms.".to_string();
        }

        let mut facts: Vec<(usize, String)> = self
            .known_facts()
            .into_iter()
            .filter_map(|fact| {
                let overlap = keywords(&fact, 3)
                    .into_iter()
                    .collect::<HashSet<_>>()
                    .intersection(&wanted)
                    .count();
                (overlap > 0).then_some((overlap, fact))
            })
            .collect();

        if facts.is_empty() {
            return "Nothing gathered so far addresses this question.".to_string();
        }

        // stable: earlier facts win ties
        facts.sort_by(|a, b| b.0.cmp(&a.0));
        facts
            .into_iter()
            .take(3)
            .map(|(_, fact)| truncate(&fact, 300))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn known_facts(&self) -> Vec<String> {
        let mut facts = vec![format!("observation: {}", self.observation.summary())];
        for news in &self.observation.news {
            facts.push(format!("news: {} {}", news.title, news.summary));
        }
        for outcome in self.tool_results.iter().filter(|t| t.success) {
            facts.push(format!("{}: {}", outcome.tool, outcome.output));
        }
        for memory in &self.memories {
            facts.push(format!("memory: {}", memory.to_prompt_line()));
        }
        for insight in &self.insights {
            facts.push(format!("insight: {}", insight));
        }
        if let Some(plan) = &self.plan_summary {
            facts.push(format!("plan: {}", plan));
        }
        facts
    }
}
