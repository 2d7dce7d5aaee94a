//! Domain layer for agent-fleet
//!
//! This crate contains the core types and pure rules of the fleet. It has no
//! dependencies on infrastructure or presentation concerns and performs no I/O.
//!
//! # Core Concepts
//!
//! ## Reasoning
//!
//! Each agent reaches a decision through a bounded loop of meta-actions
//! (gather data, ask itself a question, generate and evaluate options,
//! decide). The loop's accumulated state can be checkpointed and resumed.
//!
//! ## Consensus
//!
//! A decision is validated by several independent voters. Their weighted
//! votes are tallied under a [`ConsensusPolicy`]; the same aggregation (mean,
//! median, mode) combines redundant sentiment evaluations.
//!
//! ## Memory
//!
//! Past experiences are stored as personal memories and, when important
//! enough, pooled into the archetype's collective memory.

pub mod agent;
pub mod consensus;
pub mod core;
pub mod memory;
pub mod prompt;
pub mod reasoning;
pub mod tool;

// Re-export commonly used types
pub use agent::{
    archetype::Archetype,
    config::{AgentConfig, StrategyLimits},
    runtime_state::AgentRuntimeState,
    validation::{ConfigIssue, ConfigIssueCode, Severity},
    weights::{SignalWeights, WeightAdjustment},
};
pub use consensus::{
    ConsensusPolicy, ConsensusResult, SentimentAggregate, SentimentEvaluation, Urgency,
    ValidationRequest, ValidatorRole, Verdict, Vote,
};
pub use core::{
    error::DomainError,
    ids::{AgentId, DecisionId, SessionId},
};
pub use memory::{
    CollectiveMemory, Experience, Memory, MemoryOrigin, MemoryPolicy, MemorySummary, ScoredMemory,
};
pub use prompt::{AgentPromptTemplate, PromptTemplate};
pub use reasoning::{
    Checkpoint, Decision, DecisionDisposition, DecisionRecord, ExecutionReport, MarketSnapshot,
    MetaAction, MetaActionChoice, NewsItem, ReasoningSession, ReasoningState, ReasoningTrace,
    Reflection, ReflectionRecord, RevisionTrigger, SelfAnalysis, SignalScores, TerminationReason,
    ThoughtStep, TradeAction, TradeOption, TradingPlan, TriggerContext, TriggerRegistry,
};
pub use tool::{Capability, CapabilityError, CapabilityName, RiskEstimate};
