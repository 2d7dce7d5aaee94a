//! Reasoning domain
//!
//! Types of the adaptive reasoning loop. The loop itself (provider calls,
//! cancellation, persistence) lives in the application layer; everything
//! here is plain data and pure functions.
//!
//! ```text
//! ReasoningSession
//!   ├── ReasoningState   (observation, tool results, memories, options, ...)
//!   ├── [ThoughtStep]    (one per iteration)
//!   └── Decision | Checkpoint
//!
//! ReasoningTrace ──decision_id──▶ Decision
//! ```

pub mod action;
pub mod checkpoint;
pub mod decision;
pub mod outcome;
pub mod parsing;
pub mod plan;
pub mod reflection;
pub mod session;
pub mod signals;
pub mod state;
pub mod trace;

pub use action::{AlertPriority, MetaAction, MetaActionChoice, parse_meta_action};
pub use checkpoint::{CHECKPOINT_VERSION, Checkpoint};
pub use decision::{Decision, FinalChoice, OptionEvaluation, TradeAction, TradeOption};
pub use outcome::{DecisionDisposition, DecisionRecord, ExecutionReport};
pub use plan::{
    MarketBias, RevisionTrigger, TradingPlan, TriggerContext, TriggerPredicate, TriggerRegistry,
};
pub use reflection::{Reflection, ReflectionRecord, SelfAnalysis};
pub use session::{ReasoningSession, SessionStatus, ThoughtStep};
pub use signals::{Candle, MarketSnapshot, NewsItem, SignalScores, WhaleTransfer};
pub use state::{RaisedAlert, ReasoningState, ToolOutcome};
pub use trace::{ReasoningTrace, TerminationReason};
