//! Reasoning provider and voter adapters
//!
//! - [`HeuristicProvider`], [`HeuristicVoter`], [`KeywordSentimentVoter`] - offline, deterministic
//! - `ChatProvider`, `ChatVoter`, `ChatSentimentVoter` - OpenAI-compatible
//!   chat completions (feature `http-providers`)

mod heuristic;
mod voters;

#[cfg(feature = "http-providers")]
mod chat;

pub use heuristic::HeuristicProvider;
pub use voters::{HeuristicVoter, KeywordSentimentVoter};

#[cfg(feature = "http-providers")]
pub use chat::{ChatClient, ChatConfig, ChatProvider, ChatSentimentVoter, ChatVoter};
