//! Reasoning provider port
//!
//! Defines the interface for the external AI service the reasoning loop and
//! the learning steps talk to. Every call is a single request/response pair
//! that returns the raw response text; parsing (and the fallback when the
//! text is unusable) happens in the use cases.

use async_trait::async_trait;
use fleet_domain::{
    AgentConfig, AgentRuntimeState, DecisionRecord, Experience, MarketSnapshot, ReasoningState,
};
use thiserror::Error;

/// Errors that can occur while talking to a reasoning provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Timeout")]
    Timeout,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Not supported by this provider: {0}")]
    Unsupported(&'static str),
}

impl ProviderError {
    /// Worth retrying on the next cycle
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::ConnectionError(_) | ProviderError::RateLimited | ProviderError::Timeout
        )
    }
}

/// A system/user prompt pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Ask for the next meta-action.
///
/// Structured context travels next to the prompt so offline providers can
/// answer without parsing their own prompt.
pub struct DecideRequest<'a> {
    pub agent: &'a AgentConfig,
    pub state: &'a ReasoningState,
    pub iteration: u32,
    pub prompt: Prompt,
}

pub struct OptionsRequest<'a> {
    pub agent: &'a AgentConfig,
    pub state: &'a ReasoningState,
    pub iteration: u32,
    pub prompt: Prompt,
}

pub struct EvaluateRequest<'a> {
    pub agent: &'a AgentConfig,
    pub state: &'a ReasoningState,
    pub iteration: u32,
    pub option_index: usize,
    pub prompt: Prompt,
}

pub struct FinalDecisionRequest<'a> {
    pub agent: &'a AgentConfig,
    pub state: &'a ReasoningState,
    pub iteration: u32,
    pub prompt: Prompt,
}

/// Shared by `reflect` and `self_analyze`
pub struct ReviewRequest<'a> {
    pub agent: &'a AgentConfig,
    pub runtime: &'a AgentRuntimeState,
    pub records: &'a [DecisionRecord],
    pub prompt: Prompt,
}

pub struct PlanRequest<'a> {
    pub agent: &'a AgentConfig,
    pub snapshot: &'a MarketSnapshot,
    pub runtime: &'a AgentRuntimeState,
    pub prompt: Prompt,
}

pub struct SummarizeRequest<'a> {
    pub experience: &'a Experience,
    pub prompt: Prompt,
}

/// Port for the reasoning provider
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Provider identity for logs and traces
    fn name(&self) -> &str;

    /// Choose the next meta-action
    async fn decide(&self, request: &DecideRequest<'_>) -> Result<String, ProviderError>;

    async fn generate_options(&self, request: &OptionsRequest<'_>) -> Result<String, ProviderError>;

    async fn evaluate_option(&self, request: &EvaluateRequest<'_>) -> Result<String, ProviderError>;

    async fn make_final_decision(
        &self,
        request: &FinalDecisionRequest<'_>,
    ) -> Result<String, ProviderError>;

    async fn reflect(&self, request: &ReviewRequest<'_>) -> Result<String, ProviderError>;

    async fn self_analyze(&self, request: &ReviewRequest<'_>) -> Result<String, ProviderError>;

    async fn create_plan(&self, request: &PlanRequest<'_>) -> Result<String, ProviderError>;

    async fn summarize_memory(&self, request: &SummarizeRequest<'_>)
    -> Result<String, ProviderError>;
}
