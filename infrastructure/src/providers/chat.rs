//! OpenAI-compatible chat-completions provider.
//!
//! Every port call becomes one `POST {endpoint}/chat/completions` with the
//! request's system/user prompt; the raw message content goes back to the
//! use cases, which parse it.

use async_trait::async_trait;
use fleet_application::ports::reasoning_provider::{
    DecideRequest, EvaluateRequest, FinalDecisionRequest, OptionsRequest, PlanRequest, Prompt,
    ProviderError, ReasoningProvider, ReviewRequest, SummarizeRequest,
};
use fleet_application::ports::voter::{SentimentVoter, Voter};
use fleet_domain::consensus::parsing::parse_vote_response;
use fleet_domain::reasoning::NewsItem;
use fleet_domain::{SentimentEvaluation, ValidationRequest, ValidatorRole, Vote};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Base URL, without `/chat/completions`
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Shared HTTP client; cheap to clone behind an `Arc`.
pub struct ChatClient {
    config: ChatConfig,
    http: Client,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub async fn complete(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        let mut messages = Vec::with_capacity(2);
        if !prompt.system.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: &prompt.system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &prompt.user,
        });
        let body = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
        };

        let url = format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'));
        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        debug!(model = %self.config.model, "Sending chat completion request");
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::ConnectionError(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Chat completion failed");
            return Err(ProviderError::RequestFailed(format!("{} - {}", status, body)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::MalformedResponse("response has no content".to_string()))
    }
}

pub struct ChatProvider {
    client: Arc<ChatClient>,
}

impl ChatProvider {
    pub fn new(client: Arc<ChatClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReasoningProvider for ChatProvider {
    fn name(&self) -> &str {
        self.client.model()
    }

    async fn decide(&self, request: &DecideRequest<'_>) -> Result<String, ProviderError> {
        self.client.complete(&request.prompt).await
    }

    async fn generate_options(&self, request: &OptionsRequest<'_>) -> Result<String, ProviderError> {
        self.client.complete(&request.prompt).await
    }

    async fn evaluate_option(&self, request: &EvaluateRequest<'_>) -> Result<String, ProviderError> {
        self.client.complete(&request.prompt).await
    }

    async fn make_final_decision(
        &self,
        request: &FinalDecisionRequest<'_>,
    ) -> Result<String, ProviderError> {
        self.client.complete(&request.prompt).await
    }

    async fn reflect(&self, request: &ReviewRequest<'_>) -> Result<String, ProviderError> {
        self.client.complete(&request.prompt).await
    }

    async fn self_analyze(&self, request: &ReviewRequest<'_>) -> Result<String, ProviderError> {
        self.client.complete(&request.prompt).await
    }

    async fn create_plan(&self, request: &PlanRequest<'_>) -> Result<String, ProviderError> {
        self.client.complete(&request.prompt).await
    }

    async fn summarize_memory(&self, request: &SummarizeRequest<'_>) -> Result<String, ProviderError> {
        self.client.complete(&request.prompt).await
    }
}

/// A validator role played by the chat model
pub struct ChatVoter {
    client: Arc<ChatClient>,
    role: ValidatorRole,
    weight: f64,
}

impl ChatVoter {
    pub fn new(client: Arc<ChatClient>, role: ValidatorRole, weight: f64) -> Self {
        Self { client, role, weight }
    }
}

#[async_trait]
impl Voter for ChatVoter {
    fn source(&self) -> &str {
        self.role.as_str()
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    async fn vote(&self, request: &ValidationRequest) -> Result<Vote, ProviderError> {
        let prompt = Prompt::new(self.role.system_prompt(), request.user_prompt());
        let response = self.client.complete(&prompt).await?;
        Ok(parse_vote_response(self.role.as_str(), &response))
    }
}

const SENTIMENT_SYSTEM: &str = "You rate crypto news for traders. Answer only with JSON: \
{\"score\": -1.0..1.0, \"impact\": 1-10, \"urgency\": \"low|medium|high|immediate\"}";

pub struct ChatSentimentVoter {
    client: Arc<ChatClient>,
    name: String,
}

impl ChatSentimentVoter {
    pub fn new(client: Arc<ChatClient>, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }
}

#[async_trait]
impl SentimentVoter for ChatSentimentVoter {
    fn source(&self) -> &str {
        &self.name
    }

    async fn evaluate(
        &self,
        symbol: &str,
        item: &NewsItem,
    ) -> Result<SentimentEvaluation, ProviderError> {
        let user = format!(
            "Asset: {}\nHeadline: {}\nSummary: {}\nSource: {}",
            symbol, item.title, item.summary, item.source
        );
        let response = self.client.complete(&Prompt::new(SENTIMENT_SYSTEM, user)).await?;
        SentimentEvaluation::from_response(&response)
            .ok_or_else(|| ProviderError::MalformedResponse("no sentiment score".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: "m",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "be brief",
                },
                ChatMessage {
                    role: "user",
                    content: "hi",
                },
            ],
            temperature: 0.2,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "m");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_response_without_content_is_tolerated_by_serde() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"role": "assistant"}}]}"#).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
