//! Voter ports
//!
//! A [`Voter`] judges a proposed decision; a [`SentimentVoter`] rates one news
//! item. Both are typically backed by an AI provider and may fail; the
//! consensus engine turns failures into abstentions.

use super::reasoning_provider::ProviderError;
use async_trait::async_trait;
use fleet_domain::reasoning::NewsItem;
use fleet_domain::{SentimentEvaluation, ValidationRequest, Vote};

#[async_trait]
pub trait Voter: Send + Sync {
    /// Identity recorded on the vote
    fn source(&self) -> &str;

    /// Weight of this voter's vote
    fn weight(&self) -> f64 {
        1.0
    }

    async fn vote(&self, request: &ValidationRequest) -> Result<Vote, ProviderError>;
}

#[async_trait]
pub trait SentimentVoter: Send + Sync {
    fn source(&self) -> &str;

    async fn evaluate(
        &self,
        symbol: &str,
        item: &NewsItem,
    ) -> Result<SentimentEvaluation, ProviderError>;
}
