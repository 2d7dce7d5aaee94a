//! Consensus engine
//!
//! Queries every voter in parallel and tallies their weighted votes. Voter
//! failures (errors, timeouts, panics) become abstentions that still count
//! toward the total weight; one voter can never prevent the others' votes
//! from being counted.
//!
//! The same fan-out aggregates redundant sentiment evaluations of news items
//! (mean score, median impact, mode urgency).

use crate::config::ConsensusParams;
use crate::ports::voter::{SentimentVoter, Voter};
use fleet_domain::consensus::sentiment::{aggregate_or_keep, mean};
use fleet_domain::{
    ConsensusResult, MarketSnapshot, NewsItem, SentimentAggregate, SentimentEvaluation,
    ValidationRequest, Vote,
};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub struct ConsensusEngine {
    voters: Vec<Arc<dyn Voter>>,
    sentiment_voters: Vec<Arc<dyn SentimentVoter>>,
    params: ConsensusParams,
}

impl ConsensusEngine {
    pub fn new(params: ConsensusParams) -> Self {
        Self {
            voters: Vec::new(),
            sentiment_voters: Vec::new(),
            params,
        }
    }

    pub fn with_voter(mut self, voter: Arc<dyn Voter>) -> Self {
        self.voters.push(voter);
        self
    }

    pub fn with_sentiment_voter(mut self, voter: Arc<dyn SentimentVoter>) -> Self {
        self.sentiment_voters.push(voter);
        self
    }

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    pub fn has_sentiment_voters(&self) -> bool {
        !self.sentiment_voters.is_empty()
    }

    /// Collect one vote per voter and tally them under the configured policy.
    pub async fn validate(&self, request: &ValidationRequest) -> ConsensusResult {
        let votes = self.collect_votes(request).await;
        let result = ConsensusResult::tally(votes, self.params.policy);
        info!(
            agent_id = %request.decision.agent_id,
            verdict = %result.verdict,
            approval = result.approval_rate,
            votes = %result.vote_summary(),
            "Consensus reached"
        );
        result
    }

    async fn collect_votes(&self, request: &ValidationRequest) -> Vec<Vote> {
        let request = Arc::new(request.clone());
        let timeout = self.params.voter_timeout;
        let mut join_set = JoinSet::new();

        for (index, voter) in self.voters.iter().enumerate() {
            let voter = Arc::clone(voter);
            let request = Arc::clone(&request);
            join_set.spawn(async move {
                let vote = match tokio::time::timeout(timeout, voter.vote(&request)).await {
                    Ok(Ok(vote)) => vote,
                    Ok(Err(e)) => {
                        warn!("Voter {} failed: {}", voter.source(), e);
                        Vote::abstain_on_error(voter.source(), e)
                    }
                    Err(_) => {
                        warn!("Voter {} timed out after {:?}", voter.source(), timeout);
                        Vote::abstain_on_error(
                            voter.source(),
                            format!("timeout after {:?}", timeout),
                        )
                    }
                };
                (index, vote.with_weight(voter.weight()))
            });
        }

        let mut slots: Vec<Option<Vote>> = vec![None; self.voters.len()];
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok((index, vote)) => {
                    debug!("Vote from {}: {}", vote.source, vote.verdict);
                    slots[index] = Some(vote);
                }
                Err(e) => warn!("Voter task join error: {}", e),
            }
        }

        // voters whose task panicked still count, as abstentions
        slots
            .into_iter()
            .zip(&self.voters)
            .map(|(slot, voter)| {
                slot.unwrap_or_else(|| {
                    Vote::abstain_on_error(voter.source(), "voter task aborted")
                        .with_weight(voter.weight())
                })
            })
            .collect()
    }

    /// Aggregate every sentiment voter's view of one news item; when all of
    /// them fail, `previous` is returned untouched.
    pub async fn evaluate_sentiment(
        &self,
        symbol: &str,
        item: &NewsItem,
        previous: SentimentEvaluation,
    ) -> SentimentAggregate {
        let item = Arc::new(item.clone());
        let symbol: Arc<str> = Arc::from(symbol);
        let timeout = self.params.voter_timeout;
        let mut join_set = JoinSet::new();

        for voter in &self.sentiment_voters {
            let voter = Arc::clone(voter);
            let item = Arc::clone(&item);
            let symbol = Arc::clone(&symbol);
            join_set.spawn(async move {
                match tokio::time::timeout(timeout, voter.evaluate(&symbol, &item)).await {
                    Ok(Ok(evaluation)) => Some(evaluation),
                    Ok(Err(e)) => {
                        warn!("Sentiment voter {} failed: {}", voter.source(), e);
                        None
                    }
                    Err(_) => {
                        warn!("Sentiment voter {} timed out", voter.source());
                        None
                    }
                }
            });
        }

        let mut results = Vec::with_capacity(self.sentiment_voters.len());
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(evaluation) => results.push(evaluation),
                Err(e) => {
                    warn!("Sentiment task join error: {}", e);
                    results.push(None);
                }
            }
        }

        aggregate_or_keep(&results, previous)
    }

    /// Replace the snapshot's news sentiment with the mean aggregated score
    /// of its news items. Items nobody could rate are skipped; if no item
    /// could be rated the collected value is kept.
    ///
    /// Returns the number of items that contributed.
    pub async fn enrich_snapshot(&self, snapshot: &mut MarketSnapshot) -> usize {
        if self.sentiment_voters.is_empty() || snapshot.news.is_empty() {
            return 0;
        }

        let fallback = snapshot.news_sentiment.unwrap_or(0.0);
        let mut scores = Vec::new();
        for item in &snapshot.news {
            let previous = SentimentEvaluation {
                score: item.sentiment.unwrap_or(fallback),
                ..SentimentEvaluation::default()
            };
            let aggregate = self
                .evaluate_sentiment(&snapshot.symbol, item, previous)
                .await;
            if aggregate.contributors > 0 {
                scores.push(aggregate.evaluation.score);
            }
        }

        if let Some(score) = mean(&scores) {
            debug!(
                symbol = %snapshot.symbol,
                items = scores.len(),
                score,
                "News sentiment aggregated"
            );
            snapshot.news_sentiment = Some(score);
        }
        scores.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::reasoning_provider::ProviderError;
    use async_trait::async_trait;
    use chrono::Utc;
    use fleet_domain::consensus::Urgency;
    use fleet_domain::{AgentId, Archetype, ConsensusPolicy, Decision, SessionId, Verdict};
    use std::time::Duration;

    struct FixedVoter {
        source: String,
        vote: Result<Vote, ProviderError>,
        weight: f64,
    }

    impl FixedVoter {
        fn ok(vote: Vote) -> Arc<dyn Voter> {
            Arc::new(Self {
                source: vote.source.clone(),
                vote: Ok(vote),
                weight: 1.0,
            })
        }

        fn failing(source: &str) -> Arc<dyn Voter> {
            Arc::new(Self {
                source: source.to_string(),
                vote: Err(ProviderError::ConnectionError("refused".to_string())),
                weight: 1.0,
            })
        }
    }

    #[async_trait]
    impl Voter for FixedVoter {
        fn source(&self) -> &str {
            &self.source
        }

        fn weight(&self) -> f64 {
            self.weight
        }

        async fn vote(&self, _request: &ValidationRequest) -> Result<Vote, ProviderError> {
            self.vote.clone()
        }
    }

    struct SlowVoter;

    #[async_trait]
    impl Voter for SlowVoter {
        fn source(&self) -> &str {
            "slow"
        }

        async fn vote(&self, _request: &ValidationRequest) -> Result<Vote, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vote::approve("slow", 1.0, "eventually"))
        }
    }

    struct PanickingVoter;

    #[async_trait]
    impl Voter for PanickingVoter {
        fn source(&self) -> &str {
            "panicky"
        }

        async fn vote(&self, _request: &ValidationRequest) -> Result<Vote, ProviderError> {
            panic!("voter bug")
        }
    }

    struct ScoreVoter(Option<SentimentEvaluation>);

    #[async_trait]
    impl SentimentVoter for ScoreVoter {
        fn source(&self) -> &str {
            "score"
        }

        async fn evaluate(
            &self,
            _symbol: &str,
            _item: &NewsItem,
        ) -> Result<SentimentEvaluation, ProviderError> {
            self.0.ok_or(ProviderError::Timeout)
        }
    }

    fn request() -> ValidationRequest {
        ValidationRequest {
            decision: Decision::hold(AgentId::new("a"), SessionId::generate(), 0.9, "test"),
            archetype: Archetype::Balanced,
            market_summary: "BTCUSDT @ 60000".to_string(),
            balance: 1000.0,
        }
    }

    fn news(title: &str) -> NewsItem {
        NewsItem {
            id: title.to_string(),
            title: title.to_string(),
            summary: String::new(),
            source: "wire".to_string(),
            published_at: Utc::now(),
            sentiment: None,
        }
    }

    #[tokio::test]
    async fn test_threshold_vote() {
        let engine = ConsensusEngine::new(ConsensusParams::default())
            .with_voter(FixedVoter::ok(Vote::approve("a", 0.9, "ok")))
            .with_voter(FixedVoter::ok(Vote::approve("b", 0.8, "ok")))
            .with_voter(FixedVoter::ok(Vote::reject("c", 0.9, "no")));

        let result = engine.validate(&request()).await;
        assert_eq!(result.verdict, Verdict::Approve);
        assert!((result.approval_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.votes.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_voter_abstains_and_counts() {
        let engine = ConsensusEngine::new(ConsensusParams::default())
            .with_voter(FixedVoter::ok(Vote::approve("a", 0.9, "ok")))
            .with_voter(FixedVoter::failing("b"))
            .with_voter(FixedVoter::ok(Vote::approve("c", 0.7, "ok")));

        let result = engine.validate(&request()).await;
        assert_eq!(result.total_weight, 3.0);
        assert_eq!(result.failed_voters().count(), 1);
        let failed = &result.votes[1];
        assert_eq!(failed.verdict, Verdict::Abstain);
        assert_eq!(failed.confidence, 0.0);
        assert!(failed.reasoning.contains("refused"));
        assert_eq!(result.verdict, Verdict::Approve);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_and_panic_become_abstentions() {
        let params = ConsensusParams::default().with_voter_timeout(Duration::from_secs(5));
        let engine = ConsensusEngine::new(params)
            .with_voter(Arc::new(SlowVoter))
            .with_voter(Arc::new(PanickingVoter))
            .with_voter(FixedVoter::ok(Vote::approve("c", 0.9, "ok")));

        let result = engine.validate(&request()).await;
        assert_eq!(result.votes.len(), 3);
        assert_eq!(result.failed_voters().count(), 2);
        assert!(result.votes[0].reasoning.contains("timeout"));
        assert_eq!(result.votes[1].source, "panicky");
        // 1 of 3 approvals is below the 0.66 threshold
        assert_eq!(result.verdict, Verdict::Abstain);
        assert!(!result.allows_execution());
    }

    #[tokio::test]
    async fn test_unanimous_policy() {
        let params =
            ConsensusParams::default().with_policy(ConsensusPolicy::Unanimous);
        let engine = ConsensusEngine::new(params)
            .with_voter(FixedVoter::ok(Vote::approve("a", 0.9, "ok")))
            .with_voter(FixedVoter::failing("b"));
        assert_eq!(engine.validate(&request()).await.verdict, Verdict::Reject);
    }

    #[tokio::test]
    async fn test_sentiment_aggregation() {
        let engine = ConsensusEngine::new(ConsensusParams::default())
            .with_sentiment_voter(Arc::new(ScoreVoter(Some(SentimentEvaluation::new(
                0.6,
                3.0,
                Urgency::High,
            )))))
            .with_sentiment_voter(Arc::new(ScoreVoter(Some(SentimentEvaluation::new(
                0.2,
                9.0,
                Urgency::Low,
            )))))
            .with_sentiment_voter(Arc::new(ScoreVoter(Some(SentimentEvaluation::new(
                0.4,
                7.0,
                Urgency::High,
            )))))
            .with_sentiment_voter(Arc::new(ScoreVoter(None)));

        let aggregate = engine
            .evaluate_sentiment("BTCUSDT", &news("ETF approved"), SentimentEvaluation::default())
            .await;
        assert_eq!(aggregate.contributors, 3);
        assert_eq!(aggregate.failures, 1);
        assert!((aggregate.evaluation.score - 0.4).abs() < 1e-9);
        assert_eq!(aggregate.evaluation.impact, 7.0);
        assert_eq!(aggregate.evaluation.urgency, Urgency::High);
    }

    #[tokio::test]
    async fn test_enrich_keeps_value_when_all_fail() {
        let engine = ConsensusEngine::new(ConsensusParams::default())
            .with_sentiment_voter(Arc::new(ScoreVoter(None)));
        let mut snapshot = MarketSnapshot::new("BTCUSDT", 60_000.0);
        snapshot.news_sentiment = Some(-0.3);
        snapshot.news.push(news("exchange hacked"));

        assert_eq!(engine.enrich_snapshot(&mut snapshot).await, 0);
        assert_eq!(snapshot.news_sentiment, Some(-0.3));
    }

    #[tokio::test]
    async fn test_enrich_replaces_with_mean() {
        let engine = ConsensusEngine::new(ConsensusParams::default()).with_sentiment_voter(
            Arc::new(ScoreVoter(Some(SentimentEvaluation::new(0.5, 5.0, Urgency::Medium)))),
        );
        let mut snapshot = MarketSnapshot::new("BTCUSDT", 60_000.0);
        snapshot.news.push(news("a"));
        snapshot.news.push(news("b"));

        assert_eq!(engine.enrich_snapshot(&mut snapshot).await, 2);
        assert_eq!(snapshot.news_sentiment, Some(0.5));
    }
}
