//! Offline validators and sentiment evaluators.
//!
//! [`HeuristicVoter`] judges a proposal from one [`ValidatorRole`]'s angle
//! using only the decision and its audited signal scores.
//! [`KeywordSentimentVoter`] scores news with a small lexicon.

use async_trait::async_trait;
use fleet_application::ports::reasoning_provider::ProviderError;
use fleet_application::ports::voter::{SentimentVoter, Voter};
use fleet_domain::reasoning::NewsItem;
use fleet_domain::{
    SentimentEvaluation, TradeAction, Urgency, ValidationRequest, ValidatorRole, Verdict, Vote,
};

pub struct HeuristicVoter {
    role: ValidatorRole,
    weight: f64,
}

impl HeuristicVoter {
    pub fn new(role: ValidatorRole) -> Self {
        Self {
            role,
            weight: role.default_weight(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// +1 for long, -1 for short
    fn direction(action: TradeAction) -> f64 {
        match action {
            TradeAction::Long => 1.0,
            TradeAction::Short => -1.0,
            _ => 0.0,
        }
    }

    fn judge(&self, request: &ValidationRequest) -> Vote {
        let source = self.role.as_str();
        let decision = &request.decision;
        if !decision.action.opens_position() {
            return Vote::approve(source, 0.8, "reduces or keeps exposure");
        }
        let direction = Self::direction(decision.action);
        let scores = &decision.signal_scores;

        match self.role {
            ValidatorRole::RiskManager => {
                let limits = request.archetype.default_limits();
                if decision.size_pct > limits.max_position_pct {
                    Vote::reject(
                        source,
                        0.9,
                        format!(
                            "size {:.1}% exceeds {:.1}%",
                            decision.size_pct, limits.max_position_pct
                        ),
                    )
                } else if decision.leverage > limits.max_leverage {
                    Vote::reject(
                        source,
                        0.9,
                        format!(
                            "leverage x{:.1} exceeds x{:.1}",
                            decision.leverage, limits.max_leverage
                        ),
                    )
                } else if decision.stop_loss_pct.is_none() {
                    Vote::reject(source, 0.7, "no stop loss")
                } else {
                    Vote::approve(source, 0.7, "sizing within limits")
                }
            }
            ValidatorRole::TechnicalAnalyst => {
                Self::agreement(source, direction * scores.technical, "technicals")
            }
            ValidatorRole::SentimentAnalyst => Self::agreement(
                source,
                direction * (scores.news + scores.sentiment) / 2.0,
                "news and crowd sentiment",
            ),
            ValidatorRole::DevilsAdvocate => {
                if scores.composite.abs() < 0.2 {
                    Vote::reject(source, 0.6, "conviction too thin to take the risk")
                } else {
                    Vote::new(source, Verdict::Abstain, 0.3, "no strong counter-argument")
                }
            }
        }
    }

    /// Approve when the signal points the proposal's way, reject when it
    /// clearly points against, otherwise abstain.
    fn agreement(source: &str, alignment: f64, what: &str) -> Vote {
        let confidence = alignment.abs().clamp(0.3, 0.95);
        if alignment > 0.1 {
            Vote::approve(source, confidence, format!("{} support the trade ({:+.2})", what, alignment))
        } else if alignment < -0.1 {
            Vote::reject(source, confidence, format!("{} contradict the trade ({:+.2})", what, alignment))
        } else {
            Vote::new(source, Verdict::Abstain, 0.3, format!("{} are inconclusive", what))
        }
    }
}

#[async_trait]
impl Voter for HeuristicVoter {
    fn source(&self) -> &str {
        self.role.as_str()
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    async fn vote(&self, request: &ValidationRequest) -> Result<Vote, ProviderError> {
        Ok(self.judge(request))
    }
}

const BULLISH_WORDS: &[&str] = &[
    "surge", "rally", "inflow", "inflows", "approval", "approved", "adoption", "record", "bullish",
    "partnership", "upgrade", "gain", "gains", "soar", "breakout",
];
const BEARISH_WORDS: &[&str] = &[
    "hack", "exploit", "outflow", "outflows", "ban", "lawsuit", "crash", "bearish", "selloff",
    "liquidation", "liquidations", "delist", "fraud", "plunge", "downgrade",
];
const URGENT_WORDS: &[&str] = &["hack", "exploit", "halt", "halted", "liquidation", "liquidations"];

/// Lexicon-based news scorer. Several instances with different title
/// weights act as redundant evaluators.
pub struct KeywordSentimentVoter {
    name: String,
    /// How much a headline word counts relative to a summary word
    title_weight: f64,
}

impl KeywordSentimentVoter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title_weight: 1.0,
        }
    }

    pub fn with_title_weight(mut self, weight: f64) -> Self {
        self.title_weight = weight.max(0.0);
        self
    }

    fn count(text: &str, words: &[&str]) -> usize {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .filter(|w| words.contains(&w.as_str()))
            .count()
    }

    fn score(&self, item: &NewsItem) -> SentimentEvaluation {
        let positive = self.title_weight * Self::count(&item.title, BULLISH_WORDS) as f64
            + Self::count(&item.summary, BULLISH_WORDS) as f64;
        let negative = self.title_weight * Self::count(&item.title, BEARISH_WORDS) as f64
            + Self::count(&item.summary, BEARISH_WORDS) as f64;
        let hits = positive + negative;

        let lexical = if hits > 0.0 { (positive - negative) / hits } else { 0.0 };
        let score = match item.sentiment {
            Some(feed) => (lexical + feed) / 2.0,
            None => lexical,
        };
        let urgent = Self::count(&item.title, URGENT_WORDS) + Self::count(&item.summary, URGENT_WORDS);
        let urgency = match urgent {
            0 if hits >= 3.0 => Urgency::Medium,
            0 => Urgency::Low,
            1 => Urgency::High,
            _ => Urgency::Immediate,
        };
        SentimentEvaluation::new(score, 1.0 + hits * 1.5, urgency)
    }
}

#[async_trait]
impl SentimentVoter for KeywordSentimentVoter {
    fn source(&self) -> &str {
        &self.name
    }

    async fn evaluate(
        &self,
        _symbol: &str,
        item: &NewsItem,
    ) -> Result<SentimentEvaluation, ProviderError> {
        Ok(self.score(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fleet_domain::{AgentId, Archetype, Decision, SessionId};

    fn request(action: TradeAction, size_pct: f64, technical: f64) -> ValidationRequest {
        let mut decision = Decision::hold(AgentId::new("a"), SessionId::generate(), 0.8, "test");
        decision.action = action;
        decision.size_pct = size_pct;
        decision.leverage = 1.0;
        decision.stop_loss_pct = Some(3.0);
        decision.signal_scores.technical = technical;
        decision.signal_scores.composite = technical;
        ValidationRequest {
            decision,
            archetype: Archetype::Balanced,
            market_summary: "BTCUSDT @ 100".to_string(),
            balance: 1_000.0,
        }
    }

    fn news(title: &str) -> NewsItem {
        NewsItem {
            id: "1".to_string(),
            title: title.to_string(),
            summary: String::new(),
            source: "wire".to_string(),
            published_at: Utc::now(),
            sentiment: None,
        }
    }

    #[tokio::test]
    async fn test_risk_manager_rejects_oversized() {
        let voter = HeuristicVoter::new(ValidatorRole::RiskManager);
        let vote = voter.vote(&request(TradeAction::Long, 95.0, 0.5)).await.unwrap();
        assert_eq!(vote.verdict, Verdict::Reject);

        let vote = voter.vote(&request(TradeAction::Long, 5.0, 0.5)).await.unwrap();
        assert_eq!(vote.verdict, Verdict::Approve);
        assert_eq!(voter.weight(), ValidatorRole::RiskManager.default_weight());
    }

    #[tokio::test]
    async fn test_technical_analyst_follows_direction() {
        let voter = HeuristicVoter::new(ValidatorRole::TechnicalAnalyst);
        let long = voter.vote(&request(TradeAction::Long, 5.0, 0.6)).await.unwrap();
        let short = voter.vote(&request(TradeAction::Short, 5.0, 0.6)).await.unwrap();
        let flat = voter.vote(&request(TradeAction::Long, 5.0, 0.0)).await.unwrap();
        assert_eq!(long.verdict, Verdict::Approve);
        assert_eq!(short.verdict, Verdict::Reject);
        assert_eq!(flat.verdict, Verdict::Abstain);
    }

    #[tokio::test]
    async fn test_closing_is_always_approved() {
        for role in ValidatorRole::ALL {
            let vote = HeuristicVoter::new(role)
                .vote(&request(TradeAction::Close, 0.0, -0.9))
                .await
                .unwrap();
            assert_eq!(vote.verdict, Verdict::Approve, "{}", role);
        }
    }

    #[tokio::test]
    async fn test_keyword_sentiment() {
        let voter = KeywordSentimentVoter::new("lexicon");
        let good = voter.evaluate("BTC", &news("ETF inflows surge to record")).await.unwrap();
        assert!(good.score > 0.9);

        let bad = voter.evaluate("BTC", &news("Exchange hack triggers selloff")).await.unwrap();
        assert!(bad.score < -0.9);
        assert_eq!(bad.urgency, Urgency::High);

        let neutral = voter.evaluate("BTC", &news("Conference schedule announced")).await.unwrap();
        assert_eq!(neutral.score, 0.0);
        assert_eq!(neutral.urgency, Urgency::Low);
    }
}
