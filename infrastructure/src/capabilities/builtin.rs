//! Built-in capability handlers
//!
//! - [`RiskHandler`] - position risk arithmetic
//! - [`ObservationHandler`] - candles, indicators, news and whale transfers
//!   taken from the session's latest observation
//! - [`MemorySearchHandler`] - the agent's own memories

use super::registry::CapabilityHandler;
use async_trait::async_trait;
use fleet_application::ports::capability::CapabilityContext;
use fleet_application::use_cases::memory_store::MemoryStore;
use fleet_domain::tool::Indicator;
use fleet_domain::{Capability, CapabilityError, CapabilityName, RiskEstimate};
use std::sync::Arc;

fn misrouted(capability: &Capability) -> CapabilityError {
    CapabilityError::Unavailable(capability.name().to_string())
}

pub struct RiskHandler;

#[async_trait]
impl CapabilityHandler for RiskHandler {
    fn id(&self) -> &str {
        "risk"
    }

    fn serves(&self) -> Vec<CapabilityName> {
        vec![CapabilityName::EstimateRisk]
    }

    async fn invoke(
        &self,
        context: &CapabilityContext<'_>,
        capability: &Capability,
    ) -> Result<String, CapabilityError> {
        let Capability::EstimateRisk(args) = capability else {
            return Err(misrouted(capability));
        };
        let stop = args
            .stop_loss_pct
            .unwrap_or_else(|| context.archetype.default_limits().stop_loss_pct);
        let estimate = RiskEstimate::compute(context.balance, args.size_pct, args.leverage, stop);
        Ok(estimate.describe())
    }
}

/// Serves market data from the observation the session already holds; a
/// feed that did not provide a kind of data leaves it `Unavailable`.
pub struct ObservationHandler;

impl ObservationHandler {
    fn candles(context: &CapabilityContext<'_>, limit: usize) -> Result<String, CapabilityError> {
        let candles = &context.observation.candles;
        if candles.is_empty() {
            return Err(CapabilityError::Unavailable("fetch_candles".to_string()));
        }
        let start = candles.len().saturating_sub(limit.max(1));
        Ok(candles[start..]
            .iter()
            .map(|c| {
                format!(
                    "{} O {:.4} H {:.4} L {:.4} C {:.4} V {:.2}",
                    c.open_time.format("%m-%d %H:%M"),
                    c.open,
                    c.high,
                    c.low,
                    c.close,
                    c.volume
                )
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn indicator(
        context: &CapabilityContext<'_>,
        name: &str,
        period: Option<usize>,
    ) -> Result<String, CapabilityError> {
        let indicator: Indicator = name.parse().map_err(|message| {
            CapabilityError::InvalidArguments {
                tool: CapabilityName::ComputeIndicator.to_string(),
                message,
            }
        })?;
        if context.observation.candles.is_empty() {
            return Err(CapabilityError::Unavailable(
                CapabilityName::ComputeIndicator.to_string(),
            ));
        }
        let value = indicator
            .compute(&context.observation.candles, period)
            .ok_or_else(|| CapabilityError::ExecutionFailed {
                tool: CapabilityName::ComputeIndicator.to_string(),
                message: format!(
                    "not enough candles ({}) for {}",
                    context.observation.candles.len(),
                    indicator
                ),
            })?;
        Ok(format!(
            "{}({}) = {:.4}",
            indicator,
            period.unwrap_or_else(|| indicator.default_period()),
            value
        ))
    }

    fn news(
        context: &CapabilityContext<'_>,
        query: Option<&str>,
        limit: usize,
    ) -> Result<String, CapabilityError> {
        let news = &context.observation.news;
        if news.is_empty() {
            return Err(CapabilityError::Unavailable("search_news".to_string()));
        }
        let terms: Vec<String> = query
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        let hits: Vec<String> = news
            .iter()
            .filter(|item| {
                let text = format!("{} {}", item.title, item.summary).to_lowercase();
                terms.is_empty() || terms.iter().any(|t| text.contains(t.as_str()))
            })
            .take(limit.max(1))
            .map(|item| match item.sentiment {
                Some(s) => format!("[{:+.2}] {} ({})", s, item.title, item.source),
                None => format!("{} ({})", item.title, item.source),
            })
            .collect();
        if hits.is_empty() {
            Ok("no matching news".to_string())
        } else {
            Ok(hits.join("\n"))
        }
    }

    fn whales(
        context: &CapabilityContext<'_>,
        min_usd: Option<f64>,
        limit: usize,
    ) -> Result<String, CapabilityError> {
        let whales = &context.observation.whales;
        if whales.is_empty() {
            return Err(CapabilityError::Unavailable("search_whales".to_string()));
        }
        let floor = min_usd.unwrap_or(0.0);
        let hits: Vec<String> = whales
            .iter()
            .filter(|w| w.amount_usd >= floor)
            .take(limit.max(1))
            .map(|w| {
                let direction = if w.direction >= 0.0 { "out of exchanges" } else { "into exchanges" };
                format!("{} {:.0} USD {}", w.seen_at.format("%m-%d %H:%M"), w.amount_usd, direction)
            })
            .collect();
        if hits.is_empty() {
            Ok(format!("no transfers above {:.0} USD", floor))
        } else {
            Ok(hits.join("\n"))
        }
    }
}

#[async_trait]
impl CapabilityHandler for ObservationHandler {
    fn id(&self) -> &str {
        "observation"
    }

    fn priority(&self) -> i32 {
        -10
    }

    fn serves(&self) -> Vec<CapabilityName> {
        vec![
            CapabilityName::FetchCandles,
            CapabilityName::ComputeIndicator,
            CapabilityName::SearchNews,
            CapabilityName::SearchWhales,
        ]
    }

    async fn invoke(
        &self,
        context: &CapabilityContext<'_>,
        capability: &Capability,
    ) -> Result<String, CapabilityError> {
        match capability {
            Capability::FetchCandles(args) => Self::candles(context, args.limit),
            Capability::ComputeIndicator(args) => {
                Self::indicator(context, &args.indicator, args.period)
            }
            Capability::SearchNews(args) => Self::news(context, args.query.as_deref(), args.limit),
            Capability::SearchWhales(args) => Self::whales(context, args.min_usd, args.limit),
            other => Err(misrouted(other)),
        }
    }
}

pub struct MemorySearchHandler {
    memory: Arc<MemoryStore>,
}

impl MemorySearchHandler {
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl CapabilityHandler for MemorySearchHandler {
    fn id(&self) -> &str {
        "memory"
    }

    fn serves(&self) -> Vec<CapabilityName> {
        vec![CapabilityName::SearchMemories]
    }

    async fn invoke(
        &self,
        context: &CapabilityContext<'_>,
        capability: &Capability,
    ) -> Result<String, CapabilityError> {
        let Capability::SearchMemories(args) = capability else {
            return Err(misrouted(capability));
        };
        let found = self
            .memory
            .search_personal(context.agent_id, &args.query, args.k)
            .await
            .map_err(|e| CapabilityError::ExecutionFailed {
                tool: CapabilityName::SearchMemories.to_string(),
                message: e.to_string(),
            })?;
        if found.is_empty() {
            return Ok("no matching memories".to_string());
        }
        Ok(found
            .iter()
            .map(|m| m.to_prompt_line())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use fleet_domain::reasoning::{Candle, NewsItem};
    use fleet_domain::tool::{ComputeIndicatorArgs, EstimateRiskArgs, SearchNewsArgs};
    use fleet_domain::{AgentId, Archetype, MarketSnapshot};

    fn context<'a>(agent: &'a AgentId, observation: &'a MarketSnapshot) -> CapabilityContext<'a> {
        CapabilityContext {
            agent_id: agent,
            archetype: Archetype::Balanced,
            observation,
            balance: 1_000.0,
        }
    }

    fn candles(closes: &[f64]) -> Vec<Candle> {
        let start = Utc::now() - Duration::hours(closes.len() as i64);
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| Candle {
                open_time: start + Duration::hours(i as i64),
                open: *close,
                high: close + 1.0,
                low: close - 1.0,
                close: *close,
                volume: 10.0,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_risk_uses_archetype_stop_when_missing() {
        let agent = AgentId::new("a");
        let observation = MarketSnapshot::new("BTCUSDT", 100.0);
        let capability = Capability::EstimateRisk(EstimateRiskArgs {
            size_pct: 10.0,
            leverage: 2.0,
            stop_loss_pct: None,
        });

        let text = RiskHandler
            .invoke(&context(&agent, &observation), &capability)
            .await
            .unwrap();

        let stop = Archetype::Balanced.default_limits().stop_loss_pct;
        assert_eq!(text, RiskEstimate::compute(1_000.0, 10.0, 2.0, stop).describe());
    }

    #[tokio::test]
    async fn test_indicator_from_observation_candles() {
        let agent = AgentId::new("a");
        let mut observation = MarketSnapshot::new("BTCUSDT", 100.0);
        observation.candles = candles(&[1.0, 2.0, 3.0, 4.0]);
        let capability = Capability::ComputeIndicator(ComputeIndicatorArgs {
            indicator: "sma".to_string(),
            period: Some(2),
        });

        let text = ObservationHandler
            .invoke(&context(&agent, &observation), &capability)
            .await
            .unwrap();
        assert_eq!(text, "sma(2) = 3.5000");
    }

    #[tokio::test]
    async fn test_missing_feed_data_is_unavailable() {
        let agent = AgentId::new("a");
        let observation = MarketSnapshot::new("BTCUSDT", 100.0);
        let capability = Capability::SearchNews(SearchNewsArgs {
            query: None,
            limit: 5,
        });

        let err = ObservationHandler
            .invoke(&context(&agent, &observation), &capability)
            .await
            .unwrap_err();
        assert_eq!(err, CapabilityError::Unavailable("search_news".to_string()));
    }

    #[tokio::test]
    async fn test_news_search_filters_by_query() {
        let agent = AgentId::new("a");
        let mut observation = MarketSnapshot::new("BTCUSDT", 100.0);
        for (id, title) in [("1", "ETF inflows surge"), ("2", "Exchange hack reported")] {
            observation.news.push(NewsItem {
                id: id.to_string(),
                title: title.to_string(),
                summary: String::new(),
                source: "wire".to_string(),
                published_at: Utc::now(),
                sentiment: None,
            });
        }
        let capability = Capability::SearchNews(SearchNewsArgs {
            query: Some("hack".to_string()),
            limit: 5,
        });

        let text = ObservationHandler
            .invoke(&context(&agent, &observation), &capability)
            .await
            .unwrap();
        assert_eq!(text, "Exchange hack reported (wire)");
    }

    #[tokio::test]
    async fn test_unknown_indicator_is_a_caller_error() {
        let agent = AgentId::new("a");
        let mut observation = MarketSnapshot::new("BTCUSDT", 100.0);
        observation.candles = candles(&[1.0, 2.0]);
        let capability = Capability::ComputeIndicator(ComputeIndicatorArgs {
            indicator: "ichimoku".to_string(),
            period: None,
        });

        let err = ObservationHandler
            .invoke(&context(&agent, &observation), &capability)
            .await
            .unwrap_err();
        assert!(err.is_caller_error());
    }
}
