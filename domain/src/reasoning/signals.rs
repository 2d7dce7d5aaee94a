//! Observations and deterministic signal scores.
//!
//! [`SignalScores::compute`] derives technical / news / on-chain / sentiment
//! scores in [-1, 1] from a [`MarketSnapshot`]. The reasoning loop attaches
//! them to every decision for audit; they do not drive the decision.

use crate::agent::weights::SignalWeights;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A news headline relevant to the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub source: String,
    pub published_at: DateTime<Utc>,
    /// Pre-computed sentiment in [-1, 1], if the feed provides one
    #[serde(default)]
    pub sentiment: Option<f64>,
}

/// A large transfer seen on-chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhaleTransfer {
    pub amount_usd: f64,
    /// Positive when coins leave exchanges (accumulation)
    pub direction: f64,
    pub seen_at: DateTime<Utc>,
}

/// Everything collected about the target before one reasoning session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub price: f64,
    #[serde(default)]
    pub change_24h_pct: f64,
    #[serde(default)]
    pub rsi: Option<f64>,
    #[serde(default)]
    pub macd_histogram: Option<f64>,
    #[serde(default)]
    pub volume_ratio: Option<f64>,
    /// Aggregated news sentiment in [-1, 1]
    #[serde(default)]
    pub news_sentiment: Option<f64>,
    /// Net whale flow in USD; positive = accumulation
    #[serde(default)]
    pub whale_net_flow_usd: Option<f64>,
    #[serde(default)]
    pub funding_rate: Option<f64>,
    /// Fear & greed index, 0..=100
    #[serde(default)]
    pub fear_greed: Option<f64>,
    #[serde(default)]
    pub candles: Vec<Candle>,
    #[serde(default)]
    pub news: Vec<NewsItem>,
    #[serde(default)]
    pub whales: Vec<WhaleTransfer>,
    pub observed_at: DateTime<Utc>,
}

impl MarketSnapshot {
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            change_24h_pct: 0.0,
            rsi: None,
            macd_histogram: None,
            volume_ratio: None,
            news_sentiment: None,
            whale_net_flow_usd: None,
            funding_rate: None,
            fear_greed: None,
            candles: Vec::new(),
            news: Vec::new(),
            whales: Vec::new(),
            observed_at: Utc::now(),
        }
    }

    /// Compact text form used in prompts.
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("{} @ {:.4}", self.symbol, self.price),
            format!("24h {:+.2}%", self.change_24h_pct),
        ];
        if let Some(rsi) = self.rsi {
            parts.push(format!("RSI {:.1}", rsi));
        }
        if let Some(macd) = self.macd_histogram {
            parts.push(format!("MACD hist {:+.4}", macd));
        }
        if let Some(vol) = self.volume_ratio {
            parts.push(format!("volume x{:.2}", vol));
        }
        if let Some(news) = self.news_sentiment {
            parts.push(format!("news {:+.2}", news));
        }
        if let Some(flow) = self.whale_net_flow_usd {
            parts.push(format!("whale flow {:+.0} USD", flow));
        }
        if let Some(funding) = self.funding_rate {
            parts.push(format!("funding {:+.4}%", funding * 100.0));
        }
        if let Some(fg) = self.fear_greed {
            parts.push(format!("fear/greed {:.0}", fg));
        }
        parts.join(", ")
    }

    /// Mean pre-computed sentiment of the attached news items
    pub fn mean_item_sentiment(&self) -> Option<f64> {
        let scores: Vec<f64> = self.news.iter().filter_map(|n| n.sentiment).collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        }
    }
}

/// Deterministic per-family scores in [-1, 1] plus their weighted composite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalScores {
    pub technical: f64,
    pub news: f64,
    pub onchain: f64,
    pub sentiment: f64,
    pub composite: f64,
}

impl SignalScores {
    pub fn compute(snapshot: &MarketSnapshot, weights: &SignalWeights) -> Self {
        let technical = technical_score(snapshot);
        let news = unit(
            snapshot
                .news_sentiment
                .or_else(|| snapshot.mean_item_sentiment())
                .unwrap_or(0.0),
        );
        let onchain = onchain_score(snapshot);
        let sentiment = snapshot
            .fear_greed
            .map(|fg| unit((fg - 50.0) / 50.0))
            .unwrap_or(0.0);

        let composite = weights.technical * technical
            + weights.news * news
            + weights.onchain * onchain
            + weights.sentiment * sentiment;

        Self {
            technical,
            news,
            onchain,
            sentiment,
            composite: unit(composite),
        }
    }
}

fn technical_score(s: &MarketSnapshot) -> f64 {
    let mut components = vec![(s.change_24h_pct / 5.0).tanh()];
    if let Some(rsi) = s.rsi {
        let rsi_component = if rsi >= 70.0 {
            -((rsi - 70.0) / 30.0)
        } else if rsi <= 30.0 {
            (30.0 - rsi) / 30.0
        } else {
            (rsi - 50.0) / 40.0
        };
        components.push(unit(rsi_component));
    }
    if let Some(macd) = s.macd_histogram {
        components.push(macd.tanh());
    }
    let mean = components.iter().sum::<f64>() / components.len() as f64;
    // heavy volume confirms the move
    let amplifier = s.volume_ratio.map(|v| v.clamp(0.5, 1.5)).unwrap_or(1.0);
    unit(mean * amplifier)
}

fn onchain_score(s: &MarketSnapshot) -> f64 {
    let mut components = Vec::new();
    if let Some(flow) = s.whale_net_flow_usd {
        components.push((flow / 10_000_000.0).tanh());
    }
    if let Some(funding) = s.funding_rate {
        // crowded longs pay funding
        components.push(-(funding * 1000.0).tanh());
    }
    if components.is_empty() {
        0.0
    } else {
        unit(components.iter().sum::<f64>() / components.len() as f64)
    }
}

fn unit(x: f64) -> f64 {
    if x.is_finite() { x.clamp(-1.0, 1.0) } else { 0.0 }
}
