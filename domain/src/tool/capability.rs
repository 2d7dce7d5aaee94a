//! Capabilities the reasoning loop can invoke by name.
//!
//! The provider names a tool as free text; [`Capability::parse`] resolves the
//! name (canonical or alias) to a typed variant and decodes its arguments.
//! Unknown names are rejected with [`CapabilityError::UnknownCapability`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Errors raised while resolving or running a capability.
///
/// None of these stop the reasoning loop; they are reported back to it as a
/// failed tool result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Capability {0} is not available in this deployment")]
    Unavailable(String),

    #[error("Capability {tool} failed: {message}")]
    ExecutionFailed { tool: String, message: String },
}

impl CapabilityError {
    /// The provider picked something that does not exist or misused it
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            CapabilityError::UnknownCapability(_) | CapabilityError::InvalidArguments { .. }
        )
    }
}

/// Canonical capability names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityName {
    FetchCandles,
    ComputeIndicator,
    SearchNews,
    SearchWhales,
    EstimateRisk,
    SearchMemories,
}

impl CapabilityName {
    pub const ALL: [CapabilityName; 6] = [
        CapabilityName::FetchCandles,
        CapabilityName::ComputeIndicator,
        CapabilityName::SearchNews,
        CapabilityName::SearchWhales,
        CapabilityName::EstimateRisk,
        CapabilityName::SearchMemories,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityName::FetchCandles => "fetch_candles",
            CapabilityName::ComputeIndicator => "compute_indicator",
            CapabilityName::SearchNews => "search_news",
            CapabilityName::SearchWhales => "search_whales",
            CapabilityName::EstimateRisk => "estimate_risk",
            CapabilityName::SearchMemories => "search_memories",
        }
    }

    /// Resolve a canonical name or a common alias.
    pub fn resolve(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase().replace(['-', ' '], "_");
        let resolved = match normalized.as_str() {
            "fetch_candles" | "candles" | "get_candles" | "ohlcv" | "klines" => {
                CapabilityName::FetchCandles
            }
            "compute_indicator" | "indicator" | "indicators" | "calculate_indicator" => {
                CapabilityName::ComputeIndicator
            }
            "search_news" | "news" | "get_news" => CapabilityName::SearchNews,
            "search_whales" | "whales" | "whale_alerts" | "onchain" => CapabilityName::SearchWhales,
            "estimate_risk" | "risk" | "position_risk" | "calculate_risk" => {
                CapabilityName::EstimateRisk
            }
            "search_memories" | "memories" | "search_memory" | "memory" => {
                CapabilityName::SearchMemories
            }
            _ => return None,
        };
        Some(resolved)
    }

    /// One line per capability for the iteration prompt
    pub fn signature(&self) -> &'static str {
        match self {
            CapabilityName::FetchCandles => {
                "fetch_candles {interval?: \"1h\", limit?: 50} - recent OHLCV bars"
            }
            CapabilityName::ComputeIndicator => {
                "compute_indicator {indicator: \"rsi\"|\"macd\"|\"sma\"|\"ema\"|\"atr\", period?: 14} - one indicator value"
            }
            CapabilityName::SearchNews => "search_news {query?: \"...\", limit?: 5} - recent headlines",
            CapabilityName::SearchWhales => {
                "search_whales {min_usd?: 1000000, limit?: 10} - large on-chain transfers"
            }
            CapabilityName::EstimateRisk => {
                "estimate_risk {size_pct, leverage?, stop_loss_pct?} - loss at stop, liquidation distance"
            }
            CapabilityName::SearchMemories => {
                "search_memories {query: \"...\", k?: 5} - past experiences similar to the query"
            }
        }
    }
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchCandlesArgs {
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default = "default_candle_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeIndicatorArgs {
    pub indicator: String,
    #[serde(default)]
    pub period: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchNewsArgs {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchWhalesArgs {
    #[serde(default)]
    pub min_usd: Option<f64>,
    #[serde(default = "default_whale_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateRiskArgs {
    pub size_pct: f64,
    #[serde(default = "default_leverage")]
    pub leverage: f64,
    #[serde(default)]
    pub stop_loss_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMemoriesArgs {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub k: usize,
}

fn default_interval() -> String {
    "1h".to_string()
}
fn default_candle_limit() -> usize {
    50
}
fn default_search_limit() -> usize {
    5
}
fn default_whale_limit() -> usize {
    10
}
fn default_leverage() -> f64 {
    1.0
}

/// A resolved capability invocation with typed arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "args", rename_all = "snake_case")]
pub enum Capability {
    FetchCandles(FetchCandlesArgs),
    ComputeIndicator(ComputeIndicatorArgs),
    SearchNews(SearchNewsArgs),
    SearchWhales(SearchWhalesArgs),
    EstimateRisk(EstimateRiskArgs),
    SearchMemories(SearchMemoriesArgs),
}

impl Capability {
    /// Resolve `name` and decode `args` into the matching argument struct.
    ///
    /// `null` arguments count as `{}`.
    pub fn parse(name: &str, args: &Value) -> Result<Self, CapabilityError> {
        let resolved = CapabilityName::resolve(name)
            .ok_or_else(|| CapabilityError::UnknownCapability(name.to_string()))?;
        let args = if args.is_null() {
            Value::Object(Default::default())
        } else {
            args.clone()
        };

        fn decode<T: serde::de::DeserializeOwned>(
            name: CapabilityName,
            args: Value,
        ) -> Result<T, CapabilityError> {
            serde_json::from_value(args).map_err(|e| CapabilityError::InvalidArguments {
                tool: name.to_string(),
                message: e.to_string(),
            })
        }

        Ok(match resolved {
            CapabilityName::FetchCandles => Capability::FetchCandles(decode(resolved, args)?),
            CapabilityName::ComputeIndicator => {
                Capability::ComputeIndicator(decode(resolved, args)?)
            }
            CapabilityName::SearchNews => Capability::SearchNews(decode(resolved, args)?),
            CapabilityName::SearchWhales => Capability::SearchWhales(decode(resolved, args)?),
            CapabilityName::EstimateRisk => Capability::EstimateRisk(decode(resolved, args)?),
            CapabilityName::SearchMemories => Capability::SearchMemories(decode(resolved, args)?),
        })
    }

    pub fn name(&self) -> CapabilityName {
        match self {
            Capability::FetchCandles(_) => CapabilityName::FetchCandles,
            Capability::ComputeIndicator(_) => CapabilityName::ComputeIndicator,
            Capability::SearchNews(_) => CapabilityName::SearchNews,
            Capability::SearchWhales(_) => CapabilityName::SearchWhales,
            Capability::EstimateRisk(_) => CapabilityName::EstimateRisk,
            Capability::SearchMemories(_) => CapabilityName::SearchMemories,
        }
    }
}
