//! Validator roles for trade validation
//!
//! Each role looks at a proposed decision from one angle and carries a
//! default weight in the tally.

use crate::agent::archetype::Archetype;
use crate::reasoning::decision::Decision;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorRole {
    TechnicalAnalyst,
    RiskManager,
    SentimentAnalyst,
    /// Argues against the proposal on purpose
    DevilsAdvocate,
}

impl ValidatorRole {
    pub const ALL: [ValidatorRole; 4] = [
        ValidatorRole::TechnicalAnalyst,
        ValidatorRole::RiskManager,
        ValidatorRole::SentimentAnalyst,
        ValidatorRole::DevilsAdvocate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidatorRole::TechnicalAnalyst => "technical_analyst",
            ValidatorRole::RiskManager => "risk_manager",
            ValidatorRole::SentimentAnalyst => "sentiment_analyst",
            ValidatorRole::DevilsAdvocate => "devils_advocate",
        }
    }

    pub fn default_weight(&self) -> f64 {
        match self {
            ValidatorRole::RiskManager => 1.5,
            ValidatorRole::DevilsAdvocate => 0.5,
            _ => 1.0,
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            ValidatorRole::TechnicalAnalyst => {
                "You are a technical analyst. Judge whether price action and indicators support the proposed trade."
            }
            ValidatorRole::RiskManager => {
                "You are a risk manager. Judge whether size, leverage and stops are acceptable for the account."
            }
            ValidatorRole::SentimentAnalyst => {
                "You are a sentiment analyst. Judge whether news and crowd positioning support the proposed trade."
            }
            ValidatorRole::DevilsAdvocate => {
                "You are a devil's advocate. Look for the strongest reason this trade is a mistake."
            }
        }
    }
}

impl fmt::Display for ValidatorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ValidatorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "technical_analyst" | "technical" => Ok(ValidatorRole::TechnicalAnalyst),
            "risk_manager" | "risk" => Ok(ValidatorRole::RiskManager),
            "sentiment_analyst" | "sentiment" => Ok(ValidatorRole::SentimentAnalyst),
            "devils_advocate" | "contrarian" => Ok(ValidatorRole::DevilsAdvocate),
            other => Err(format!(
                "Unknown validator role: {}. Valid: technical_analyst, risk_manager, sentiment_analyst, devils_advocate",
                other
            )),
        }
    }
}

/// What validators are asked to judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub decision: Decision,
    pub archetype: Archetype,
    pub market_summary: String,
    /// Account balance the sizing refers to
    pub balance: f64,
}

impl ValidationRequest {
    pub fn user_prompt(&self) -> String {
        format!(
            "Agent style: {}\nMarket: {}\nBalance: {:.2}\nProposal: {}\nReason: {}\n\n\
             Answer with JSON: {{\"verdict\": \"approve|reject|abstain\", \"confidence\": 0.0-1.0, \"reasoning\": \"...\"}}",
            self.archetype,
            self.market_summary,
            self.balance,
            self.decision.headline(),
            self.decision.reason
        )
    }
}
