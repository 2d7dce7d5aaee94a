//! Agent archetypes - behavioral presets.
//!
//! The archetype controls an agent's default signal weights, default
//! strategy limits and how the reasoning prompt frames the agent's role.
//! Collective memory is pooled per archetype.

use super::config::StrategyLimits;
use super::weights::SignalWeights;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Conservative,
    Balanced,
    Aggressive,
    Scalper,
    Contrarian,
}

impl Archetype {
    pub const ALL: [Archetype; 5] = [
        Archetype::Conservative,
        Archetype::Balanced,
        Archetype::Aggressive,
        Archetype::Scalper,
        Archetype::Contrarian,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Conservative => "conservative",
            Archetype::Balanced => "balanced",
            Archetype::Aggressive => "aggressive",
            Archetype::Scalper => "scalper",
            Archetype::Contrarian => "contrarian",
        }
    }

    /// Default signal weights (technical, news, on-chain, sentiment)
    pub fn default_weights(&self) -> SignalWeights {
        let raw = match self {
            Archetype::Conservative => (0.40, 0.20, 0.25, 0.15),
            Archetype::Balanced => (0.25, 0.25, 0.25, 0.25),
            Archetype::Aggressive => (0.45, 0.20, 0.15, 0.20),
            Archetype::Scalper => (0.60, 0.10, 0.10, 0.20),
            Archetype::Contrarian => (0.20, 0.20, 0.20, 0.40),
        };
        SignalWeights::new(raw.0, raw.1, raw.2, raw.3).unwrap_or_default()
    }

    pub fn default_limits(&self) -> StrategyLimits {
        match self {
            Archetype::Conservative => StrategyLimits {
                max_position_pct: 10.0,
                max_leverage: 2.0,
                stop_loss_pct: 2.0,
                take_profit_pct: 4.0,
                min_confidence: 0.75,
            },
            Archetype::Balanced => StrategyLimits::default(),
            Archetype::Aggressive => StrategyLimits {
                max_position_pct: 30.0,
                max_leverage: 10.0,
                stop_loss_pct: 5.0,
                take_profit_pct: 12.0,
                min_confidence: 0.55,
            },
            Archetype::Scalper => StrategyLimits {
                max_position_pct: 15.0,
                max_leverage: 5.0,
                stop_loss_pct: 0.8,
                take_profit_pct: 1.5,
                min_confidence: 0.6,
            },
            Archetype::Contrarian => StrategyLimits {
                max_position_pct: 15.0,
                max_leverage: 3.0,
                stop_loss_pct: 4.0,
                take_profit_pct: 8.0,
                min_confidence: 0.65,
            },
        }
    }

    /// How the reasoning prompt describes this agent's temperament
    pub fn prompt_framing(&self) -> &'static str {
        match self {
            Archetype::Conservative => {
                "You are a conservative trader. Capital preservation comes first; \
                 prefer holding over marginal setups and size positions small."
            }
            Archetype::Balanced => {
                "You are a balanced trader. Weigh technical, news, on-chain and \
                 sentiment evidence evenly and act only on coherent signals."
            }
            Archetype::Aggressive => {
                "You are an aggressive trader. Pursue strong momentum with \
                 conviction, but always define the stop before the entry."
            }
            Archetype::Scalper => {
                "You are a scalper. Focus on short-horizon technical structure \
                 and keep stops tight; ignore slow narratives."
            }
            Archetype::Contrarian => {
                "You are a contrarian. Look for crowded sentiment extremes and \
                 fade them when price action confirms exhaustion."
            }
        }
    }
}

impl std::fmt::Display for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Archetype {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(Archetype::Conservative),
            "balanced" | "neutral" => Ok(Archetype::Balanced),
            "aggressive" => Ok(Archetype::Aggressive),
            "scalper" => Ok(Archetype::Scalper),
            "contrarian" => Ok(Archetype::Contrarian),
            other => Err(DomainError::UnknownArchetype(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_archetype() {
        assert_eq!(
            "Conservative".parse::<Archetype>().unwrap(),
            Archetype::Conservative
        );
        assert_eq!("neutral".parse::<Archetype>().unwrap(), Archetype::Balanced);
        assert_eq!(
            "degen".parse::<Archetype>(),
            Err(DomainError::UnknownArchetype("degen".to_string()))
        );
    }

    #[test]
    fn test_default_weights_are_normalized() {
        for archetype in Archetype::ALL {
            assert!(archetype.default_weights().is_normalized(1e-9), "{}", archetype);
        }
    }

    #[test]
    fn test_default_limits_are_valid() {
        for archetype in Archetype::ALL {
            assert!(archetype.default_limits().validate().is_ok(), "{}", archetype);
        }
    }
}
