//! Consensus policies
//!
//! The rule that turns a set of weighted votes into one verdict.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Rule for determining consensus
///
/// - `Threshold(t)`: approve if the weighted approval rate is at least `t`,
///   reject if the weighted rejection rate is at least `t`, otherwise abstain
/// - `Unanimous`: approve only if every vote approves (strictest)
///
/// # Example
///
/// ```
/// use fleet_domain::consensus::ConsensusPolicy;
///
/// let policy: ConsensusPolicy = "threshold:0.66".parse().unwrap();
/// assert_eq!(policy, ConsensusPolicy::Threshold(0.66));
/// assert_eq!("unanimous".parse::<ConsensusPolicy>().unwrap(), ConsensusPolicy::Unanimous);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "RawPolicy")]
pub enum ConsensusPolicy {
    Threshold(f64),
    Unanimous,
}

/// Same wire shape as [`ConsensusPolicy`], checked on the way in
#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawPolicy {
    Threshold(f64),
    Unanimous,
}

impl TryFrom<RawPolicy> for ConsensusPolicy {
    type Error = DomainError;

    fn try_from(raw: RawPolicy) -> Result<Self, Self::Error> {
        match raw {
            RawPolicy::Threshold(ratio) => ConsensusPolicy::threshold(ratio),
            RawPolicy::Unanimous => Ok(ConsensusPolicy::Unanimous),
        }
    }
}

impl Default for ConsensusPolicy {
    fn default() -> Self {
        ConsensusPolicy::Threshold(0.66)
    }
}

impl ConsensusPolicy {
    /// Threshold policy; the ratio must lie in (0, 1].
    pub fn threshold(ratio: f64) -> Result<Self, DomainError> {
        if ratio.is_finite() && ratio > 0.0 && ratio <= 1.0 {
            Ok(ConsensusPolicy::Threshold(ratio))
        } else {
            Err(DomainError::InvalidPolicy(format!(
                "threshold must be in (0, 1], got {}",
                ratio
            )))
        }
    }

    /// Get a human-readable description of this policy
    pub fn description(&self) -> String {
        match self {
            ConsensusPolicy::Threshold(t) => format!("weighted threshold {:.0}%", t * 100.0),
            ConsensusPolicy::Unanimous => "unanimous (all must approve)".to_string(),
        }
    }
}

impl std::fmt::Display for ConsensusPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsensusPolicy::Threshold(t) => write!(f, "threshold:{}", t),
            ConsensusPolicy::Unanimous => write!(f, "unanimous"),
        }
    }
}

impl std::str::FromStr for ConsensusPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            "unanimous" | "all" => Ok(ConsensusPolicy::Unanimous),
            "majority" => ConsensusPolicy::threshold(0.5),
            s if s.starts_with("threshold:") => {
                let raw = s.trim_start_matches("threshold:");
                let ratio: f64 = raw
                    .parse()
                    .map_err(|_| DomainError::InvalidPolicy(format!("invalid threshold: {}", raw)))?;
                ConsensusPolicy::threshold(ratio)
            }
            s if s.ends_with('%') => {
                let raw = s.trim_end_matches('%');
                let pct: f64 = raw
                    .parse()
                    .map_err(|_| DomainError::InvalidPolicy(format!("invalid percentage: {}", raw)))?;
                ConsensusPolicy::threshold(pct / 100.0)
            }
            _ => Err(DomainError::InvalidPolicy(format!(
                "Unknown consensus policy: {}. Valid: threshold:R, N%, majority, unanimous",
                s
            ))),
        }
    }
}
