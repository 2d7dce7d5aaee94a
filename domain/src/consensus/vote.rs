//! Vote types for weighted consensus
//!
//! A [`Vote`] is one independent opinion on a proposal. Votes that could not
//! be produced (provider error, timeout) are still recorded as abstentions so
//! they keep counting toward the total weight.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a voter thinks of the proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approve,
    Reject,
    Abstain,
}

impl Verdict {
    pub fn symbol(&self) -> char {
        match self {
            Verdict::Approve => '●',
            Verdict::Reject => '○',
            Verdict::Abstain => '·',
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Approve => write!(f, "approve"),
            Verdict::Reject => write!(f, "reject"),
            Verdict::Abstain => write!(f, "abstain"),
        }
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approve" | "approved" | "yes" | "accept" => Ok(Verdict::Approve),
            "reject" | "rejected" | "no" | "deny" => Ok(Verdict::Reject),
            "abstain" | "neutral" | "unsure" => Ok(Verdict::Abstain),
            other => Err(format!("Unknown verdict: {}", other)),
        }
    }
}

/// A single weighted vote
///
/// # Example
///
/// ```
/// use fleet_domain::consensus::{Verdict, Vote};
///
/// let vote = Vote::new("risk_manager", Verdict::Approve, 0.8, "stop is tight enough")
///     .with_weight(1.5);
/// assert_eq!(vote.weight, 1.5);
///
/// let failed = Vote::abstain_on_error("technical_analyst", "timeout after 30s");
/// assert_eq!(failed.verdict, Verdict::Abstain);
/// assert_eq!(failed.confidence, 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    /// Voter identity (role or provider name)
    pub source: String,
    pub verdict: Verdict,
    /// Confidence level (0.0 to 1.0)
    pub confidence: f64,
    pub reasoning: String,
    /// Non-negative weight; 1.0 unless the voter's role says otherwise
    pub weight: f64,
    /// The voter failed and this vote was synthesized
    #[serde(default)]
    pub failed: bool,
}

impl Vote {
    pub fn new(
        source: impl Into<String>,
        verdict: Verdict,
        confidence: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            verdict,
            confidence: clamp_unit(confidence),
            reasoning: reasoning.into(),
            weight: 1.0,
            failed: false,
        }
    }

    pub fn approve(source: impl Into<String>, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self::new(source, Verdict::Approve, confidence, reasoning)
    }

    pub fn reject(source: impl Into<String>, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self::new(source, Verdict::Reject, confidence, reasoning)
    }

    /// Stand-in for a voter that errored or timed out.
    pub fn abstain_on_error(source: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            failed: true,
            ..Self::new(
                source,
                Verdict::Abstain,
                0.0,
                format!("voter unavailable: {}", error),
            )
        }
    }

    /// Negative and non-finite weights become 0.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
        self
    }
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_creation() {
        let vote = Vote::approve("risk_manager", 0.9, "Looks good");
        assert_eq!(vote.verdict, Verdict::Approve);
        assert_eq!(vote.weight, 1.0);
        assert!(!vote.failed);
    }

    #[test]
    fn test_confidence_and_weight_sanitized() {
        let vote = Vote::reject("a", 1.5, "no").with_weight(-2.0);
        assert_eq!(vote.confidence, 1.0);
        assert_eq!(vote.weight, 0.0);

        let vote = Vote::reject("a", f64::NAN, "no").with_weight(f64::INFINITY);
        assert_eq!(vote.confidence, 0.0);
        assert_eq!(vote.weight, 0.0);
    }

    #[test]
    fn test_abstain_on_error() {
        let vote = Vote::abstain_on_error("sentiment", "connection refused").with_weight(2.0);
        assert_eq!(vote.verdict, Verdict::Abstain);
        assert_eq!(vote.confidence, 0.0);
        assert!(vote.failed);
        assert!(vote.reasoning.contains("connection refused"));
        assert_eq!(vote.weight, 2.0);
    }

    #[test]
    fn test_parse_verdict() {
        assert_eq!("APPROVE".parse::<Verdict>().ok(), Some(Verdict::Approve));
        assert_eq!("no".parse::<Verdict>().ok(), Some(Verdict::Reject));
        assert_eq!("neutral".parse::<Verdict>().ok(), Some(Verdict::Abstain));
        assert!("maybe later".parse::<Verdict>().is_err());
    }
}
