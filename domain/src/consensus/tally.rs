//! Weighted vote aggregation
//!
//! [`ConsensusResult::tally`] is a pure function of the votes and the
//! policy. Sums are order-independent, so the arrival order of parallel
//! votes never changes the result.

use super::policy::ConsensusPolicy;
use super::vote::{Verdict, Vote};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one consensus round
///
/// # Example
///
/// ```
/// use fleet_domain::consensus::{ConsensusPolicy, ConsensusResult, Verdict, Vote};
///
/// let votes = vec![
///     Vote::approve("technical", 0.9, "trend intact"),
///     Vote::approve("risk", 0.8, "size is fine"),
///     Vote::reject("sentiment", 0.9, "crowd is euphoric"),
/// ];
///
/// let result = ConsensusResult::tally(votes, ConsensusPolicy::Threshold(0.66));
/// assert_eq!(result.verdict, Verdict::Approve);
/// assert_eq!(result.vote_summary(), "[●●○]");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub verdict: Verdict,
    pub policy: ConsensusPolicy,
    /// Weight of approvals over total weight
    pub approval_rate: f64,
    /// Weight of rejections over total weight
    pub rejection_rate: f64,
    pub total_weight: f64,
    pub votes: Vec<Vote>,
    pub decided_at: DateTime<Utc>,
}

impl ConsensusResult {
    pub fn tally(votes: Vec<Vote>, policy: ConsensusPolicy) -> Self {
        let weight_of = |verdict: Verdict| -> f64 {
            votes
                .iter()
                .filter(|v| v.verdict == verdict)
                .map(|v| v.weight)
                .sum()
        };
        let total_weight: f64 = votes.iter().map(|v| v.weight).sum();
        let (approval_rate, rejection_rate) = if total_weight > 0.0 {
            (
                weight_of(Verdict::Approve) / total_weight,
                weight_of(Verdict::Reject) / total_weight,
            )
        } else {
            (0.0, 0.0)
        };

        let verdict = match policy {
            ConsensusPolicy::Threshold(_) if votes.is_empty() => Verdict::Abstain,
            ConsensusPolicy::Threshold(t) => {
                if approval_rate >= t {
                    Verdict::Approve
                } else if rejection_rate >= t {
                    Verdict::Reject
                } else {
                    Verdict::Abstain
                }
            }
            ConsensusPolicy::Unanimous => {
                if !votes.is_empty() && votes.iter().all(|v| v.verdict == Verdict::Approve) {
                    Verdict::Approve
                } else {
                    Verdict::Reject
                }
            }
        };

        Self {
            verdict,
            policy,
            approval_rate,
            rejection_rate,
            total_weight,
            votes,
            decided_at: Utc::now(),
        }
    }

    /// Only an approval lets the decision through; abstain blocks it.
    pub fn allows_execution(&self) -> bool {
        self.verdict == Verdict::Approve
    }

    /// Weighted mean confidence of the non-failed votes
    pub fn mean_confidence(&self) -> f64 {
        let (num, den) = self
            .votes
            .iter()
            .filter(|v| !v.failed)
            .fold((0.0, 0.0), |(n, d), v| (n + v.confidence * v.weight, d + v.weight));
        if den > 0.0 { num / den } else { 0.0 }
    }

    pub fn failed_voters(&self) -> impl Iterator<Item = &Vote> {
        self.votes.iter().filter(|v| v.failed)
    }

    /// Generate a visual vote summary (e.g., "[●●○·]")
    pub fn vote_summary(&self) -> String {
        let mut summary = String::from("[");
        for vote in &self.votes {
            summary.push(vote.verdict.symbol());
        }
        summary.push(']');
        summary
    }

    /// Aggregate the reasoning of dissenting votes into a single string
    pub fn dissent(&self) -> String {
        self.votes
            .iter()
            .filter(|v| v.verdict != self.verdict)
            .map(|v| format!("{} ({}): {}", v.source, v.verdict, v.reasoning))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_votes() -> Vec<Vote> {
        vec![
            Vote::approve("a", 0.9, ""),
            Vote::approve("b", 0.8, ""),
            Vote::reject("c", 0.9, ""),
        ]
    }

    #[test]
    fn test_threshold_approves_at_two_thirds() {
        let result = ConsensusResult::tally(reference_votes(), ConsensusPolicy::Threshold(0.66));
        assert_eq!(result.verdict, Verdict::Approve);
        assert!((result.approval_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((result.rejection_rate - 1.0 / 3.0).abs() < 1e-9);
        assert!(result.allows_execution());
    }

    #[test]
    fn test_threshold_abstains_when_short() {
        let result = ConsensusResult::tally(reference_votes(), ConsensusPolicy::Threshold(0.70));
        assert_eq!(result.verdict, Verdict::Abstain);
        assert!(!result.allows_execution());
    }

    #[test]
    fn test_threshold_rejects() {
        let votes = vec![
            Vote::reject("a", 0.9, ""),
            Vote::reject("b", 0.9, ""),
            Vote::approve("c", 0.9, ""),
        ];
        let result = ConsensusResult::tally(votes, ConsensusPolicy::Threshold(0.6));
        assert_eq!(result.verdict, Verdict::Reject);
    }

    #[test]
    fn test_weights_shift_outcome() {
        let votes = vec![
            Vote::approve("a", 0.9, "").with_weight(1.0),
            Vote::reject("risk", 0.9, "").with_weight(3.0),
        ];
        let result = ConsensusResult::tally(votes, ConsensusPolicy::Threshold(0.7));
        assert_eq!(result.verdict, Verdict::Reject);
        assert!((result.rejection_rate - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_failed_voter_counts_toward_total() {
        let votes = vec![
            Vote::approve("a", 0.9, ""),
            Vote::approve("b", 0.9, ""),
            Vote::abstain_on_error("c", "timeout"),
        ];
        let result = ConsensusResult::tally(votes, ConsensusPolicy::Threshold(0.7));
        assert_eq!(result.verdict, Verdict::Abstain);
        assert_eq!(result.total_weight, 3.0);
        assert_eq!(result.failed_voters().count(), 1);
        assert!((result.mean_confidence() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_unanimous() {
        let all = vec![Vote::approve("a", 0.5, ""), Vote::approve("b", 0.5, "")];
        assert_eq!(
            ConsensusResult::tally(all, ConsensusPolicy::Unanimous).verdict,
            Verdict::Approve
        );
        let one_abstain = vec![Vote::approve("a", 0.5, ""), Vote::abstain_on_error("b", "x")];
        assert_eq!(
            ConsensusResult::tally(one_abstain, ConsensusPolicy::Unanimous).verdict,
            Verdict::Reject
        );
    }

    #[test]
    fn test_empty_and_zero_weight() {
        let empty = ConsensusResult::tally(vec![], ConsensusPolicy::Threshold(0.5));
        assert_eq!(empty.verdict, Verdict::Abstain);
        assert_eq!(empty.approval_rate, 0.0);
        assert_eq!(
            ConsensusResult::tally(vec![], ConsensusPolicy::Unanimous).verdict,
            Verdict::Reject
        );

        let weightless = vec![Vote::approve("a", 1.0, "").with_weight(0.0)];
        let result = ConsensusResult::tally(weightless, ConsensusPolicy::Threshold(0.5));
        assert_eq!(result.approval_rate, 0.0);
        assert_eq!(result.verdict, Verdict::Abstain);
    }

    #[test]
    fn test_order_independent() {
        let mut votes = reference_votes();
        let forward = ConsensusResult::tally(votes.clone(), ConsensusPolicy::Threshold(0.66));
        votes.reverse();
        let backward = ConsensusResult::tally(votes, ConsensusPolicy::Threshold(0.66));
        assert_eq!(forward.verdict, backward.verdict);
        assert!((forward.approval_rate - backward.approval_rate).abs() < 1e-12);
    }

    #[test]
    fn test_dissent() {
        let result = ConsensusResult::tally(
            vec![Vote::approve("a", 0.9, "ok"), Vote::reject("risk", 0.7, "too big")],
            ConsensusPolicy::Threshold(0.5),
        );
        assert_eq!(result.verdict, Verdict::Approve);
        assert_eq!(result.dissent(), "risk (reject): too big");
    }
}
