//! Vote response parsing.
//!
//! Extracts a verdict from a validator's free-form answer. Pure domain
//! logic: no I/O, just JSON extraction with a keyword fallback.
//!
//! | Format | Example |
//! |--------|---------|
//! | JSON (preferred) | `{"verdict": "approve", "confidence": 0.8, "reasoning": "..."}` |
//! | Keywords | `APPROVE - trend is intact` |
//!
//! Ambiguous answers abstain.

use super::vote::{Verdict, Vote};
use crate::core::json::{extract_json_object, lenient_f64, lenient_str};

/// Parse a validator response into a vote from `source`.
pub fn parse_vote_response(source: &str, response: &str) -> Vote {
    if let Some(value) = extract_json_object(response)
        && let Some(verdict) = lenient_str(&value, "verdict")
            .or_else(|| lenient_str(&value, "vote"))
            .and_then(|v| v.parse::<Verdict>().ok())
    {
        let confidence = lenient_f64(&value, "confidence").unwrap_or(0.5);
        let reasoning = lenient_str(&value, "reasoning").unwrap_or_default();
        return Vote::new(source, verdict, confidence, reasoning);
    }

    Vote::new(source, keyword_verdict(response), 0.5, response.trim())
}

fn keyword_verdict(response: &str) -> Verdict {
    let upper = response.to_uppercase();

    let negated = upper.contains("NOT APPROVE")
        || upper.contains("DON'T APPROVE")
        || upper.contains("CANNOT APPROVE");
    let approved = upper.contains("APPROVE") && !negated;
    let rejected = upper.contains("REJECT") || negated;

    match (approved, rejected) {
        (true, false) => Verdict::Approve,
        (false, true) => Verdict::Reject,
        // both or neither
        _ => Verdict::Abstain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_vote() {
        let vote = parse_vote_response(
            "risk_manager",
            "```json\n{\"verdict\": \"reject\", \"confidence\": 0.85, \"reasoning\": \"leverage too high\"}\n```",
        );
        assert_eq!(vote.source, "risk_manager");
        assert_eq!(vote.verdict, Verdict::Reject);
        assert_eq!(vote.confidence, 0.85);
        assert_eq!(vote.reasoning, "leverage too high");
    }

    #[test]
    fn test_parse_keyword_vote() {
        assert_eq!(parse_vote_response("a", "APPROVE. Clean breakout.").verdict, Verdict::Approve);
        assert_eq!(parse_vote_response("a", "I cannot approve this").verdict, Verdict::Reject);
        assert_eq!(parse_vote_response("a", "Reject: no edge").verdict, Verdict::Reject);
    }

    #[test]
    fn test_ambiguous_abstains() {
        assert_eq!(parse_vote_response("a", "Hard to say.").verdict, Verdict::Abstain);
        assert_eq!(
            parse_vote_response("a", "Approve the entry but reject the size").verdict,
            Verdict::Abstain
        );
        // unknown verdict in JSON falls back to keywords
        assert_eq!(
            parse_vote_response("a", r#"{"verdict": "maybe"}"#).verdict,
            Verdict::Abstain
        );
    }
}
