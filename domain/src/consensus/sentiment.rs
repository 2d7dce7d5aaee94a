//! Redundant sentiment evaluations and their aggregation
//!
//! Several providers rate the same news item independently. Their answers
//! are combined per field:
//!
//! | Field | Kind | Combined by |
//! |-------|------|-------------|
//! | `score` | numeric, [-1, 1] | mean |
//! | `impact` | ordinal, 1..=10 | median (even count: mean of the middle two) |
//! | `urgency` | categorical | mode (ties: the higher urgency) |
//!
//! When every evaluator failed there is nothing to combine and the previous
//! value is kept.

use crate::core::json::{extract_json_object, lenient_f64, lenient_str};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Low,
    Medium,
    High,
    Immediate,
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "none" => Ok(Urgency::Low),
            "medium" | "moderate" => Ok(Urgency::Medium),
            "high" => Ok(Urgency::High),
            "immediate" | "critical" | "urgent" => Ok(Urgency::Immediate),
            other => Err(format!("Unknown urgency: {}", other)),
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Immediate => "immediate",
        };
        write!(f, "{}", s)
    }
}

/// One evaluator's view of a news item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentEvaluation {
    /// Bearish -1 .. bullish 1
    pub score: f64,
    /// Market impact, 1..=10
    pub impact: f64,
    pub urgency: Urgency,
}

impl Default for SentimentEvaluation {
    fn default() -> Self {
        Self {
            score: 0.0,
            impact: 1.0,
            urgency: Urgency::Low,
        }
    }
}

impl SentimentEvaluation {
    pub fn new(score: f64, impact: f64, urgency: Urgency) -> Self {
        Self {
            score: if score.is_finite() { score.clamp(-1.0, 1.0) } else { 0.0 },
            impact: if impact.is_finite() { impact.clamp(1.0, 10.0) } else { 1.0 },
            urgency,
        }
    }

    /// Lenient parse of `{"score": .., "impact": .., "urgency": ".."}`.
    pub fn from_response(response: &str) -> Option<Self> {
        let value = extract_json_object(response)?;
        let score = lenient_f64(&value, "score").or_else(|| lenient_f64(&value, "sentiment"))?;
        let impact = lenient_f64(&value, "impact").unwrap_or(1.0);
        let urgency = lenient_str(&value, "urgency")
            .and_then(|u| u.parse().ok())
            .unwrap_or_default();
        Some(Self::new(score, impact, urgency))
    }
}

/// Combined view of several evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentAggregate {
    pub evaluation: SentimentEvaluation,
    /// Evaluations that contributed
    pub contributors: usize,
    /// Evaluators that failed
    pub failures: usize,
}

/// Combine evaluations; `None` when there are none.
pub fn aggregate(evaluations: &[SentimentEvaluation]) -> Option<SentimentEvaluation> {
    if evaluations.is_empty() {
        return None;
    }
    let scores: Vec<f64> = evaluations.iter().map(|e| e.score).collect();
    let impacts: Vec<f64> = evaluations.iter().map(|e| e.impact).collect();
    let urgencies: Vec<Urgency> = evaluations.iter().map(|e| e.urgency).collect();

    Some(SentimentEvaluation::new(
        mean(&scores)?,
        median(&impacts)?,
        mode(&urgencies)?,
    ))
}

/// Combine the outcome of every evaluator, keeping `previous` when all failed.
pub fn aggregate_or_keep(
    results: &[Option<SentimentEvaluation>],
    previous: SentimentEvaluation,
) -> SentimentAggregate {
    let ok: Vec<SentimentEvaluation> = results.iter().flatten().copied().collect();
    let failures = results.len() - ok.len();
    SentimentAggregate {
        evaluation: aggregate(&ok).unwrap_or(previous),
        contributors: ok.len(),
        failures,
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Most frequent value; ties resolve to the greatest.
pub fn mode<T: Ord + Copy>(values: &[T]) -> Option<T> {
    let mut sorted = values.to_vec();
    sorted.sort();
    let mut best: Option<(T, usize)> = None;
    for chunk in sorted.chunk_by(|a, b| a == b) {
        let candidate = (chunk[0], chunk.len());
        // ascending order: >= lets a later (greater) value win ties
        if best.is_none_or(|(_, n)| candidate.1 >= n) {
            best = Some(candidate);
        }
    }
    best.map(|(v, _)| v)
}
