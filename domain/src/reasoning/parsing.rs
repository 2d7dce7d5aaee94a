//! Provider response parsing for the reasoning loop.
//!
//! Every parser is lenient: JSON may be fenced or wrapped in prose, numbers
//! may arrive as strings. Parsers return `None` (or an empty list) when the
//! response is unusable so callers can fall back to a safe default.
//!
//! | Function | Expected shape |
//! |----------|----------------|
//! | [`parse_options`] | `{"options": [{"action": "long", "size_pct": 10, ...}]}` |
//! | [`parse_evaluation`] | `{"score": 0.7, "confidence": 0.6, "rationale": "..."}` |
//! | [`parse_final_choice`] | `{"option_index": 1, "confidence": 0.8, "reason": "..."}` or a full option |
//! | [`parse_reflection`] | `{"summary": "...", "lessons": [...], "weight_adjustment": {...}}` |
//! | [`parse_self_analysis`] | `{"assessment": "...", "strengths": [...], "weaknesses": [...]}` |
//! | [`parse_memory_summary`] | `{"context": ..., "action": ..., "outcome": ..., "lesson": ..., "importance": 0.5}` |

use super::decision::{FinalChoice, OptionEvaluation, TradeAction, TradeOption};
use super::reflection::{Reflection, SelfAnalysis};
use crate::agent::weights::WeightAdjustment;
use crate::core::json::{extract_json_object, lenient_f64, lenient_str};
use crate::memory::MemorySummary;
use serde_json::Value;

/// Options generated by the provider; unusable entries are skipped.
pub fn parse_options(response: &str) -> Vec<TradeOption> {
    let items = extract_json_object(response)
        .and_then(|value| value.get("options").and_then(|o| o.as_array()).cloned())
        .or_else(|| extract_array(response))
        .unwrap_or_default();
    items.iter().filter_map(option_from_value).collect()
}

fn extract_array(response: &str) -> Option<Vec<Value>> {
    let start = response.find('[')?;
    let end = response.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Vec<Value>>(&response[start..=end]).ok()
}

fn option_from_value(v: &Value) -> Option<TradeOption> {
    let action: TradeAction = lenient_str(v, "action")?.parse().ok()?;
    let positive = |x: f64| (x > 0.0).then_some(x);
    Some(TradeOption {
        action,
        size_pct: lenient_f64(v, "size_pct")
            .or_else(|| lenient_f64(v, "size"))
            .unwrap_or(0.0)
            .max(0.0),
        leverage: lenient_f64(v, "leverage").unwrap_or(1.0).max(1.0),
        stop_loss_pct: lenient_f64(v, "stop_loss_pct")
            .or_else(|| lenient_f64(v, "stop_loss"))
            .and_then(positive),
        take_profit_pct: lenient_f64(v, "take_profit_pct")
            .or_else(|| lenient_f64(v, "take_profit"))
            .and_then(positive),
        rationale: lenient_str(v, "rationale")
            .or_else(|| lenient_str(v, "reason"))
            .unwrap_or_default(),
    })
}

/// Evaluation of option `option_index`; score and confidence land in [0, 1].
///
/// A score on a 1-10 scale is rescaled.
pub fn parse_evaluation(response: &str, option_index: usize) -> Option<OptionEvaluation> {
    let value = extract_json_object(response)?;
    let mut score = lenient_f64(&value, "score")?;
    if score > 1.0 {
        score /= 10.0;
    }
    Some(OptionEvaluation {
        option_index,
        score: score.clamp(0.0, 1.0),
        confidence: lenient_f64(&value, "confidence")
            .unwrap_or(0.5)
            .clamp(0.0, 1.0),
        rationale: lenient_str(&value, "rationale")
            .or_else(|| lenient_str(&value, "reasoning"))
            .unwrap_or_default(),
    })
}

/// The provider's final pick, resolved against the generated options.
///
/// Accepts either an index into `options` or a full option object.
pub fn parse_final_choice(response: &str, options: &[TradeOption]) -> Option<FinalChoice> {
    let value = extract_json_object(response)?;
    let confidence = lenient_f64(&value, "confidence")?.clamp(0.0, 1.0);
    let reason = lenient_str(&value, "reason")
        .or_else(|| lenient_str(&value, "reasoning"))
        .unwrap_or_default();

    let option = match lenient_f64(&value, "option_index") {
        Some(i) if i >= 0.0 => options.get(i as usize).cloned(),
        _ => option_from_value(&value),
    }?;

    Some(FinalChoice {
        option,
        confidence,
        reason,
    })
}

pub fn parse_reflection(response: &str) -> Option<Reflection> {
    let value = extract_json_object(response)?;
    let summary = lenient_str(&value, "summary")?;
    let weight_adjustment = value
        .get("weight_adjustment")
        .or_else(|| value.get("weight_adjustments"))
        .and_then(|w| serde_json::from_value::<WeightAdjustment>(w.clone()).ok())
        .filter(|w| !w.is_noop());
    Some(Reflection {
        summary,
        lessons: string_list(&value, "lessons"),
        weight_adjustment,
    })
}

pub fn parse_self_analysis(response: &str) -> Option<SelfAnalysis> {
    let value = extract_json_object(response)?;
    Some(SelfAnalysis {
        assessment: lenient_str(&value, "assessment")?,
        strengths: string_list(&value, "strengths"),
        weaknesses: string_list(&value, "weaknesses"),
        overconfidence: lenient_f64(&value, "overconfidence"),
    })
}

pub fn parse_memory_summary(response: &str) -> Option<MemorySummary> {
    let value = extract_json_object(response)?;
    Some(
        MemorySummary {
            context: lenient_str(&value, "context").unwrap_or_default(),
            action: lenient_str(&value, "action").unwrap_or_default(),
            outcome: lenient_str(&value, "outcome").unwrap_or_default(),
            lesson: lenient_str(&value, "lesson")?,
            importance: lenient_f64(&value, "importance").unwrap_or(0.5),
        }
        .clamped(),
    )
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
