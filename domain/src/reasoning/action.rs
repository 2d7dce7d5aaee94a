//! The fixed meta-action vocabulary of the reasoning loop and its parser.
//!
//! The provider answers each iteration with one JSON object:
//!
//! ```text
//! {"action": "use_capability", "tool": "fetch_candles", "args": {...},
//!  "reasoning": "...", "confidence": 0.7}
//! ```
//!
//! [`parse_meta_action`] never fails: anything it cannot understand becomes
//! [`MetaAction::Decide`].

use crate::core::json::{extract_json_object, lenient_f64, lenient_str};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Urgency attached to a raised alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl FromStr for AlertPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "info" => Ok(AlertPriority::Low),
            "medium" | "normal" => Ok(AlertPriority::Medium),
            "high" | "warning" => Ok(AlertPriority::High),
            "critical" | "urgent" => Ok(AlertPriority::Critical),
            other => Err(format!("unknown alert priority: {}", other)),
        }
    }
}

impl fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertPriority::Low => "low",
            AlertPriority::Medium => "medium",
            AlertPriority::High => "high",
            AlertPriority::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

/// One step the loop can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetaAction {
    /// Invoke a named capability; the name is resolved by the registry
    UseCapability { tool: String, args: Value },
    AskSelfQuestion { question: String },
    RecallMemory { query: Option<String> },
    GenerateOptions,
    EvaluateOption { option_index: Option<usize> },
    LogInsight { insight: String },
    RaiseAlert { priority: AlertPriority, message: String },
    /// Drop generated options and evaluations to start over
    Reconsider,
    Decide,
}

impl MetaAction {
    pub fn kind(&self) -> &'static str {
        match self {
            MetaAction::UseCapability { .. } => "use_capability",
            MetaAction::AskSelfQuestion { .. } => "ask_self_question",
            MetaAction::RecallMemory { .. } => "recall_memory",
            MetaAction::GenerateOptions => "generate_options",
            MetaAction::EvaluateOption { .. } => "evaluate_option",
            MetaAction::LogInsight { .. } => "log_insight",
            MetaAction::RaiseAlert { .. } => "raise_alert",
            MetaAction::Reconsider => "reconsider",
            MetaAction::Decide => "decide",
        }
    }

    /// Vocabulary listed in the iteration prompt
    pub const VOCABULARY: [&'static str; 9] = [
        "use_capability",
        "ask_self_question",
        "recall_memory",
        "generate_options",
        "evaluate_option",
        "log_insight",
        "raise_alert",
        "reconsider",
        "decide",
    ];
}

impl fmt::Display for MetaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaAction::UseCapability { tool, .. } => write!(f, "use_capability({})", tool),
            MetaAction::EvaluateOption { option_index: Some(i) } => {
                write!(f, "evaluate_option({})", i)
            }
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// The provider's choice for one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaActionChoice {
    pub action: MetaAction,
    pub reasoning: String,
    pub confidence: f64,
    /// The response could not be understood and was degraded to `decide`
    #[serde(default)]
    pub malformed: bool,
}

impl MetaActionChoice {
    pub fn new(action: MetaAction, reasoning: impl Into<String>, confidence: f64) -> Self {
        Self {
            action,
            reasoning: reasoning.into(),
            confidence: clamp_confidence(confidence),
            malformed: false,
        }
    }

    /// `decide` with zero confidence, flagged as malformed
    pub fn fallback(reason: &str) -> Self {
        Self {
            action: MetaAction::Decide,
            reasoning: reason.to_string(),
            confidence: 0.0,
            malformed: true,
        }
    }
}

/// Parse one provider response into a meta-action.
///
/// Accepts the object bare, fenced or surrounded by prose. Unknown actions,
/// missing required fields and non-JSON output all yield `decide`.
pub fn parse_meta_action(response: &str) -> MetaActionChoice {
    let Some(value) = extract_json_object(response) else {
        return MetaActionChoice::fallback("unparsable response, defaulting to decide");
    };

    let Some(name) = lenient_str(&value, "action") else {
        return MetaActionChoice::fallback("response has no action, defaulting to decide");
    };

    let reasoning = lenient_str(&value, "reasoning")
        .or_else(|| lenient_str(&value, "reason"))
        .unwrap_or_default();
    let confidence = lenient_f64(&value, "confidence").unwrap_or(0.5);

    match action_from_fields(&name, &value) {
        Some(action) => MetaActionChoice::new(action, reasoning, confidence),
        None => MetaActionChoice::fallback(&format!(
            "unusable action '{}', defaulting to decide",
            name
        )),
    }
}

fn action_from_fields(name: &str, v: &Value) -> Option<MetaAction> {
    let normalized = name.trim().to_lowercase().replace(['-', ' '], "_");
    let action = match normalized.as_str() {
        "use_capability" | "use_tool" | "tool" | "call_tool" => MetaAction::UseCapability {
            tool: lenient_str(v, "tool")
                .or_else(|| lenient_str(v, "capability"))
                .or_else(|| lenient_str(v, "name"))?,
            args: v
                .get("args")
                .or_else(|| v.get("arguments"))
                .cloned()
                .unwrap_or(Value::Object(Default::default())),
        },
        "ask_self_question" | "self_question" | "ask_self" => MetaAction::AskSelfQuestion {
            question: lenient_str(v, "question")?,
        },
        "recall_memory" | "recall" | "recall_memories" => MetaAction::RecallMemory {
            query: lenient_str(v, "query"),
        },
        "generate_options" | "generate" => MetaAction::GenerateOptions,
        "evaluate_option" | "evaluate" => MetaAction::EvaluateOption {
            option_index: lenient_f64(v, "option_index")
                .or_else(|| lenient_f64(v, "index"))
                .filter(|i| *i >= 0.0)
                .map(|i| i as usize),
        },
        "log_insight" | "insight" => MetaAction::LogInsight {
            insight: lenient_str(v, "insight").or_else(|| lenient_str(v, "message"))?,
        },
        "raise_alert" | "alert" => MetaAction::RaiseAlert {
            priority: lenient_str(v, "priority")
                .and_then(|p| p.parse().ok())
                .unwrap_or_default(),
            message: lenient_str(v, "message").or_else(|| lenient_str(v, "alert"))?,
        },
        "reconsider" | "retry" => MetaAction::Reconsider,
        "decide" | "finalize" | "final_decision" => MetaAction::Decide,
        _ => return None,
    };
    Some(action)
}

fn clamp_confidence(x: f64) -> f64 {
    if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 }
}
