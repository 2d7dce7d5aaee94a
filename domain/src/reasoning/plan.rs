//! Trading plans and the conditions that force their revision.
//!
//! A plan carries structured [`RevisionTrigger`]s. Each trigger kind is
//! evaluated by a [`TriggerPredicate`] looked up in a [`TriggerRegistry`];
//! custom triggers resolve by name, so new conditions plug in without
//! touching the evaluator.

use crate::agent::runtime_state::AgentRuntimeState;
use crate::core::ids::AgentId;
use crate::core::json::{extract_json_object, lenient_f64, lenient_str};
use crate::reasoning::signals::MarketSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Directional stance of a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketBias {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl MarketBias {
    fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "bullish" | "long" | "up" => MarketBias::Bullish,
            "bearish" | "short" | "down" => MarketBias::Bearish,
            _ => MarketBias::Neutral,
        }
    }
}

/// A condition under which the plan must be re-created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RevisionTrigger {
    /// Absolute move from the plan's reference price, in percent
    PriceMovePct { pct: f64 },
    /// Equity drawdown below the initial budget, in percent
    DrawdownPct { pct: f64 },
    ConsecutiveLosses { count: u32 },
    ElapsedHours { hours: f64 },
    /// Evaluated by the predicate registered under `name`
    Custom {
        name: String,
        #[serde(default)]
        params: Value,
    },
}

impl RevisionTrigger {
    /// Registry key of the predicate that evaluates this trigger
    pub fn predicate_key(&self) -> &str {
        match self {
            RevisionTrigger::PriceMovePct { .. } => "price_move_pct",
            RevisionTrigger::DrawdownPct { .. } => "drawdown_pct",
            RevisionTrigger::ConsecutiveLosses { .. } => "consecutive_losses",
            RevisionTrigger::ElapsedHours { .. } => "elapsed_hours",
            RevisionTrigger::Custom { name, .. } => name,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RevisionTrigger::PriceMovePct { pct } => format!("price moves {:.1}%", pct),
            RevisionTrigger::DrawdownPct { pct } => format!("drawdown exceeds {:.1}%", pct),
            RevisionTrigger::ConsecutiveLosses { count } => {
                format!("{} consecutive losses", count)
            }
            RevisionTrigger::ElapsedHours { hours } => format!("{:.0}h elapsed", hours),
            RevisionTrigger::Custom { name, .. } => format!("custom: {}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPlan {
    pub id: Uuid,
    pub agent_id: AgentId,
    pub thesis: String,
    pub bias: MarketBias,
    #[serde(default)]
    pub entry_notes: String,
    #[serde(default)]
    pub exit_notes: String,
    #[serde(default)]
    pub triggers: Vec<RevisionTrigger>,
    /// Price when the plan was made; base of price-move triggers
    pub reference_price: f64,
    pub created_at: DateTime<Utc>,
}

impl TradingPlan {
    pub fn new(agent_id: AgentId, thesis: impl Into<String>, bias: MarketBias, reference_price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            thesis: thesis.into(),
            bias,
            entry_notes: String::new(),
            exit_notes: String::new(),
            triggers: Vec::new(),
            reference_price,
            created_at: Utc::now(),
        }
    }

    pub fn with_triggers(mut self, triggers: Vec<RevisionTrigger>) -> Self {
        self.triggers = triggers;
        self
    }

    /// Summary injected into the reasoning prompt
    pub fn summary(&self) -> String {
        let mut s = format!("{:?} plan: {}", self.bias, self.thesis);
        if !self.entry_notes.is_empty() {
            s.push_str(&format!(" | entry: {}", self.entry_notes));
        }
        if !self.exit_notes.is_empty() {
            s.push_str(&format!(" | exit: {}", self.exit_notes));
        }
        if !self.triggers.is_empty() {
            let triggers: Vec<String> = self.triggers.iter().map(|t| t.describe()).collect();
            s.push_str(&format!(" | revise when: {}", triggers.join("; ")));
        }
        s
    }

    /// Lenient parse of a `create_plan` response.
    ///
    /// Returns `None` only when no thesis can be found. Triggers that do not
    /// decode are skipped.
    pub fn from_response(agent_id: AgentId, response: &str, reference_price: f64) -> Option<Self> {
        let value = extract_json_object(response)?;
        let thesis = lenient_str(&value, "thesis").or_else(|| lenient_str(&value, "summary"))?;
        let bias = lenient_str(&value, "bias")
            .map(|b| MarketBias::parse_lenient(&b))
            .unwrap_or_default();

        let triggers = value
            .get("triggers")
            .and_then(|t| t.as_array())
            .map(|items| items.iter().filter_map(parse_trigger).collect())
            .unwrap_or_default();

        let mut plan = TradingPlan::new(agent_id, thesis, bias, reference_price).with_triggers(triggers);
        plan.entry_notes = lenient_str(&value, "entry_notes")
            .or_else(|| lenient_str(&value, "entry"))
            .unwrap_or_default();
        plan.exit_notes = lenient_str(&value, "exit_notes")
            .or_else(|| lenient_str(&value, "exit"))
            .unwrap_or_default();
        Some(plan)
    }
}

fn parse_trigger(item: &Value) -> Option<RevisionTrigger> {
    if let Ok(trigger) = serde_json::from_value::<RevisionTrigger>(item.clone()) {
        return Some(trigger);
    }
    // {"kind": "...", "value": N} shorthand
    let kind = lenient_str(item, "kind")?;
    let value = lenient_f64(item, "value");
    match kind.as_str() {
        "price_move_pct" => Some(RevisionTrigger::PriceMovePct { pct: value? }),
        "drawdown_pct" => Some(RevisionTrigger::DrawdownPct { pct: value? }),
        "consecutive_losses" => Some(RevisionTrigger::ConsecutiveLosses {
            count: value.filter(|v| *v >= 0.0)? as u32,
        }),
        "elapsed_hours" => Some(RevisionTrigger::ElapsedHours { hours: value? }),
        other => Some(RevisionTrigger::Custom {
            name: other.to_string(),
            params: item.clone(),
        }),
    }
}

/// What a predicate can look at.
#[derive(Debug, Clone, Copy)]
pub struct TriggerContext<'a> {
    pub plan: &'a TradingPlan,
    pub snapshot: &'a MarketSnapshot,
    pub state: &'a AgentRuntimeState,
    pub initial_budget: f64,
    pub now: DateTime<Utc>,
}

/// Decides whether one trigger fires.
pub trait TriggerPredicate: Send + Sync {
    fn fires(&self, trigger: &RevisionTrigger, ctx: &TriggerContext<'_>) -> bool;
}

impl<F> TriggerPredicate for F
where
    F: Fn(&RevisionTrigger, &TriggerContext<'_>) -> bool + Send + Sync,
{
    fn fires(&self, trigger: &RevisionTrigger, ctx: &TriggerContext<'_>) -> bool {
        self(trigger, ctx)
    }
}

/// Predicates keyed by [`RevisionTrigger::predicate_key`].
#[derive(Clone)]
pub struct TriggerRegistry {
    predicates: HashMap<String, Arc<dyn TriggerPredicate>>,
}

impl std::fmt::Debug for TriggerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.predicates.keys().collect();
        keys.sort();
        f.debug_struct("TriggerRegistry").field("predicates", &keys).finish()
    }
}

impl Default for TriggerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl TriggerRegistry {
    pub fn empty() -> Self {
        Self {
            predicates: HashMap::new(),
        }
    }

    /// Registry with predicates for every structured trigger kind.
    pub fn with_builtins() -> Self {
        Self::empty()
            .register("price_move_pct", price_moved)
            .register("drawdown_pct", drawdown_exceeded)
            .register("consecutive_losses", losing_streak)
            .register("elapsed_hours", plan_expired)
    }

    pub fn register(mut self, key: impl Into<String>, predicate: impl TriggerPredicate + 'static) -> Self {
        self.predicates.insert(key.into(), Arc::new(predicate));
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.predicates.contains_key(key)
    }

    /// Triggers of the plan that fire now. Unregistered keys never fire.
    pub fn fired<'p>(&self, ctx: &TriggerContext<'p>) -> Vec<&'p RevisionTrigger> {
        ctx.plan
            .triggers
            .iter()
            .filter(|t| {
                self.predicates
                    .get(t.predicate_key())
                    .is_some_and(|p| p.fires(t, ctx))
            })
            .collect()
    }
}

fn price_moved(trigger: &RevisionTrigger, ctx: &TriggerContext<'_>) -> bool {
    let RevisionTrigger::PriceMovePct { pct } = trigger else {
        return false;
    };
    let reference = ctx.plan.reference_price;
    if reference <= 0.0 || !reference.is_finite() {
        return false;
    }
    ((ctx.snapshot.price - reference) / reference * 100.0).abs() >= *pct
}

fn drawdown_exceeded(trigger: &RevisionTrigger, ctx: &TriggerContext<'_>) -> bool {
    let RevisionTrigger::DrawdownPct { pct } = trigger else {
        return false;
    };
    ctx.state.drawdown_pct(ctx.initial_budget) >= *pct
}

fn losing_streak(trigger: &RevisionTrigger, ctx: &TriggerContext<'_>) -> bool {
    let RevisionTrigger::ConsecutiveLosses { count } = trigger else {
        return false;
    };
    *count > 0 && ctx.state.consecutive_losses >= *count
}

fn plan_expired(trigger: &RevisionTrigger, ctx: &TriggerContext<'_>) -> bool {
    let RevisionTrigger::ElapsedHours { hours } = trigger else {
        return false;
    };
    let elapsed = (ctx.now - ctx.plan.created_at).num_seconds() as f64 / 3600.0;
    elapsed >= *hours
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn plan(triggers: Vec<RevisionTrigger>) -> TradingPlan {
        TradingPlan::new(AgentId::new("a"), "trend up", MarketBias::Bullish, 100.0).with_triggers(triggers)
    }

    fn state() -> AgentRuntimeState {
        AgentRuntimeState::new(AgentId::new("a"), "BTCUSDT", 1000.0)
    }

    #[test]
    fn test_price_move_trigger() {
        let plan = plan(vec![RevisionTrigger::PriceMovePct { pct: 5.0 }]);
        let state = state();
        let registry = TriggerRegistry::with_builtins();

        let calm = MarketSnapshot::new("BTCUSDT", 103.0);
        let ctx = TriggerContext { plan: &plan, snapshot: &calm, state: &state, initial_budget: 1000.0, now: Utc::now() };
        assert!(registry.fired(&ctx).is_empty());

        let crash = MarketSnapshot::new("BTCUSDT", 94.0);
        let ctx = TriggerContext { snapshot: &crash, ..ctx };
        assert_eq!(registry.fired(&ctx).len(), 1);
    }

    #[test]
    fn test_losses_and_elapsed_triggers() {
        let plan = plan(vec![
            RevisionTrigger::ConsecutiveLosses { count: 2 },
            RevisionTrigger::ElapsedHours { hours: 24.0 },
        ]);
        let mut state = state();
        state.record_realized(-10.0);
        state.record_realized(-10.0);
        let snapshot = MarketSnapshot::new("BTCUSDT", 100.0);
        let registry = TriggerRegistry::with_builtins();

        let ctx = TriggerContext { plan: &plan, snapshot: &snapshot, state: &state, initial_budget: 1000.0, now: Utc::now() };
        let fired = registry.fired(&ctx);
        assert_eq!(fired, vec![&RevisionTrigger::ConsecutiveLosses { count: 2 }]);

        let later = TriggerContext { now: Utc::now() + Duration::hours(25), ..ctx };
        assert_eq!(registry.fired(&later).len(), 2);
    }

    #[test]
    fn test_custom_predicate_plugs_in() {
        let trigger = RevisionTrigger::Custom {
            name: "extreme_greed".to_string(),
            params: serde_json::json!({"above": 80}),
        };
        let plan = plan(vec![trigger]);
        let state = state();
        let mut snapshot = MarketSnapshot::new("BTCUSDT", 100.0);
        snapshot.fear_greed = Some(90.0);

        let ctx = TriggerContext { plan: &plan, snapshot: &snapshot, state: &state, initial_budget: 1000.0, now: Utc::now() };
        // unregistered: never fires
        assert!(TriggerRegistry::with_builtins().fired(&ctx).is_empty());

        fn extreme_greed(t: &RevisionTrigger, ctx: &TriggerContext<'_>) -> bool {
            let RevisionTrigger::Custom { params, .. } = t else {
                return false;
            };
            let above = params.get("above").and_then(|v| v.as_f64()).unwrap_or(100.0);
            ctx.snapshot.fear_greed.is_some_and(|fg| fg > above)
        }
        let registry = TriggerRegistry::with_builtins().register("extreme_greed", extreme_greed);
        assert_eq!(registry.fired(&ctx).len(), 1);
    }

    #[test]
    fn test_plan_from_response() {
        let response = r#"Plan:
```json
{"thesis": "accumulation near support", "bias": "long", "entry": "scale in below 98",
 "triggers": [
   {"kind": "price_move_pct", "pct": 4},
   {"kind": "drawdown_pct", "value": "10"},
   {"kind": "funding_flip"},
   {"nonsense": true}
 ]}
```"#;
        let plan = TradingPlan::from_response(AgentId::new("a"), response, 100.0).unwrap();
        assert_eq!(plan.bias, MarketBias::Bullish);
        assert_eq!(plan.entry_notes, "scale in below 98");
        assert_eq!(plan.triggers.len(), 3);
        assert_eq!(plan.triggers[1], RevisionTrigger::DrawdownPct { pct: 10.0 });
        assert_eq!(plan.triggers[2].predicate_key(), "funding_flip");
        assert!(plan.summary().contains("revise when"));

        assert!(TradingPlan::from_response(AgentId::new("a"), "{\"bias\": \"up\"}", 1.0).is_none());
    }
}
