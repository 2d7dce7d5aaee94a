//! Deterministic offline reasoning provider.
//!
//! Answers every call from the structured context that travels with the
//! request, scoring the observation with [`SignalScores`] and the agent's own
//! weights. Responses are the JSON shapes the domain parsers read, so the
//! whole loop runs without a model.

use async_trait::async_trait;
use fleet_application::ports::reasoning_provider::{
    DecideRequest, EvaluateRequest, FinalDecisionRequest, OptionsRequest, PlanRequest,
    ProviderError, ReasoningProvider, ReviewRequest, SummarizeRequest,
};
use fleet_domain::{
    AgentConfig, Archetype, DecisionDisposition, DecisionRecord, MarketSnapshot, SignalScores,
    TradeAction,
};
use serde_json::{Value, json};

/// Composite scores inside this band produce no directional option
const CONVICTION_BAND: f64 = 0.15;

pub struct HeuristicProvider;

impl HeuristicProvider {
    /// Composite signal, mirrored for contrarians
    fn conviction(agent: &AgentConfig, snapshot: &MarketSnapshot) -> f64 {
        let composite = SignalScores::compute(snapshot, &agent.signal_weights).composite;
        if agent.archetype == Archetype::Contrarian {
            -composite
        } else {
            composite
        }
    }

    fn score_option(action: TradeAction, conviction: f64) -> f64 {
        match action {
            TradeAction::Long => (1.0 + conviction) / 2.0,
            TradeAction::Short => (1.0 - conviction) / 2.0,
            TradeAction::Hold => 1.0 - conviction.abs(),
            TradeAction::Close => 0.5,
        }
    }

    fn text(value: Value) -> Result<String, ProviderError> {
        Ok(value.to_string())
    }
}

/// Outcome counts over a window of decision records
struct Tally {
    executed: usize,
    blocked: usize,
    failed: usize,
    wins: usize,
    losses: usize,
    realized: f64,
    mean_confidence_of_losses: Option<f64>,
}

impl Tally {
    fn of(records: &[DecisionRecord]) -> Self {
        let mut tally = Tally {
            executed: 0,
            blocked: 0,
            failed: 0,
            wins: 0,
            losses: 0,
            realized: 0.0,
            mean_confidence_of_losses: None,
        };
        let mut loss_confidence = Vec::new();
        for record in records {
            match &record.disposition {
                DecisionDisposition::Executed => tally.executed += 1,
                DecisionDisposition::Blocked { .. } => tally.blocked += 1,
                DecisionDisposition::ExecutionFailed { .. } => tally.failed += 1,
                DecisionDisposition::NoOp => {}
            }
            if let Some(pnl) = record.execution.as_ref().and_then(|e| e.realized_pnl) {
                tally.realized += pnl;
                if pnl > 0.0 {
                    tally.wins += 1;
                } else {
                    tally.losses += 1;
                    loss_confidence.push(record.decision.confidence);
                }
            }
        }
        if !loss_confidence.is_empty() {
            tally.mean_confidence_of_losses =
                Some(loss_confidence.iter().sum::<f64>() / loss_confidence.len() as f64);
        }
        tally
    }

    fn closed(&self) -> usize {
        self.wins + self.losses
    }
}

#[async_trait]
impl ReasoningProvider for HeuristicProvider {
    fn name(&self) -> &str {
        "heuristic"
    }

    /// gather indicators, generate options, evaluate each, decide
    async fn decide(&self, request: &DecideRequest<'_>) -> Result<String, ProviderError> {
        let state = request.state;
        if state.tool_results.is_empty() && !state.observation.candles.is_empty() {
            return Self::text(json!({
                "action": "use_capability",
                "tool": "compute_indicator",
                "args": {"indicator": "rsi", "period": 14},
                "reasoning": "check momentum before sizing anything",
                "confidence": 0.5,
            }));
        }
        if state.options.is_empty() {
            return Self::text(json!({
                "action": "generate_options",
                "reasoning": "no candidate trades yet",
                "confidence": 0.5,
            }));
        }
        if let Some(index) = state.evaluation_target(None) {
            return Self::text(json!({
                "action": "evaluate_option",
                "option_index": index,
                "reasoning": "every option gets a score",
                "confidence": 0.5,
            }));
        }
        Self::text(json!({
            "action": "decide",
            "reasoning": "all options evaluated",
            "confidence": 0.6,
        }))
    }

    async fn generate_options(&self, request: &OptionsRequest<'_>) -> Result<String, ProviderError> {
        let conviction = Self::conviction(request.agent, &request.state.observation);
        let limits = &request.agent.limits;
        let mut options = Vec::new();

        if conviction.abs() > CONVICTION_BAND {
            let action = if conviction > 0.0 { "long" } else { "short" };
            let size = (limits.max_position_pct * conviction.abs()).max(1.0);
            let leverage = (1.0 + conviction.abs() * 2.0).min(limits.max_leverage).max(1.0);
            options.push(json!({
                "action": action,
                "size_pct": (size * 10.0).round() / 10.0,
                "leverage": leverage.round(),
                "stop_loss_pct": limits.stop_loss_pct,
                "take_profit_pct": limits.take_profit_pct,
                "rationale": format!("composite signal {:+.2}", conviction),
            }));
        }
        options.push(json!({
            "action": "hold",
            "rationale": "wait for a clearer signal",
        }));
        Self::text(json!({ "options": options }))
    }

    async fn evaluate_option(&self, request: &EvaluateRequest<'_>) -> Result<String, ProviderError> {
        let option = request
            .state
            .options
            .get(request.option_index)
            .ok_or_else(|| {
                ProviderError::RequestFailed(format!("no option {}", request.option_index))
            })?;
        let conviction = Self::conviction(request.agent, &request.state.observation);
        let score = Self::score_option(option.action, conviction);
        Self::text(json!({
            "score": score,
            "confidence": 0.4 + 0.5 * conviction.abs(),
            "rationale": format!("{} against composite {:+.2}", option.action, conviction),
        }))
    }

    async fn make_final_decision(
        &self,
        request: &FinalDecisionRequest<'_>,
    ) -> Result<String, ProviderError> {
        let (option, evaluation) = request
            .state
            .best_evaluation()
            .ok_or(ProviderError::Unsupported("final decision without evaluations"))?;
        Self::text(json!({
            "option_index": evaluation.option_index,
            "confidence": evaluation.score,
            "reason": format!("{} scored best ({:.2})", option.action, evaluation.score),
        }))
    }

    async fn reflect(&self, request: &ReviewRequest<'_>) -> Result<String, ProviderError> {
        let tally = Tally::of(request.records);
        let mut lessons = Vec::new();
        if tally.blocked > tally.executed {
            lessons.push("Validators block most proposals; size down or wait for clearer setups.");
        }
        if tally.failed > 0 {
            lessons.push("Some orders failed at the venue; check balance before opening.");
        }
        if tally.closed() >= 3 && tally.losses > tally.wins {
            lessons.push("Losing trades outnumber winners; technical signals alone are not enough.");
        }

        let mut reflection = json!({
            "summary": format!(
                "{} executed, {} blocked, {} failed; realized {:+.2} over {} closed trades",
                tally.executed,
                tally.blocked,
                tally.failed,
                tally.realized,
                tally.closed()
            ),
            "lessons": lessons,
        });
        if tally.closed() >= 3 && tally.losses > tally.wins {
            reflection["weight_adjustment"] = json!({
                "technical": -0.05,
                "news": 0.02,
                "onchain": 0.02,
                "sentiment": 0.01,
            });
        }
        Self::text(reflection)
    }

    async fn self_analyze(&self, request: &ReviewRequest<'_>) -> Result<String, ProviderError> {
        let tally = Tally::of(request.records);
        let win_rate = request.runtime.win_rate();
        let mut strengths = Vec::new();
        let mut weaknesses = Vec::new();
        if win_rate >= 0.5 && tally.closed() > 0 {
            strengths.push("entries are mostly profitable".to_string());
        }
        if tally.blocked == 0 && tally.executed > 0 {
            strengths.push("proposals pass validation".to_string());
        }
        if tally.losses > tally.wins {
            weaknesses.push("more losing than winning trades".to_string());
        }
        if tally.blocked > 0 {
            weaknesses.push(format!("{} proposals blocked by validators", tally.blocked));
        }
        let overconfidence = tally
            .mean_confidence_of_losses
            .map(|c| (c - win_rate).max(0.0));

        Self::text(json!({
            "assessment": format!(
                "{} agent at {:.0}% win rate, cumulative PnL {:+.2}",
                request.agent.archetype,
                win_rate * 100.0,
                request.runtime.cumulative_pnl
            ),
            "strengths": strengths,
            "weaknesses": weaknesses,
            "overconfidence": overconfidence,
        }))
    }

    async fn create_plan(&self, request: &PlanRequest<'_>) -> Result<String, ProviderError> {
        let conviction = Self::conviction(request.agent, request.snapshot);
        let bias = if conviction > CONVICTION_BAND {
            "bullish"
        } else if conviction < -CONVICTION_BAND {
            "bearish"
        } else {
            "neutral"
        };
        let limits = &request.agent.limits;
        Self::text(json!({
            "thesis": format!(
                "{} reads {} (composite {:+.2})",
                request.snapshot.symbol, bias, conviction
            ),
            "bias": bias,
            "entry_notes": format!("enter only with confidence above {:.2}", limits.min_confidence),
            "exit_notes": format!(
                "stop {:.1}%, take profit {:.1}%",
                limits.stop_loss_pct, limits.take_profit_pct
            ),
            "triggers": [
                {"kind": "price_move_pct", "pct": limits.stop_loss_pct.max(1.0) * 2.0},
                {"kind": "drawdown_pct", "pct": 10.0},
                {"kind": "consecutive_losses", "count": 3},
                {"kind": "elapsed_hours", "hours": 24.0},
            ],
        }))
    }

    async fn summarize_memory(&self, request: &SummarizeRequest<'_>) -> Result<String, ProviderError> {
        let experience = request.experience;
        let (lesson, importance) = match experience.pnl_pct {
            Some(pnl) if pnl > 0.0 => (
                format!("'{}' paid off ({:+.2}%) when {}", experience.action, pnl, experience.context),
                0.5 + (pnl.abs() / 10.0).min(0.4),
            ),
            Some(pnl) => (
                format!("'{}' lost {:.2}% when {}", experience.action, pnl.abs(), experience.context),
                0.5 + (pnl.abs() / 10.0).min(0.4),
            ),
            None => (
                format!("{} -> {}", experience.action, experience.outcome),
                0.3,
            ),
        };
        Self::text(json!({
            "context": experience.context,
            "action": experience.action,
            "outcome": experience.outcome,
            "lesson": experience.lesson.clone().unwrap_or(lesson),
            "importance": experience.importance_hint.unwrap_or(importance),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_application::ports::reasoning_provider::Prompt;
    use fleet_domain::reasoning::parsing::{parse_evaluation, parse_options};
    use fleet_domain::reasoning::{MetaAction, parse_meta_action};
    use fleet_domain::{ReasoningState, TradingPlan};

    fn bullish() -> MarketSnapshot {
        let mut s = MarketSnapshot::new("BTCUSDT", 65_000.0);
        s.change_24h_pct = 6.0;
        s.rsi = Some(62.0);
        s.macd_histogram = Some(1.2);
        s.news_sentiment = Some(0.7);
        s.whale_net_flow_usd = Some(30_000_000.0);
        s.fear_greed = Some(75.0);
        s
    }

    #[tokio::test]
    async fn test_bullish_options_include_long() {
        let agent = AgentConfig::new("a", "ops", Archetype::Balanced);
        let state = ReasoningState::new(bullish(), None);
        let response = HeuristicProvider
            .generate_options(&OptionsRequest {
                agent: &agent,
                state: &state,
                iteration: 0,
                prompt: Prompt::default(),
            })
            .await
            .unwrap();

        let options = parse_options(&response);
        assert_eq!(options[0].action, TradeAction::Long);
        assert!(options[0].size_pct <= agent.limits.max_position_pct);
        assert_eq!(options.last().map(|o| o.action), Some(TradeAction::Hold));
    }

    #[tokio::test]
    async fn test_contrarian_goes_the_other_way() {
        let agent = AgentConfig::new("c", "ops", Archetype::Contrarian);
        let state = ReasoningState::new(bullish(), None);
        let response = HeuristicProvider
            .generate_options(&OptionsRequest {
                agent: &agent,
                state: &state,
                iteration: 0,
                prompt: Prompt::default(),
            })
            .await
            .unwrap();
        assert_eq!(parse_options(&response)[0].action, TradeAction::Short);
    }

    async fn next_action(agent: &AgentConfig, state: &ReasoningState) -> MetaAction {
        let request = DecideRequest {
            agent,
            state,
            iteration: 0,
            prompt: Prompt::default(),
        };
        parse_meta_action(&HeuristicProvider.decide(&request).await.unwrap()).action
    }

    #[tokio::test]
    async fn test_decide_walks_the_stages() {
        let agent = AgentConfig::new("a", "ops", Archetype::Balanced);
        let mut state = ReasoningState::new(bullish(), None);

        assert_eq!(next_action(&agent, &state).await, MetaAction::GenerateOptions);

        state.set_options(parse_options(
            r#"{"options": [{"action": "long", "size_pct": 5}, {"action": "hold"}]}"#,
        ));
        assert_eq!(
            next_action(&agent, &state).await,
            MetaAction::EvaluateOption { option_index: Some(0) }
        );

        for i in 0..2 {
            state.record_evaluation(parse_evaluation(r#"{"score": 0.5}"#, i).unwrap());
        }
        assert_eq!(next_action(&agent, &state).await, MetaAction::Decide);
    }

    #[tokio::test]
    async fn test_plan_parses_with_triggers() {
        let agent = AgentConfig::new("a", "ops", Archetype::Balanced);
        let runtime = fleet_domain::AgentRuntimeState::new(agent.id.clone(), "BTCUSDT", 1_000.0);
        let snapshot = bullish();
        let response = HeuristicProvider
            .create_plan(&PlanRequest {
                agent: &agent,
                snapshot: &snapshot,
                runtime: &runtime,
                prompt: Prompt::default(),
            })
            .await
            .unwrap();

        let plan = TradingPlan::from_response(agent.id.clone(), &response, snapshot.price).unwrap();
        assert_eq!(plan.triggers.len(), 4);
        assert!(plan.thesis.contains("bullish"));
    }
}
