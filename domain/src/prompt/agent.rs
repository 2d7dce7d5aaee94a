//! Prompt templates for the learning steps around the reasoning loop:
//! reflection, self-analysis, planning, memory summaries and news sentiment.

use crate::agent::config::AgentConfig;
use crate::agent::runtime_state::AgentRuntimeState;
use crate::memory::Experience;
use crate::reasoning::outcome::DecisionRecord;
use crate::reasoning::signals::{MarketSnapshot, NewsItem};

/// Decision records shown to reflection prompts
const MAX_RECORDS: usize = 20;

/// Templates for agent-level (non-iteration) prompts
pub struct AgentPromptTemplate;

impl AgentPromptTemplate {
    pub fn reflection_system() -> &'static str {
        r#"You are reviewing the recent decisions of an autonomous trading agent.
Be specific: name the signals that misled it and the ones that worked.
Weight adjustments are small deltas (between -0.1 and 0.1) to the four signal weights."#
    }

    /// Ask for a summary, lessons and optional weight deltas
    pub fn reflection_prompt(
        agent: &AgentConfig,
        state: &AgentRuntimeState,
        records: &[DecisionRecord],
    ) -> String {
        let weights = &agent.signal_weights;
        format!(
            r#"## Agent
style: {archetype}
weights: technical {t:.2}, news {n:.2}, onchain {o:.2}, sentiment {s:.2}

## Performance
{performance}

## Recent decisions
{records}

Respond with JSON:
{{"summary": "...", "lessons": ["..."], "weight_adjustment": {{"technical": 0.0, "news": 0.0, "onchain": 0.0, "sentiment": 0.0}}}}"#,
            archetype = agent.archetype,
            t = weights.technical,
            n = weights.news,
            o = weights.onchain,
            s = weights.sentiment,
            performance = performance_line(state),
            records = record_lines(records)
        )
    }

    /// Ask for a self-assessment of recent performance
    pub fn self_analysis_prompt(
        agent: &AgentConfig,
        state: &AgentRuntimeState,
        records: &[DecisionRecord],
    ) -> String {
        let mean_confidence = if records.is_empty() {
            0.0
        } else {
            records.iter().map(|r| r.decision.confidence).sum::<f64>() / records.len() as f64
        };
        format!(
            r#"{framing}

Assess your own recent performance honestly.

## Performance
{performance}
mean stated confidence: {mean_confidence:.2}

## Recent decisions
{records}

Respond with JSON:
{{"assessment": "...", "strengths": ["..."], "weaknesses": ["..."], "overconfidence": -1.0..1.0}}"#,
            framing = agent.archetype.prompt_framing(),
            performance = performance_line(state),
            mean_confidence = mean_confidence,
            records = record_lines(records)
        )
    }

    /// Ask for a trading plan with structured revision triggers
    pub fn plan_prompt(agent: &AgentConfig, snapshot: &MarketSnapshot, state: &AgentRuntimeState) -> String {
        format!(
            r#"{framing}

## Market
{market}

## Performance
{performance}

Write a short trading plan for the coming sessions and the conditions under
which it must be revised.

Respond with JSON:
{{"thesis": "...", "bias": "bullish|bearish|neutral", "entry_notes": "...", "exit_notes": "...",
 "triggers": [{{"kind": "price_move_pct", "pct": 5}}, {{"kind": "drawdown_pct", "pct": 10}},
              {{"kind": "consecutive_losses", "count": 3}}, {{"kind": "elapsed_hours", "hours": 24}}]}}"#,
            framing = agent.archetype.prompt_framing(),
            market = snapshot.summary(),
            performance = performance_line(state)
        )
    }

    /// Ask for a compact memory summary of one experience
    pub fn memory_summary_prompt(experience: &Experience) -> String {
        let pnl = experience
            .pnl_pct
            .map(|p| format!("{:+.2}%", p))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            r#"Condense this trading experience into a reusable memory.

context: {}
action: {}
outcome: {}
pnl: {}

Respond with JSON:
{{"context": "...", "action": "...", "outcome": "...", "lesson": "one sentence", "importance": 0.0-1.0}}"#,
            experience.context, experience.action, experience.outcome, pnl
        )
    }

    pub fn sentiment_system() -> &'static str {
        r#"You rate crypto news for traders. Score is the expected price effect in [-1, 1],
impact is 0-10, urgency is one of low, medium, high, immediate."#
    }

    pub fn sentiment_prompt(symbol: &str, item: &NewsItem) -> String {
        format!(
            "Instrument: {}\nHeadline: {}\nSummary: {}\nSource: {}\n\n\
             Respond with JSON: {{\"score\": 0.0, \"impact\": 0, \"urgency\": \"low\"}}",
            symbol, item.title, item.summary, item.source
        )
    }
}

fn performance_line(state: &AgentRuntimeState) -> String {
    format!(
        "balance {:.2}, equity {:.2}, cumulative pnl {:+.2}, wins {}, losses {} (win rate {:.0}%), drawdown {:.1}%",
        state.balance,
        state.equity,
        state.cumulative_pnl,
        state.wins,
        state.losses,
        state.win_rate() * 100.0,
        state.drawdown_pct(state.initial_budget)
    )
}

fn record_lines(records: &[DecisionRecord]) -> String {
    if records.is_empty() {
        return "(none)".to_string();
    }
    let skip = records.len().saturating_sub(MAX_RECORDS);
    records
        .iter()
        .skip(skip)
        .map(|r| format!("- {}", r.to_prompt_line()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::archetype::Archetype;
    use crate::core::ids::{AgentId, SessionId};
    use crate::reasoning::decision::Decision;
    use crate::reasoning::outcome::DecisionDisposition;

    #[test]
    fn test_reflection_prompt_includes_records() {
        let agent = AgentConfig::new("a", "ops", Archetype::Balanced);
        let state = AgentRuntimeState::new(AgentId::new("a"), "BTCUSDT", 1000.0);
        let record = DecisionRecord::new(
            Decision::hold(AgentId::new("a"), SessionId::generate(), 0.4, "choppy tape"),
            DecisionDisposition::NoOp,
        );
        let prompt = AgentPromptTemplate::reflection_prompt(&agent, &state, &[record]);
        assert!(prompt.contains("choppy tape"));
        assert!(prompt.contains("weight_adjustment"));
        assert!(prompt.contains("technical 0.25"));
    }

    #[test]
    fn test_empty_records() {
        let agent = AgentConfig::new("a", "ops", Archetype::Scalper);
        let state = AgentRuntimeState::new(AgentId::new("a"), "BTCUSDT", 1000.0);
        let prompt = AgentPromptTemplate::self_analysis_prompt(&agent, &state, &[]);
        assert!(prompt.contains("(none)"));
        assert!(prompt.contains("mean stated confidence: 0.00"));
    }

    #[test]
    fn test_memory_summary_prompt() {
        let experience = Experience::new("range", "long 5%", "stopped out").with_pnl(-1.5);
        let prompt = AgentPromptTemplate::memory_summary_prompt(&experience);
        assert!(prompt.contains("-1.50%"));
        assert!(prompt.contains("stopped out"));
    }
}
