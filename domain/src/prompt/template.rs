//! Prompt templates for the reasoning loop

use crate::agent::config::AgentConfig;
use crate::reasoning::decision::TradeOption;
use crate::reasoning::session::ThoughtStep;
use crate::reasoning::state::ReasoningState;
use crate::tool::CapabilityName;

/// Lines of history shown per section before older entries are elided
const MAX_SECTION_LINES: usize = 12;

/// Templates for generating prompts at each stage of a reasoning session
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt for choosing the next meta-action
    pub fn reasoning_system(agent: &AgentConfig) -> String {
        let capabilities = CapabilityName::ALL
            .iter()
            .map(|c| format!("- {}", c.signature()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"{framing}

You reason step by step towards ONE trading decision for your account.
At every step you choose exactly one next action:

- use_capability {{"tool": "...", "args": {{...}}}} - gather data
- ask_self_question {{"question": "..."}} - check what you already know
- recall_memory {{"query": "..."}} - pull relevant past experiences
- generate_options - enumerate candidate trades
- evaluate_option {{"option_index": N}} - score one candidate
- log_insight {{"insight": "..."}} - write down a conclusion
- raise_alert {{"priority": "low|medium|high|critical", "message": "..."}}
- reconsider - discard the candidates and start over
- decide - finalize (only useful once an option has been evaluated)

Capabilities:
{capabilities}

Respond with a single JSON object:
{{"action": "<one of the actions>", "reasoning": "...", "confidence": 0.0-1.0, ...action fields}}"#,
            framing = agent.archetype.prompt_framing(),
            capabilities = capabilities
        )
    }

    /// User prompt for one iteration
    pub fn iteration_prompt(
        agent: &AgentConfig,
        state: &ReasoningState,
        steps: &[ThoughtStep],
        iteration: u32,
        max_iterations: u32,
    ) -> String {
        let mut prompt = format!(
            "## Iteration {} of {}\n\n## Market\n{}\n",
            iteration + 1,
            max_iterations,
            state.observation.summary()
        );

        prompt.push_str(&format!(
            "\n## Limits\nmax position {:.1}%, max leverage {:.1}x, default stop {:.1}%, min confidence {:.2}\n",
            agent.limits.max_position_pct,
            agent.limits.max_leverage,
            agent.limits.stop_loss_pct,
            agent.limits.min_confidence
        ));

        if let Some(plan) = &state.plan_summary {
            prompt.push_str(&format!("\n## Current plan\n{}\n", plan));
        }

        push_section(
            &mut prompt,
            "Memories",
            state.memories.iter().map(|m| m.to_prompt_line()),
        );
        push_section(
            &mut prompt,
            "Tool results",
            state.tool_results.iter().map(|t| {
                let status = if t.success { "ok" } else { "failed" };
                format!("{} [{}]: {}", t.tool, status, crate::core::string::truncate(&t.output, 400))
            }),
        );
        push_section(&mut prompt, "Insights", state.insights.iter().cloned());
        push_section(&mut prompt, "Options", options_lines(&state.options, state));
        push_section(&mut prompt, "Previous steps", steps.iter().map(|s| s.to_prompt_line()));

        prompt.push_str("\nChoose the next action.");
        prompt
    }

    /// Prompt asking for candidate trades
    pub fn options_prompt(agent: &AgentConfig, state: &ReasoningState) -> String {
        let mut prompt = format!(
            "{}\n\n## Market\n{}\n",
            agent.archetype.prompt_framing(),
            state.observation.summary()
        );
        push_section(&mut prompt, "Insights", state.insights.iter().cloned());
        push_section(
            &mut prompt,
            "Memories",
            state.memories.iter().map(|m| m.to_prompt_line()),
        );
        prompt.push_str(&format!(
            r#"
List 2-4 distinct candidate trades, including holding. Size in percent of balance
(max {:.1}), leverage at most {:.1}.

Respond with JSON:
{{"options": [{{"action": "long|short|close|hold", "size_pct": 0, "leverage": 1, "stop_loss_pct": 0, "take_profit_pct": 0, "rationale": "..."}}]}}"#,
            agent.limits.max_position_pct, agent.limits.max_leverage
        ));
        prompt
    }

    /// Prompt asking for a score of one option
    pub fn evaluate_prompt(state: &ReasoningState, option_index: usize, option: &TradeOption) -> String {
        let mut prompt = format!(
            "## Market\n{}\n\n## Candidate #{}\n{}\n",
            state.observation.summary(),
            option_index,
            option.describe()
        );
        push_section(&mut prompt, "Insights", state.insights.iter().cloned());
        push_section(
            &mut prompt,
            "Tool results",
            state.tool_results.iter().filter(|t| t.success).map(|t| format!("{}: {}", t.tool, t.output)),
        );
        prompt.push_str(
            "\nScore this candidate against the evidence.\n\
             Respond with JSON: {\"score\": 0.0-1.0, \"confidence\": 0.0-1.0, \"rationale\": \"...\"}",
        );
        prompt
    }

    /// Prompt asking the provider to pick among evaluated options
    pub fn final_decision_prompt(agent: &AgentConfig, state: &ReasoningState) -> String {
        let mut prompt = format!(
            "{}\n\n## Market\n{}\n",
            agent.archetype.prompt_framing(),
            state.observation.summary()
        );
        push_section(&mut prompt, "Evaluated options", options_lines(&state.options, state));
        push_section(&mut prompt, "Insights", state.insights.iter().cloned());
        prompt.push_str(&format!(
            "\nPick one option. Anything below confidence {:.2} will be treated as hold.\n\
             Respond with JSON: {{\"option_index\": N, \"confidence\": 0.0-1.0, \"reason\": \"...\"}}",
            agent.limits.min_confidence
        ));
        prompt
    }
}

fn options_lines<'a>(
    options: &'a [TradeOption],
    state: &'a ReasoningState,
) -> impl Iterator<Item = String> + 'a {
    options.iter().enumerate().map(move |(i, option)| {
        match state.evaluations.iter().find(|e| e.option_index == i) {
            Some(eval) => format!(
                "#{} {} -> score {:.2}, confidence {:.2}: {}",
                i,
                option.describe(),
                eval.score,
                eval.confidence,
                eval.rationale
            ),
            None => format!("#{} {} (not evaluated)", i, option.describe()),
        }
    })
}

fn push_section(prompt: &mut String, title: &str, lines: impl Iterator<Item = String>) {
    let lines: Vec<String> = lines.collect();
    if lines.is_empty() {
        return;
    }
    prompt.push_str(&format!("\n## {}\n", title));
    let skipped = lines.len().saturating_sub(MAX_SECTION_LINES);
    if skipped > 0 {
        prompt.push_str(&format!("({} earlier entries omitted)\n", skipped));
    }
    for line in lines.into_iter().skip(skipped) {
        prompt.push_str("- ");
        prompt.push_str(&line);
        prompt.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::archetype::Archetype;
    use crate::reasoning::decision::{OptionEvaluation, TradeAction};
    use crate::reasoning::signals::MarketSnapshot;

    fn state() -> ReasoningState {
        ReasoningState::new(MarketSnapshot::new("BTCUSDT", 65_000.0), Some("wait for breakout".to_string()))
    }

    #[test]
    fn test_system_prompt_lists_capabilities() {
        let agent = AgentConfig::new("a", "ops", Archetype::Contrarian);
        let prompt = PromptTemplate::reasoning_system(&agent);
        assert!(prompt.contains("contrarian"));
        for name in CapabilityName::ALL {
            assert!(prompt.contains(name.as_str()));
        }
    }

    #[test]
    fn test_iteration_prompt_sections() {
        let agent = AgentConfig::new("a", "ops", Archetype::Balanced);
        let mut state = state();
        state.insights.push("funding is flipping negative".to_string());
        let prompt = PromptTemplate::iteration_prompt(&agent, &state, &[], 2, 8);
        assert!(prompt.contains("Iteration 3 of 8"));
        assert!(prompt.contains("BTCUSDT"));
        assert!(prompt.contains("wait for breakout"));
        assert!(prompt.contains("funding is flipping negative"));
        assert!(!prompt.contains("## Options"));
    }

    #[test]
    fn test_long_sections_are_elided() {
        let agent = AgentConfig::new("a", "ops", Archetype::Balanced);
        let mut state = state();
        state.insights = (0..20).map(|i| format!("insight {}", i)).collect();
        let prompt = PromptTemplate::iteration_prompt(&agent, &state, &[], 0, 8);
        assert!(prompt.contains("(8 earlier entries omitted)"));
        assert!(!prompt.contains("insight 7\n"));
        assert!(prompt.contains("insight 19"));
    }

    #[test]
    fn test_final_prompt_shows_scores() {
        let agent = AgentConfig::new("a", "ops", Archetype::Aggressive);
        let mut state = state();
        state.set_options(vec![TradeOption {
            action: TradeAction::Long,
            size_pct: 10.0,
            ..TradeOption::hold("momentum")
        }]);
        state.record_evaluation(OptionEvaluation {
            option_index: 0,
            score: 0.72,
            confidence: 0.6,
            rationale: "trend intact".to_string(),
        });
        let prompt = PromptTemplate::final_decision_prompt(&agent, &state);
        assert!(prompt.contains("score 0.72"));
        assert!(prompt.contains("option_index"));
    }
}
