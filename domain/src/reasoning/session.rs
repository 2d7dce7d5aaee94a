//! Reasoning session and its thought steps.
//!
//! A session starts in [`SessionStatus::Thinking`] and ends in exactly one
//! of [`SessionStatus::Decided`] (decision attached, checkpoint cleared) or
//! [`SessionStatus::Interrupted`] (snapshot taken, no decision).

use super::action::MetaAction;
use super::checkpoint::Checkpoint;
use super::decision::Decision;
use super::signals::MarketSnapshot;
use super::state::ReasoningState;
use crate::core::ids::{AgentId, SessionId};
use crate::core::string::truncate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One iteration of the loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtStep {
    pub iteration: u32,
    pub action: MetaAction,
    pub reasoning: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_args: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// What executing the action produced, when not covered above
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ThoughtStep {
    pub fn new(iteration: u32, action: MetaAction, reasoning: impl Into<String>, confidence: f64) -> Self {
        Self {
            iteration,
            action,
            reasoning: reasoning.into(),
            confidence,
            tool: None,
            tool_args: None,
            tool_result: None,
            question: None,
            answer: None,
            note: None,
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>, args: Value, result: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self.tool_args = Some(args);
        self.tool_result = Some(result.into());
        self
    }

    pub fn with_question(mut self, question: impl Into<String>, answer: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self.answer = Some(answer.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// One line for the history section of the prompt
    pub fn to_prompt_line(&self) -> String {
        let mut line = format!(
            "#{} {} (conf {:.2}): {}",
            self.iteration,
            self.action,
            self.confidence,
            truncate(&self.reasoning, 200)
        );
        if let Some(result) = &self.tool_result {
            line.push_str(&format!(" => {}", truncate(result, 300)));
        }
        if let (Some(q), Some(a)) = (&self.question, &self.answer) {
            line.push_str(&format!(" [Q: {} A: {}]", truncate(q, 120), truncate(a, 300)));
        }
        if let Some(note) = &self.note {
            line.push_str(&format!(" ({})", truncate(note, 200)));
        }
        line
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Thinking,
    Decided,
    Interrupted,
}

/// An attempt to reach one decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningSession {
    pub id: SessionId,
    pub agent_id: AgentId,
    status: SessionStatus,
    pub state: ReasoningState,
    steps: Vec<ThoughtStep>,
    decision: Option<Decision>,
    pub started_at: DateTime<Utc>,
    /// Set when this session continues a checkpoint
    pub resumed: bool,
}

impl ReasoningSession {
    pub fn new(agent_id: AgentId, observation: MarketSnapshot, plan_summary: Option<String>) -> Self {
        Self {
            id: SessionId::generate(),
            agent_id,
            status: SessionStatus::Thinking,
            state: ReasoningState::new(observation, plan_summary),
            steps: Vec::new(),
            decision: None,
            started_at: Utc::now(),
            resumed: false,
        }
    }

    /// Continue an interrupted session with the latest observation.
    pub fn resume(checkpoint: Checkpoint, observation: MarketSnapshot) -> Self {
        let mut state = checkpoint.state;
        state.refresh_observation(observation);
        Self {
            id: checkpoint.session_id,
            agent_id: checkpoint.agent_id,
            status: SessionStatus::Thinking,
            state,
            steps: checkpoint.steps,
            decision: None,
            started_at: checkpoint.started_at,
            resumed: true,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn steps(&self) -> &[ThoughtStep] {
        &self.steps
    }

    pub fn decision(&self) -> Option<&Decision> {
        self.decision.as_ref()
    }

    pub fn is_thinking(&self) -> bool {
        self.status == SessionStatus::Thinking
    }

    /// Append a completed iteration and advance the iteration cursor.
    pub fn push_step(&mut self, step: ThoughtStep) {
        self.state.next_iteration = step.iteration.saturating_add(1);
        self.steps.push(step);
    }

    /// Terminal: attach the decision.
    pub fn complete(&mut self, decision: Decision) {
        self.decision = Some(decision);
        self.status = SessionStatus::Decided;
    }

    /// Terminal: snapshot everything gathered so far.
    pub fn interrupt(&mut self) -> Checkpoint {
        self.status = SessionStatus::Interrupted;
        self.decision = None;
        Checkpoint::new(
            self.id,
            self.agent_id.clone(),
            self.state.clone(),
            self.steps.clone(),
            self.started_at,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_step_advances_cursor() {
        let mut session = ReasoningSession::new(AgentId::new("a"), MarketSnapshot::new("X", 1.0), None);
        session.push_step(ThoughtStep::new(0, MetaAction::GenerateOptions, "start", 0.5));
        session.push_step(ThoughtStep::new(1, MetaAction::Reconsider, "again", 0.5));
        assert_eq!(session.state.next_iteration, 2);
        assert_eq!(session.steps().len(), 2);
    }

    #[test]
    fn test_terminal_states_are_exclusive() {
        let mut session = ReasoningSession::new(AgentId::new("a"), MarketSnapshot::new("X", 1.0), None);
        let decision = Decision::hold(session.agent_id.clone(), session.id, 0.0, "nothing");
        session.complete(decision);
        assert_eq!(session.status(), SessionStatus::Decided);
        assert!(session.decision().is_some());

        let _ = session.interrupt();
        assert_eq!(session.status(), SessionStatus::Interrupted);
        assert!(session.decision().is_none());
    }

    #[test]
    fn test_resume_refreshes_observation_and_keeps_history() {
        let mut session = ReasoningSession::new(AgentId::new("a"), MarketSnapshot::new("X", 1.0), None);
        session.push_step(ThoughtStep::new(0, MetaAction::GenerateOptions, "start", 0.5));
        let checkpoint = session.interrupt();

        let resumed = ReasoningSession::resume(checkpoint, MarketSnapshot::new("X", 2.0));
        assert_eq!(resumed.id, session.id);
        assert!(resumed.resumed);
        assert!(resumed.is_thinking());
        assert_eq!(resumed.state.next_iteration, 1);
        assert_eq!(resumed.state.observation.price, 2.0);
        assert_eq!(resumed.steps(), session.steps());
    }

    #[test]
    fn test_step_prompt_line() {
        let step = ThoughtStep::new(3, MetaAction::AskSelfQuestion { question: "q".into() }, "curious", 0.4)
            .with_question("Is volume rising?", "volume x1.80");
        let line = step.to_prompt_line();
        assert!(line.starts_with("#3 ask_self_question"));
        assert!(line.contains("volume x1.80"));
    }
}
