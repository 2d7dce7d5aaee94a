//! Console output formatter for fleet results

use colored::Colorize;
use fleet_application::{AgentStatus, CycleOutcome, CycleReport, RestoreReport, ShutdownReport};
use fleet_domain::{AgentId, ConfigIssue, ConsensusResult, Verdict};

/// Formats fleet status and cycle results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// One row per agent, sorted by id
    pub fn format_status(status: &[(AgentId, AgentStatus)]) -> String {
        let mut output = String::new();
        output.push_str(&Self::header("Fleet Status"));
        output.push('\n');

        if status.is_empty() {
            output.push_str(&format!("{}\n", "No agents running.".dimmed()));
            return output;
        }

        output.push_str(&format!(
            "{:<14} {:<8} {:>12} {:>12} {:>10} {:>7} {:>7} {:<8} {}\n",
            "AGENT", "TARGET", "BALANCE", "EQUITY", "PNL", "W/L", "CYCLES", "TRADING", "LAST"
        ));
        output.push_str(&format!("{}\n", "-".repeat(96)));

        let mut rows: Vec<_> = status.iter().collect();
        rows.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        for (id, status) in rows {
            let state = &status.state;
            let pnl = format!("{:+.2}", state.cumulative_pnl);
            let pnl = if state.cumulative_pnl >= 0.0 {
                pnl.green()
            } else {
                pnl.red()
            };
            let trading = if state.trading_enabled {
                "yes".green()
            } else {
                "no".yellow()
            };
            let last = status
                .last_cycle
                .as_ref()
                .map(|report| report.outcome.label())
                .unwrap_or("-");
            output.push_str(&format!(
                "{:<14} {:<8} {:>12.2} {:>12.2} {:>10} {:>7} {:>7} {:<8} {}\n",
                id.as_str(),
                state.target,
                state.balance,
                state.equity,
                pnl,
                format!("{}/{}", state.wins, state.losses),
                state.cycles,
                trading,
                last
            ));
        }
        output
    }

    /// Runtime states as pretty JSON
    pub fn format_status_json(status: &[(AgentId, AgentStatus)]) -> String {
        let states: Vec<_> = status.iter().map(|(_, s)| &s.state).collect();
        serde_json::to_string_pretty(&states).unwrap_or_else(|_| "[]".to_string())
    }

    /// One line per cycle; blocked cycles list the votes underneath
    pub fn format_cycle(agent_id: &AgentId, report: &CycleReport) -> String {
        let prefix = format!("[{} #{}]", agent_id, report.cycle).cyan().bold();
        let decision = report
            .decision
            .as_ref()
            .map(|d| d.headline())
            .unwrap_or_default();
        let mut line = match &report.outcome {
            CycleOutcome::Executed(execution) => {
                let mut line = format!(
                    "{} {} {} at {:.4}",
                    prefix,
                    "executed".green().bold(),
                    decision,
                    execution.price
                );
                if let Some(pnl) = execution.realized_pnl {
                    line.push_str(&format!(", realized {:+.2}", pnl));
                }
                line
            }
            CycleOutcome::Blocked(result) => format!(
                "{} {} {}\n{}",
                prefix,
                "blocked".yellow().bold(),
                decision,
                Self::format_consensus(result)
            ),
            CycleOutcome::NoOp => format!("{} {}", prefix, "hold".dimmed()),
            CycleOutcome::ObservationFailed(e)
            | CycleOutcome::ReasoningFailed(e)
            | CycleOutcome::ExecutionFailed(e) => format!(
                "{} {}: {}",
                prefix,
                report.outcome.label().red().bold(),
                e
            ),
            CycleOutcome::Interrupted | CycleOutcome::Abandoned => {
                format!("{} {}", prefix, report.outcome.label().dimmed())
            }
        };
        if report.reflected {
            line.push_str(&format!(" {}", "(reflected)".dimmed()));
        }
        line
    }

    pub fn format_consensus(result: &ConsensusResult) -> String {
        let verdict = match result.verdict {
            Verdict::Approve => result.verdict.to_string().green().bold(),
            Verdict::Reject => result.verdict.to_string().red().bold(),
            Verdict::Abstain => result.verdict.to_string().yellow().bold(),
        };
        let mut output = format!(
            "  {} {} under {} (approve {:.0}%, reject {:.0}%)\n",
            "Consensus:".cyan().bold(),
            verdict,
            result.policy,
            result.approval_rate * 100.0,
            result.rejection_rate * 100.0
        );
        for vote in &result.votes {
            output.push_str(&format!(
                "    {} {:<20} x{:.1} conf {:.2}  {}\n",
                vote.verdict.symbol(),
                vote.source,
                vote.weight,
                vote.confidence,
                vote.reasoning.dimmed()
            ));
        }
        output
    }

    pub fn format_config_issues(issues: &[ConfigIssue]) -> String {
        let mut output = String::new();
        for issue in issues {
            let label = if issue.is_error() {
                "error:".red().bold()
            } else {
                "warning:".yellow().bold()
            };
            output.push_str(&format!("{} {}\n", label, issue.message));
        }
        output
    }

    pub fn format_restore(report: &RestoreReport) -> String {
        let mut output = format!(
            "{} {} restored, {} skipped, {} failed\n",
            "Restore:".cyan().bold(),
            report.started.len(),
            report.skipped.len(),
            report.failed.len()
        );
        for (id, error) in &report.failed {
            output.push_str(&format!("  {} {}: {}\n", "x".red(), id, error));
        }
        output
    }

    pub fn format_shutdown(report: &ShutdownReport) -> String {
        let mut output = format!(
            "{} {} stopped",
            "Shutdown:".cyan().bold(),
            report.stopped.len()
        );
        if !report.timed_out.is_empty() {
            let ids: Vec<&str> = report.timed_out.iter().map(|id| id.as_str()).collect();
            output.push_str(&format!(
                ", {} aborted after the grace period ({})",
                report.timed_out.len().to_string().red(),
                ids.join(", ")
            ));
        }
        output.push('\n');
        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fleet_domain::{AgentRuntimeState, ConsensusPolicy, Vote};

    fn plain() {
        colored::control::set_override(false);
    }

    fn status(id: &str, pnl: f64, trading: bool) -> (AgentId, AgentStatus) {
        let agent_id = AgentId::new(id);
        let mut state = AgentRuntimeState::new(agent_id.clone(), "BTC", 1000.0);
        state.cumulative_pnl = pnl;
        state.trading_enabled = trading;
        (
            agent_id,
            AgentStatus {
                state,
                started_at: Utc::now(),
                last_cycle: Some(CycleReport {
                    cycle: 3,
                    outcome: CycleOutcome::NoOp,
                    decision: None,
                    reflected: false,
                    consolidation: None,
                }),
            },
        )
    }

    #[test]
    fn test_status_table_is_sorted_by_agent() {
        plain();
        let output =
            ConsoleFormatter::format_status(&[status("zeta", -5.0, true), status("alpha", 12.5, false)]);
        let alpha = output.find("alpha").unwrap();
        let zeta = output.find("zeta").unwrap();
        assert!(alpha < zeta);
        assert!(output.contains("+12.50"));
        assert!(output.contains("-5.00"));
        assert!(output.contains("no-op"));
    }

    #[test]
    fn test_empty_status() {
        plain();
        assert!(ConsoleFormatter::format_status(&[]).contains("No agents running."));
    }

    #[test]
    fn test_status_json_lists_states() {
        let json = ConsoleFormatter::format_status_json(&[status("alpha", 1.0, true)]);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["agent_id"], "alpha");
    }

    #[test]
    fn test_consensus_lists_every_vote() {
        plain();
        let result = ConsensusResult::tally(
            vec![
                Vote::approve("risk_manager", 0.9, "within limits"),
                Vote::reject("devils_advocate", 0.6, "weak signal"),
            ],
            ConsensusPolicy::Unanimous,
        );
        let output = ConsoleFormatter::format_consensus(&result);
        assert!(output.contains("risk_manager"));
        assert!(output.contains("weak signal"));
        assert!(output.contains("reject"));
    }

    #[test]
    fn test_shutdown_names_aborted_agents() {
        plain();
        let report = ShutdownReport {
            stopped: vec![AgentId::new("a")],
            timed_out: vec![AgentId::new("slow")],
        };
        let output = ConsoleFormatter::format_shutdown(&report);
        assert!(output.contains("1 stopped"));
        assert!(output.contains("slow"));
    }
}
