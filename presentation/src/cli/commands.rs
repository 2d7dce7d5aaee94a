//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use fleet_domain::{AgentId, Archetype};
use std::path::PathBuf;
use std::str::FromStr;

/// Output format for the final fleet status
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored status table
    Table,
    /// Runtime states as JSON
    Json,
}

/// CLI arguments for agent-fleet
#[derive(Parser, Debug)]
#[command(name = "agent-fleet")]
#[command(author, version, about = "A fleet of autonomous trading agents")]
#[command(long_about = r#"
agent-fleet runs autonomous trading agents on a periodic decision cycle.

Each cycle an agent observes its market, reasons through a bounded loop of
meta-actions, asks a panel of validators to approve risky decisions, and
executes approved ones against a paper account.

Configuration files are loaded from (in priority order):
1. FLEET_* environment variables (nested keys split on "__")
2. --config <path>     Explicit config file
3. ./fleet.toml        Project-level config
4. ~/.config/agent-fleet/config.toml   Global config

Example:
  agent-fleet run --agent alpha:BTC:10000 --agent beta:ETH:5000:contrarian
  agent-fleet run --agent alpha:BTC:10000 --replay snapshots.jsonl
  agent-fleet run --data-dir /var/lib/agent-fleet   # restore agents still trading
  agent-fleet show-config
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Restore trading agents, start the requested ones and run until Ctrl-C
    Run(RunArgs),
    /// Print the merged configuration, its sources and any issues
    ShowConfig,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Agent to start, as ID:TARGET:BUDGET[:ARCHETYPE] (repeatable)
    #[arg(short, long = "agent", value_name = "SPEC")]
    pub agents: Vec<AgentSpec>,

    /// Replay market snapshots from a JSON or JSONL file
    #[arg(long, value_name = "FILE")]
    pub replay: Option<PathBuf>,

    /// Restart the replay from the beginning when it runs out
    #[arg(long, requires = "replay")]
    pub loop_replay: bool,

    /// Directory for agent configs, runtime states, the journal, leases and
    /// checkpoints; a restart in the same directory restores trading agents
    #[arg(long, value_name = "DIR", default_value = ".fleet")]
    pub data_dir: PathBuf,

    /// Keep configs, states, the journal and leases in memory only
    #[arg(long)]
    pub ephemeral: bool,

    /// JSONL audit journal path [default: <DATA_DIR>/audit.jsonl]
    #[arg(long, value_name = "FILE")]
    pub audit_log: Option<PathBuf>,

    /// Output format of the final status
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// An agent requested on the command line
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSpec {
    pub id: AgentId,
    pub target: String,
    pub budget: f64,
    pub archetype: Archetype,
}

impl RunArgs {
    pub fn checkpoint_dir(&self) -> PathBuf {
        self.data_dir.join("checkpoints")
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.audit_log
            .clone()
            .unwrap_or_else(|| self.data_dir.join("audit.jsonl"))
    }
}

impl FromStr for AgentSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let (id, target, budget, archetype) = match parts.as_slice() {
            [id, target, budget] => (*id, *target, *budget, None),
            [id, target, budget, archetype] => (*id, *target, *budget, Some(*archetype)),
            _ => return Err(format!("expected ID:TARGET:BUDGET[:ARCHETYPE], got '{}'", s)),
        };
        if id.is_empty() {
            return Err("agent id cannot be empty".to_string());
        }
        if target.is_empty() {
            return Err("target cannot be empty".to_string());
        }
        let budget: f64 = budget
            .parse()
            .map_err(|_| format!("invalid budget '{}'", budget))?;
        if !(budget.is_finite() && budget > 0.0) {
            return Err(format!("budget must be positive, got {}", budget));
        }
        let archetype = match archetype {
            Some(name) => name.parse::<Archetype>().map_err(|e| e.to_string())?,
            None => Archetype::Balanced,
        };
        Ok(Self {
            id: AgentId::new(id),
            target: target.to_uppercase(),
            budget,
            archetype,
        })
    }
}
