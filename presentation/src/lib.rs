//! Presentation layer for agent-fleet
//!
//! This crate contains CLI definitions and console formatting of fleet
//! status, cycle outcomes and consensus results.

pub mod cli;
pub mod output;

// Re-export commonly used types
pub use cli::commands::{AgentSpec, Cli, Command, OutputFormat, RunArgs};
pub use output::console::ConsoleFormatter;
