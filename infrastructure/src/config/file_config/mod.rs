//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Strings that name enums are parsed on conversion, collecting
//! [`ConfigIssue`]s instead of failing deserialization.

mod consensus;
mod lifecycle;
mod memory;
mod provider;
mod reasoning;

pub use consensus::{FileConsensusConfig, FileValidatorConfig};
pub use lifecycle::FileLifecycleConfig;
pub use memory::FileMemoryConfig;
pub use provider::{FileProviderConfig, ProviderKind};
pub use reasoning::FileReasoningConfig;

use fleet_application::FleetConfig;
use fleet_domain::agent::validation::ConfigIssue;
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub lifecycle: FileLifecycleConfig,
    pub reasoning: FileReasoningConfig,
    pub consensus: FileConsensusConfig,
    pub memory: FileMemoryConfig,
    pub provider: FileProviderConfig,
}

impl FileConfig {
    /// Convert into application config, returning every detected issue.
    ///
    /// Warnings have already been replaced by defaults; callers abort when
    /// [`FleetConfig::has_errors`] holds.
    pub fn into_fleet_config(&self) -> (FleetConfig, Vec<ConfigIssue>) {
        let mut issues = Vec::new();

        let (lifecycle, lifecycle_issues) = self.lifecycle.to_params();
        issues.extend(lifecycle_issues);
        let (consensus, consensus_issues) = self.consensus.to_params();
        issues.extend(consensus_issues);
        issues.extend(self.consensus.parse_validators().1);
        issues.extend(self.provider.parse_kind().1);

        let config = FleetConfig {
            reasoning: self.reasoning.to_params(),
            lifecycle,
            consensus,
            memory: self.memory.to_policy(),
        };
        issues.extend(config.validate());
        (config, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_domain::{ConsensusPolicy, TradeAction};
    use std::time::Duration;

    #[test]
    fn test_default_config_converts_cleanly() {
        let (config, issues) = FileConfig::default().into_fleet_config();
        assert!(issues.is_empty(), "{:?}", issues);
        assert_eq!(config, FleetConfig::default());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let toml_str = r#"
[lifecycle]
grace_period_secs = 5
must_validate = ["long", "short", "close"]

[consensus]
policy = "75%"

[memory]
collective_importance_threshold = 0.7
"#;
        let file: FileConfig = toml::from_str(toml_str).unwrap();
        let (config, issues) = file.into_fleet_config();

        assert!(issues.is_empty());
        assert_eq!(config.lifecycle.grace_period, Duration::from_secs(5));
        assert!(config.lifecycle.must_validate.contains(&TradeAction::Close));
        assert_eq!(config.consensus.policy, ConsensusPolicy::Threshold(0.75));
        assert_eq!(config.memory.collective_importance_threshold, 0.7);
        // Defaults should apply
        assert_eq!(config.reasoning.max_iterations, 12);
        assert_eq!(file.provider.kind, "heuristic");
    }

    #[test]
    fn test_out_of_range_values_are_errors() {
        let toml_str = r#"
[reasoning]
max_iterations = 0

[memory]
similarity_threshold = 2.0
"#;
        let file: FileConfig = toml::from_str(toml_str).unwrap();
        let (_, issues) = file.into_fleet_config();
        assert_eq!(issues.len(), 2);
        assert!(FleetConfig::has_errors(&issues));
    }
}
