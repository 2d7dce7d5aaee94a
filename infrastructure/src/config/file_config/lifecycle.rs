//! Lifecycle configuration from TOML (`[lifecycle]` section)

use fleet_application::LifecycleParams;
use fleet_domain::TradeAction;
use fleet_domain::agent::validation::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw lifecycle configuration from TOML
///
/// # Example
///
/// ```toml
/// [lifecycle]
/// decision_interval_secs = 300      # for agents created from the command line
/// grace_period_secs = 10
/// lease_ttl_secs = 30
/// must_validate = ["long", "short"]
/// validation_confidence_threshold = 0.5
/// reflection_every = 12
/// consolidation_every = 48
/// planning = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLifecycleConfig {
    pub decision_interval_secs: u64,
    pub grace_period_secs: u64,
    pub lease_ttl_secs: u64,
    pub must_validate: Vec<String>,
    pub validation_confidence_threshold: f64,
    pub reflection_every: u64,
    pub consolidation_every: u64,
    pub reflection_window: usize,
    pub forget_threshold: f64,
    pub planning: bool,
}

impl Default for FileLifecycleConfig {
    fn default() -> Self {
        let params = LifecycleParams::default();
        Self {
            decision_interval_secs: 300,
            grace_period_secs: params.grace_period.as_secs(),
            lease_ttl_secs: params.lease_ttl.as_secs(),
            must_validate: params
                .must_validate
                .iter()
                .map(|a| a.to_string())
                .collect(),
            validation_confidence_threshold: params.validation_confidence_threshold,
            reflection_every: params.reflection_every,
            consolidation_every: params.consolidation_every,
            reflection_window: params.reflection_window,
            forget_threshold: params.forget_threshold,
            planning: params.planning,
        }
    }
}

impl FileLifecycleConfig {
    /// Parse `must_validate`; unknown actions are dropped with a warning.
    pub fn parse_must_validate(&self) -> (Vec<TradeAction>, Vec<ConfigIssue>) {
        let mut actions = Vec::new();
        let mut issues = Vec::new();
        for raw in &self.must_validate {
            match raw.parse::<TradeAction>() {
                Ok(action) if !actions.contains(&action) => actions.push(action),
                Ok(_) => {}
                Err(_) => issues.push(ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "lifecycle.must_validate".to_string(),
                        value: raw.clone(),
                        valid_values: ["hold", "long", "short", "close"]
                            .iter()
                            .map(|s| s.to_string())
                            .collect(),
                    },
                    format!("lifecycle.must_validate: unknown action '{}', ignored", raw),
                )),
            }
        }
        (actions, issues)
    }

    pub fn to_params(&self) -> (LifecycleParams, Vec<ConfigIssue>) {
        let (must_validate, issues) = self.parse_must_validate();
        let params = LifecycleParams {
            grace_period: Duration::from_secs(self.grace_period_secs),
            lease_ttl: Duration::from_secs(self.lease_ttl_secs),
            must_validate,
            validation_confidence_threshold: self.validation_confidence_threshold,
            reflection_every: self.reflection_every,
            consolidation_every: self.consolidation_every,
            reflection_window: self.reflection_window,
            forget_threshold: self.forget_threshold,
            planning: self.planning,
        };
        (params, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_params() {
        let (params, issues) = FileLifecycleConfig::default().to_params();
        assert!(issues.is_empty());
        assert_eq!(params, LifecycleParams::default());
    }

    #[test]
    fn test_unknown_action_is_dropped_with_warning() {
        let config = FileLifecycleConfig {
            must_validate: vec!["long".to_string(), "moon".to_string(), "buy".to_string()],
            ..Default::default()
        };
        let (actions, issues) = config.parse_must_validate();
        assert_eq!(actions, vec![TradeAction::Long]);
        assert_eq!(issues.len(), 1);
        assert!(!issues[0].is_error());
    }
}
