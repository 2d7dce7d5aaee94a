//! Fleet configuration container.
//!
//! [`FleetConfig`] groups the per-concern parameter types. Use cases receive
//! only the slice they need; the lifecycle manager holds the whole container
//! to build the per-agent reasoning loop.

use super::{ConsensusParams, LifecycleParams, ReasoningParams};
use fleet_domain::agent::validation::{ConfigIssue, ConfigIssueCode, Severity};
use fleet_domain::MemoryPolicy;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetConfig {
    pub reasoning: ReasoningParams,
    pub lifecycle: LifecycleParams,
    pub consensus: ConsensusParams,
    pub memory: MemoryPolicy,
}

impl FleetConfig {
    /// Range checks that cannot be expressed in the types.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        let mut out_of_range = |field: &str, value: f64, message: String| {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::OutOfRange {
                    field: field.to_string(),
                    value,
                },
                message,
            ));
        };

        if self.reasoning.max_iterations == 0 {
            out_of_range(
                "reasoning.max_iterations",
                0.0,
                "reasoning.max_iterations must be at least 1".to_string(),
            );
        }
        if self.reasoning.max_duration.is_zero() {
            out_of_range(
                "reasoning.max_seconds",
                0.0,
                "reasoning.max_seconds must be positive".to_string(),
            );
        }
        if self.lifecycle.lease_ttl.is_zero() {
            out_of_range(
                "lifecycle.lease_ttl_secs",
                0.0,
                "lifecycle.lease_ttl_secs must be positive".to_string(),
            );
        }
        for (field, value) in [
            (
                "lifecycle.validation_confidence_threshold",
                self.lifecycle.validation_confidence_threshold,
            ),
            ("lifecycle.forget_threshold", self.lifecycle.forget_threshold),
            (
                "memory.collective_importance_threshold",
                self.memory.collective_importance_threshold,
            ),
            ("memory.similarity_threshold", self.memory.similarity_threshold),
            ("memory.decay_factor", self.memory.decay_factor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                out_of_range(field, value, format!("{} must be in [0, 1], got {}", field, value));
            }
        }
        if !(self.memory.personal_boost >= 1.0) {
            out_of_range(
                "memory.personal_boost",
                self.memory.personal_boost,
                "memory.personal_boost must be at least 1.0".to_string(),
            );
        }
        if !(self.memory.recency_half_life_days > 0.0) {
            out_of_range(
                "memory.recency_half_life_days",
                self.memory.recency_half_life_days,
                "memory.recency_half_life_days must be positive".to_string(),
            );
        }

        issues
    }

    /// Check whether any issues are errors (i.e. fatal).
    pub fn has_errors(issues: &[ConfigIssue]) -> bool {
        issues.iter().any(|i| i.severity == Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_is_valid() {
        assert!(FleetConfig::default().validate().is_empty());
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let mut config = FleetConfig::default();
        config.reasoning.max_iterations = 0;
        config.reasoning.max_duration = Duration::ZERO;
        config.memory.similarity_threshold = 1.5;

        let issues = config.validate();
        assert_eq!(issues.len(), 3);
        assert!(FleetConfig::has_errors(&issues));
        assert!(issues.iter().any(|i| matches!(
            &i.code,
            ConfigIssueCode::OutOfRange { field, .. } if field == "memory.similarity_threshold"
        )));
    }
}
