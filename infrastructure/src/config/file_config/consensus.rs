//! Consensus configuration from TOML (`[consensus]` section)
//!
//! Example configuration:
//!
//! ```toml
//! [consensus]
//! policy = "threshold:0.66"    # or "unanimous", "majority", "75%"
//! voter_timeout_secs = 30
//! sentiment_voters = 3
//!
//! [[consensus.validators]]
//! role = "risk_manager"
//! weight = 2.0
//!
//! [[consensus.validators]]
//! role = "technical_analyst"   # weight defaults to the role's default
//! ```

use fleet_application::ConsensusParams;
use fleet_domain::agent::validation::{ConfigIssue, ConfigIssueCode};
use fleet_domain::{ConsensusPolicy, ValidatorRole};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileValidatorConfig {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConsensusConfig {
    pub policy: String,
    pub voter_timeout_secs: u64,
    pub validators: Vec<FileValidatorConfig>,
    /// Redundant sentiment evaluators per news item (0 disables enrichment)
    pub sentiment_voters: usize,
}

impl Default for FileConsensusConfig {
    fn default() -> Self {
        Self {
            policy: ConsensusPolicy::default().to_string(),
            voter_timeout_secs: ConsensusParams::default().voter_timeout.as_secs(),
            validators: ValidatorRole::ALL
                .iter()
                .map(|role| FileValidatorConfig {
                    role: role.as_str().to_string(),
                    weight: None,
                })
                .collect(),
            sentiment_voters: 3,
        }
    }
}

impl FileConsensusConfig {
    /// An unparsable policy is fatal.
    pub fn parse_policy(&self) -> (ConsensusPolicy, Vec<ConfigIssue>) {
        match self.policy.parse::<ConsensusPolicy>() {
            Ok(policy) => (policy, vec![]),
            Err(e) => {
                let issue = ConfigIssue::error(
                    ConfigIssueCode::InvalidPolicy {
                        value: self.policy.clone(),
                    },
                    format!("consensus.policy: {}", e),
                );
                (ConsensusPolicy::default(), vec![issue])
            }
        }
    }

    /// Unknown roles are skipped with a warning; negative weights are fatal.
    pub fn parse_validators(&self) -> (Vec<(ValidatorRole, f64)>, Vec<ConfigIssue>) {
        let mut validators = Vec::new();
        let mut issues = Vec::new();
        for entry in &self.validators {
            let role = match entry.role.parse::<ValidatorRole>() {
                Ok(role) => role,
                Err(_) => {
                    issues.push(ConfigIssue::warning(
                        ConfigIssueCode::InvalidEnumValue {
                            field: "consensus.validators.role".to_string(),
                            value: entry.role.clone(),
                            valid_values: ValidatorRole::ALL
                                .iter()
                                .map(|r| r.as_str().to_string())
                                .collect(),
                        },
                        format!(
                            "consensus.validators: unknown role '{}', validator skipped",
                            entry.role
                        ),
                    ));
                    continue;
                }
            };
            let weight = entry.weight.unwrap_or_else(|| role.default_weight());
            if !(weight.is_finite() && weight >= 0.0) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::OutOfRange {
                        field: format!("consensus.validators.{}.weight", role),
                        value: weight,
                    },
                    format!("validator weight for {} must be >= 0, got {}", role, weight),
                ));
                continue;
            }
            validators.push((role, weight));
        }
        (validators, issues)
    }

    pub fn to_params(&self) -> (ConsensusParams, Vec<ConfigIssue>) {
        let (policy, issues) = self.parse_policy();
        let params = ConsensusParams::default()
            .with_policy(policy)
            .with_voter_timeout(Duration::from_secs(self.voter_timeout_secs));
        (params, issues)
    }
}
