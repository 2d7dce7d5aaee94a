//! Consensus parameters.

use fleet_domain::ConsensusPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusParams {
    pub policy: ConsensusPolicy,
    /// A voter that has not answered by then abstains
    pub voter_timeout: Duration,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            policy: ConsensusPolicy::default(),
            voter_timeout: Duration::from_secs(30),
        }
    }
}

impl ConsensusParams {
    pub fn with_policy(mut self, policy: ConsensusPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_voter_timeout(mut self, timeout: Duration) -> Self {
        self.voter_timeout = timeout;
        self
    }
}
