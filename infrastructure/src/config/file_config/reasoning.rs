//! Reasoning configuration from TOML (`[reasoning]` section)

use fleet_application::ReasoningParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// ```toml
/// [reasoning]
/// max_iterations = 12
/// max_seconds = 120
/// recall_k = 5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReasoningConfig {
    pub max_iterations: u32,
    pub max_seconds: u64,
    pub recall_k: usize,
}

impl Default for FileReasoningConfig {
    fn default() -> Self {
        let params = ReasoningParams::default();
        Self {
            max_iterations: params.max_iterations,
            max_seconds: params.max_duration.as_secs(),
            recall_k: params.recall_k,
        }
    }
}

impl FileReasoningConfig {
    pub fn to_params(&self) -> ReasoningParams {
        ReasoningParams::default()
            .with_max_iterations(self.max_iterations)
            .with_max_duration(Duration::from_secs(self.max_seconds))
            .with_recall_k(self.recall_k)
    }
}
