//! Reasoning parameters - loop control.
//!
//! [`ReasoningParams`] bounds the
//! [`ReasoningLoop`](crate::use_cases::reasoning_loop::ReasoningLoop): how many
//! iterations it may run, how long it may think, and how many memories it
//! recalls up front.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningParams {
    /// Hard iteration ceiling per session
    pub max_iterations: u32,
    /// Wall-clock ceiling, checked between iterations
    pub max_duration: Duration,
    /// Memories recalled when a fresh session starts
    pub recall_k: usize,
}

impl Default for ReasoningParams {
    fn default() -> Self {
        Self {
            max_iterations: 12,
            max_duration: Duration::from_secs(120),
            recall_k: 5,
        }
    }
}

impl ReasoningParams {
    // ==================== Builder Methods ====================

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = duration;
        self
    }

    pub fn with_recall_k(mut self, k: usize) -> Self {
        self.recall_k = k;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = ReasoningParams::default();
        assert_eq!(params.max_iterations, 12);
        assert_eq!(params.max_duration, Duration::from_secs(120));
        assert_eq!(params.recall_k, 5);
    }

    #[test]
    fn test_builder() {
        let params = ReasoningParams::default()
            .with_max_iterations(3)
            .with_recall_k(0);
        assert_eq!(params.max_iterations, 3);
        assert_eq!(params.recall_k, 0);
    }
}
