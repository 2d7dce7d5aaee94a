//! Observation source port
//!
//! Collects the external state of a target before each cycle.

use async_trait::async_trait;
use fleet_domain::MarketSnapshot;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObservationError {
    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    #[error("Market data unavailable: {0}")]
    Unavailable(String),

    #[error("Observation source exhausted")]
    Exhausted,
}

#[async_trait]
pub trait ObservationSource: Send + Sync {
    async fn observe(&self, target: &str) -> Result<MarketSnapshot, ObservationError>;
}
