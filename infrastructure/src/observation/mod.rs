//! Observation sources
//!
//! - [`ReplayObservationSource`] - recorded snapshots from a JSON or JSONL file
//! - [`SyntheticObservationSource`] - deterministic generated prices for offline runs

mod replay;
mod synthetic;

pub use replay::{ReplayError, ReplayObservationSource};
pub use synthetic::SyntheticObservationSource;

use fleet_domain::MarketSnapshot;
use fleet_domain::tool::Indicator;

/// Fill indicator fields the feed left empty from its candles.
fn derive_indicators(snapshot: &mut MarketSnapshot) {
    if snapshot.candles.is_empty() {
        return;
    }
    if snapshot.rsi.is_none() {
        snapshot.rsi = Indicator::Rsi.compute(&snapshot.candles, None);
    }
    if snapshot.macd_histogram.is_none() {
        snapshot.macd_histogram = Indicator::Macd.compute(&snapshot.candles, None);
    }
}
