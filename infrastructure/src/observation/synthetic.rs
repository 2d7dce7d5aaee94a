//! Deterministic generated market data.
//!
//! Each symbol follows a fixed sum of sine waves around a base price
//! derived from the symbol name, advancing one hourly step per `observe`.
//! The same symbol always produces the same sequence.

use super::derive_indicators;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use fleet_application::ports::observation::{ObservationError, ObservationSource};
use fleet_domain::MarketSnapshot;
use fleet_domain::reasoning::Candle;

const HISTORY: u64 = 60;

#[derive(Default)]
pub struct SyntheticObservationSource {
    steps: DashMap<String, u64>,
}

impl SyntheticObservationSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn seed(symbol: &str) -> u64 {
        // FNV-1a
        symbol.bytes().fold(0xcbf29ce484222325u64, |hash, b| {
            (hash ^ b as u64).wrapping_mul(0x100000001b3)
        })
    }

    fn price_at(seed: u64, step: u64) -> f64 {
        let base = 10.0 + (seed % 50_000) as f64;
        let phase = (seed % 628) as f64 / 100.0;
        let t = step as f64;
        base * (1.0 + 0.03 * (t * 0.21 + phase).sin() + 0.015 * (t * 0.057 + 2.0 * phase).sin())
    }

    fn candles(seed: u64, step: u64) -> Vec<Candle> {
        let now = Utc::now();
        let first = step.saturating_sub(HISTORY - 1);
        (first..=step)
            .map(|s| {
                let open = Self::price_at(seed, s.saturating_sub(1));
                let close = Self::price_at(seed, s);
                let wiggle = (open - close).abs() * 0.25;
                Candle {
                    open_time: now - Duration::hours((step - s) as i64),
                    open,
                    high: open.max(close) + wiggle,
                    low: open.min(close) - wiggle,
                    close,
                    volume: 1_000.0 * (1.0 + 0.5 * (s as f64 * 0.37).sin().abs()),
                }
            })
            .collect()
    }
}

#[async_trait]
impl ObservationSource for SyntheticObservationSource {
    async fn observe(&self, target: &str) -> Result<MarketSnapshot, ObservationError> {
        let symbol = target.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ObservationError::UnknownTarget(target.to_string()));
        }
        let step = {
            let mut step = self.steps.entry(symbol.clone()).or_insert(HISTORY);
            *step += 1;
            *step
        };
        let seed = Self::seed(&symbol);
        let price = Self::price_at(seed, step);
        let day_ago = Self::price_at(seed, step.saturating_sub(24));

        let mut snapshot = MarketSnapshot::new(symbol, price);
        snapshot.change_24h_pct = (price - day_ago) / day_ago * 100.0;
        snapshot.candles = Self::candles(seed, step);
        derive_indicators(&mut snapshot);
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_symbol_same_sequence() {
        let a = SyntheticObservationSource::new();
        let b = SyntheticObservationSource::new();
        for _ in 0..3 {
            let x = a.observe("BTCUSDT").await.unwrap();
            let y = b.observe("btcusdt").await.unwrap();
            assert_eq!(x.price, y.price);
        }
    }

    #[tokio::test]
    async fn test_snapshot_carries_candles_and_indicators() {
        let source = SyntheticObservationSource::new();
        let snapshot = source.observe("ETHUSDT").await.unwrap();
        assert_eq!(snapshot.candles.len() as u64, HISTORY);
        assert_eq!(snapshot.candles.last().map(|c| c.close), Some(snapshot.price));
        assert!(snapshot.rsi.is_some());
        assert!(snapshot.macd_histogram.is_some());
        assert!(snapshot.price > 0.0);
    }

    #[tokio::test]
    async fn test_blank_target_is_unknown() {
        let source = SyntheticObservationSource::new();
        assert!(source.observe("  ").await.is_err());
    }
}
