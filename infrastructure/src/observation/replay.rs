//! Replays recorded market snapshots.
//!
//! The file is either a JSON array of snapshots or one snapshot per line
//! (JSONL). Snapshots are grouped by symbol (case-insensitive) and served in
//! file order, one per `observe` call.

use super::derive_indicators;
use async_trait::async_trait;
use dashmap::DashMap;
use fleet_application::ports::observation::{ObservationError, ObservationSource};
use fleet_domain::MarketSnapshot;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Failed to read replay file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid snapshot on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Replay file contains no snapshots")]
    Empty,
}

pub struct ReplayObservationSource {
    feeds: HashMap<String, Vec<MarketSnapshot>>,
    cursors: DashMap<String, usize>,
    /// Start over at the end instead of reporting `Exhausted`
    looping: bool,
}

impl ReplayObservationSource {
    pub fn from_snapshots(snapshots: impl IntoIterator<Item = MarketSnapshot>) -> Self {
        let mut feeds: HashMap<String, Vec<MarketSnapshot>> = HashMap::new();
        for snapshot in snapshots {
            feeds
                .entry(snapshot.symbol.to_uppercase())
                .or_default()
                .push(snapshot);
        }
        Self {
            feeds,
            cursors: DashMap::new(),
            looping: false,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ReplayError> {
        let snapshots: Vec<MarketSnapshot> = if content.trim_start().starts_with('[') {
            serde_json::from_str(content).map_err(|e| ReplayError::Parse {
                line: e.line(),
                message: e.to_string(),
            })?
        } else {
            content
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(i, line)| {
                    serde_json::from_str(line).map_err(|e| ReplayError::Parse {
                        line: i + 1,
                        message: e.to_string(),
                    })
                })
                .collect::<Result<_, _>>()?
        };
        if snapshots.is_empty() {
            return Err(ReplayError::Empty);
        }
        Ok(Self::from_snapshots(snapshots))
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Symbols with recorded snapshots, sorted
    pub fn targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = self.feeds.keys().cloned().collect();
        targets.sort();
        targets
    }
}

#[async_trait]
impl ObservationSource for ReplayObservationSource {
    async fn observe(&self, target: &str) -> Result<MarketSnapshot, ObservationError> {
        let key = target.to_uppercase();
        let feed = self
            .feeds
            .get(&key)
            .ok_or_else(|| ObservationError::UnknownTarget(target.to_string()))?;

        let index = {
            let mut cursor = self.cursors.entry(key).or_insert(0);
            if *cursor >= feed.len() {
                if !self.looping {
                    return Err(ObservationError::Exhausted);
                }
                *cursor = 0;
            }
            let index = *cursor;
            *cursor += 1;
            index
        };
        debug!(symbol = %target, index, total = feed.len(), "Replaying snapshot");

        let mut snapshot = feed[index].clone();
        derive_indicators(&mut snapshot);
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const JSONL: &str = r#"{"symbol": "BTCUSDT", "price": 100.0, "observed_at": "2026-01-01T00:00:00Z"}

{"symbol": "btcusdt", "price": 101.0, "observed_at": "2026-01-01T01:00:00Z"}
{"symbol": "ETHUSDT", "price": 10.0, "observed_at": "2026-01-01T00:00:00Z"}
"#;

    #[tokio::test]
    async fn test_replays_in_order_then_exhausts() {
        let source = ReplayObservationSource::parse(JSONL).unwrap();
        assert_eq!(source.targets(), vec!["BTCUSDT", "ETHUSDT"]);

        assert_eq!(source.observe("BTCUSDT").await.unwrap().price, 100.0);
        assert_eq!(source.observe("BTCUSDT").await.unwrap().price, 101.0);
        assert_eq!(
            source.observe("BTCUSDT").await.unwrap_err(),
            ObservationError::Exhausted
        );
        assert_eq!(source.observe("ethusdt").await.unwrap().price, 10.0);
    }

    #[tokio::test]
    async fn test_looping_starts_over() {
        let source = ReplayObservationSource::parse(JSONL).unwrap().looping(true);
        for expected in [100.0, 101.0, 100.0] {
            assert_eq!(source.observe("BTCUSDT").await.unwrap().price, expected);
        }
    }

    #[tokio::test]
    async fn test_unknown_target() {
        let source = ReplayObservationSource::parse(JSONL).unwrap();
        assert!(matches!(
            source.observe("DOGEUSDT").await,
            Err(ObservationError::UnknownTarget(_))
        ));
    }

    #[test]
    fn test_parse_errors_name_the_line() {
        let content = "{\"symbol\": \"BTCUSDT\", \"price\": 1.0, \"observed_at\": \"2026-01-01T00:00:00Z\"}\nnot json\n";
        match ReplayObservationSource::parse(content) {
            Err(ReplayError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {:?}", other.err()),
        }
        assert!(matches!(
            ReplayObservationSource::parse("\n\n"),
            Err(ReplayError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_load_json_array_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("replay.json");
        std::fs::write(
            &path,
            r#"[{"symbol": "SOLUSDT", "price": 20.0, "observed_at": "2026-01-01T00:00:00Z"}]"#,
        )
        .unwrap();

        let source = ReplayObservationSource::load(&path).unwrap();
        assert_eq!(source.observe("SOLUSDT").await.unwrap().price, 20.0);
    }
}
