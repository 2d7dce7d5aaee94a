//! File-backed repositories for agent configs, runtime state and the
//! decision journal, so a restarted process can restore its agents.
//!
//! ```text
//! <data_dir>/agents/<stem>.json                 AgentConfig, replaced on save
//! <data_dir>/states/<stem>.json                 AgentRuntimeState, replaced on upsert
//! <data_dir>/journal/<stem>.decisions.jsonl     appended
//! <data_dir>/journal/<stem>.reflections.jsonl   appended
//! <data_dir>/journal/<stem>.plans.jsonl         appended
//! ```

use super::files::{JsonDir, agent_file_stem, io_error, read_optional, serialization_error};
use async_trait::async_trait;
use fleet_application::ports::persistence::{
    AgentRepository, JournalRepository, PersistenceError, StateRepository,
};
use fleet_domain::{
    AgentConfig, AgentId, AgentRuntimeState, DecisionRecord, ReflectionRecord, TradingPlan,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct JsonFileAgentRepository {
    files: JsonDir,
}

impl JsonFileAgentRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            files: JsonDir::new(dir.into()),
        }
    }
}

#[async_trait]
impl AgentRepository for JsonFileAgentRepository {
    async fn get(&self, agent_id: &AgentId) -> Result<Option<AgentConfig>, PersistenceError> {
        self.files.load(agent_id).await
    }

    async fn save(&self, config: &AgentConfig) -> Result<(), PersistenceError> {
        self.files.save(&config.id, config).await
    }

    async fn list(&self) -> Result<Vec<AgentConfig>, PersistenceError> {
        let mut all: Vec<AgentConfig> = self.files.list().await?;
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}

pub struct JsonFileStateRepository {
    files: JsonDir,
}

impl JsonFileStateRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            files: JsonDir::new(dir.into()),
        }
    }
}

#[async_trait]
impl StateRepository for JsonFileStateRepository {
    async fn load(&self, agent_id: &AgentId) -> Result<Option<AgentRuntimeState>, PersistenceError> {
        self.files.load(agent_id).await
    }

    async fn upsert(&self, state: &AgentRuntimeState) -> Result<(), PersistenceError> {
        self.files.save(&state.agent_id, state).await?;
        debug!(agent_id = %state.agent_id, trading = state.trading_enabled, "State saved");
        Ok(())
    }

    async fn list_trading(&self) -> Result<Vec<AgentRuntimeState>, PersistenceError> {
        let mut trading: Vec<AgentRuntimeState> = self
            .files
            .list::<AgentRuntimeState>()
            .await?
            .into_iter()
            .filter(|s| s.trading_enabled)
            .collect();
        trading.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(trading)
    }
}

/// Append-only JSONL journal, one file per agent and record kind
pub struct JsonlJournal {
    dir: PathBuf,
    /// Serializes appends within the process
    append: Mutex<()>,
}

impl JsonlJournal {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            append: Mutex::new(()),
        }
    }

    fn path_for(&self, agent_id: &AgentId, kind: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}.jsonl", agent_file_stem(agent_id), kind))
    }

    async fn append<T: Serialize>(
        &self,
        agent_id: &AgentId,
        kind: &str,
        record: &T,
    ) -> Result<(), PersistenceError> {
        let mut line = serde_json::to_vec(record).map_err(serialization_error)?;
        line.push(b'\n');

        let _guard = self.append.lock().await;
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_error)?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(agent_id, kind))
            .await
            .map_err(io_error)?;
        file.write_all(&line).await.map_err(io_error)?;
        file.flush().await.map_err(io_error)
    }

    /// Every parseable record, oldest first. A torn last line from a crash
    /// is skipped.
    async fn read_all<T: DeserializeOwned>(
        &self,
        agent_id: &AgentId,
        kind: &str,
    ) -> Result<Vec<T>, PersistenceError> {
        let path = self.path_for(agent_id, kind);
        let Some(bytes) = read_optional(&path).await? else {
            return Ok(Vec::new());
        };
        let text = String::from_utf8_lossy(&bytes);
        let mut records = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    path = %path.display(),
                    line = index + 1,
                    "Skipping unreadable journal line: {}",
                    e
                ),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl JournalRepository for JsonlJournal {
    async fn append_decision(&self, record: &DecisionRecord) -> Result<(), PersistenceError> {
        self.append(&record.decision.agent_id, "decisions", record).await
    }

    async fn recent_decisions(
        &self,
        agent_id: &AgentId,
        limit: usize,
    ) -> Result<Vec<DecisionRecord>, PersistenceError> {
        let mut all: Vec<DecisionRecord> = self.read_all(agent_id, "decisions").await?;
        let keep_from = all.len().saturating_sub(limit);
        Ok(all.split_off(keep_from))
    }

    async fn append_reflection(&self, record: &ReflectionRecord) -> Result<(), PersistenceError> {
        self.append(&record.agent_id, "reflections", record).await
    }

    async fn append_plan(&self, plan: &TradingPlan) -> Result<(), PersistenceError> {
        self.append(&plan.agent_id, "plans", plan).await
    }

    async fn latest_plan(&self, agent_id: &AgentId) -> Result<Option<TradingPlan>, PersistenceError> {
        let mut plans: Vec<TradingPlan> = self.read_all(agent_id, "plans").await?;
        Ok(plans.pop())
    }
}
