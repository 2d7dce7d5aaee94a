//! JSON file checkpoint store
//!
//! One file per agent under a directory: `<dir>/<stem>.checkpoint.json`,
//! where the stem is an escaped form of the agent id. Saves write a
//! temporary file and rename it over the previous one, so a crash mid-write
//! leaves the old checkpoint intact.

use super::files::{
    agent_file_stem, read_optional, remove_if_present, serialization_error, write_atomic,
};
use async_trait::async_trait;
use fleet_application::ports::persistence::{CheckpointStore, PersistenceError, StoredCheckpoint};
use fleet_domain::{AgentId, SessionId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct CheckpointFile {
    session_id: SessionId,
    /// The serialized checkpoint, stored verbatim
    checkpoint: String,
}

pub struct JsonFileCheckpointStore {
    dir: PathBuf,
}

impl JsonFileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, agent_id: &AgentId) -> PathBuf {
        self.dir
            .join(format!("{}.checkpoint.json", agent_file_stem(agent_id)))
    }
}

#[async_trait]
impl CheckpointStore for JsonFileCheckpointStore {
    async fn save(
        &self,
        agent_id: &AgentId,
        session_id: SessionId,
        json: String,
    ) -> Result<(), PersistenceError> {
        let body = serde_json::to_vec(&CheckpointFile {
            session_id,
            checkpoint: json,
        })
        .map_err(serialization_error)?;
        write_atomic(&self.path_for(agent_id), &body).await?;
        debug!(agent_id = %agent_id, session_id = %session_id, "Checkpoint saved");
        Ok(())
    }

    async fn load(&self, agent_id: &AgentId) -> Result<Option<StoredCheckpoint>, PersistenceError> {
        let Some(bytes) = read_optional(&self.path_for(agent_id)).await? else {
            return Ok(None);
        };
        let file: CheckpointFile = serde_json::from_slice(&bytes).map_err(serialization_error)?;
        Ok(Some(StoredCheckpoint {
            session_id: file.session_id,
            json: file.checkpoint,
        }))
    }

    async fn delete(&self, agent_id: &AgentId) -> Result<(), PersistenceError> {
        remove_if_present(&self.path_for(agent_id)).await
    }
}
