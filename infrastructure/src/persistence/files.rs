//! Helpers shared by the file-backed adapters

use fleet_application::ports::persistence::PersistenceError;
use fleet_domain::AgentId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

/// File stem for an agent id.
///
/// Lowercase ASCII letters, digits and `-` pass through; every other byte
/// becomes `_xx`. `_` only ever starts an escape, so distinct ids never share
/// a file, even on case-insensitive filesystems.
pub(crate) fn agent_file_stem(agent_id: &AgentId) -> String {
    let raw = agent_id.as_str();
    let mut stem = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{:02x}", byte));
        }
    }
    stem
}

pub(crate) fn io_error(e: std::io::Error) -> PersistenceError {
    PersistenceError::Io(e.to_string())
}

pub(crate) fn serialization_error(e: serde_json::Error) -> PersistenceError {
    PersistenceError::Serialization(e.to_string())
}

/// `<path>.tmp`, next to the file it replaces
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Write a temporary file and rename it over `path`; a crash mid-write
/// leaves the previous contents intact.
pub(crate) async fn write_atomic(path: &Path, body: &[u8]) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, body).await.map_err(io_error)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_error)
}

pub(crate) async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, PersistenceError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(e)),
    }
}

pub(crate) async fn remove_if_present(path: &Path) -> Result<(), PersistenceError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error(e)),
    }
}

/// One JSON document per agent: `<dir>/<stem>.json`
pub(crate) struct JsonDir {
    dir: PathBuf,
}

impl JsonDir {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub(crate) fn path_for(&self, agent_id: &AgentId) -> PathBuf {
        self.dir.join(format!("{}.json", agent_file_stem(agent_id)))
    }

    pub(crate) async fn load<T: DeserializeOwned>(
        &self,
        agent_id: &AgentId,
    ) -> Result<Option<T>, PersistenceError> {
        match read_optional(&self.path_for(agent_id)).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(serialization_error),
            None => Ok(None),
        }
    }

    pub(crate) async fn save<T: Serialize>(
        &self,
        agent_id: &AgentId,
        value: &T,
    ) -> Result<(), PersistenceError> {
        let body = serde_json::to_vec_pretty(value).map_err(serialization_error)?;
        write_atomic(&self.path_for(agent_id), &body).await
    }

    /// Every readable document; unreadable files are logged and skipped so
    /// one bad file cannot block the rest.
    pub(crate) async fn list<T: DeserializeOwned>(&self) -> Result<Vec<T>, PersistenceError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(e)),
        };
        let mut all = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let parsed = match tokio::fs::read(&path).await {
                Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match parsed {
                Ok(value) => all.push(value),
                Err(e) => warn!(path = %path.display(), "Skipping unreadable file: {}", e),
            }
        }
        Ok(all)
    }
}
