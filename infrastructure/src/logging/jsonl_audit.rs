//! JSONL audit journal.
//!
//! Each [`AuditEvent`] is serialized as a single JSON line with a `type`
//! field and `timestamp`, appended to the file via a buffered writer. The
//! file is opened in append mode so restarts extend the same journal.

use fleet_application::ports::audit_log::{AuditEvent, AuditLog};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes after every event.
pub struct JsonlAuditLog {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlAuditLog {
    /// Open (or create) the journal at `path`, creating parent directories.
    ///
    /// Returns `None` if the file cannot be opened; callers fall back to
    /// [`NoAuditLog`](fleet_application::NoAuditLog).
    pub fn open(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create audit directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open audit journal {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditLog for JsonlAuditLog {
    fn log(&self, event: AuditEvent) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let record = if let serde_json::Value::Object(mut map) = event.payload {
            map.insert(
                "type".to_string(),
                serde_json::Value::String(event.event_type.to_string()),
            );
            map.insert(
                "timestamp".to_string(),
                serde_json::Value::String(timestamp),
            );
            serde_json::Value::Object(map)
        } else {
            serde_json::json!({
                "type": event.event_type,
                "timestamp": timestamp,
                "data": event.payload,
            })
        };

        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlAuditLog {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_object_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit").join("fleet.jsonl");
        let journal = JsonlAuditLog::open(&path).unwrap();

        journal.log(AuditEvent::new(
            "decision",
            serde_json::json!({ "agent_id": "alpha", "action": "long", "confidence": 0.8 }),
        ));
        journal.log(AuditEvent::new(
            "consensus_result",
            serde_json::json!({ "verdict": "approve" }),
        ));
        drop(journal);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "decision");
        assert_eq!(lines[0]["agent_id"], "alpha");
        assert!(lines[0].get("timestamp").is_some());
        assert_eq!(lines[1]["type"], "consensus_result");
    }

    #[test]
    fn test_reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.jsonl");

        JsonlAuditLog::open(&path)
            .unwrap()
            .log(AuditEvent::new("agent_started", serde_json::json!({})));
        JsonlAuditLog::open(&path)
            .unwrap()
            .log(AuditEvent::new("agent_stopped", serde_json::json!({})));

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["type"], "agent_stopped");
    }

    #[test]
    fn test_non_object_payload_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.jsonl");
        let journal = JsonlAuditLog::open(&path).unwrap();

        journal.log(AuditEvent::new("reflection", serde_json::json!("plain text")));
        drop(journal);

        let lines = read_lines(&path);
        assert_eq!(lines[0]["type"], "reflection");
        assert_eq!(lines[0]["data"], "plain text");
    }
}
