//! Append-only session journal.
//!
//! One JSONL file per session under the local data directory. Journaling is
//! best effort: a write failure is logged at debug and never surfaces into
//! the loop.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::errors::DeskPilotResult;

pub struct SessionJournal {
    session_id: String,
    path: PathBuf,
}

impl SessionJournal {
    /// Creates the journal file for a new session. Fails only when the data
    /// directory cannot be created; callers treat that as "no journal".
    pub fn new() -> DeskPilotResult<Self> {
        let dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("deskpilot")
            .join("sessions");
        fs::create_dir_all(&dir)?;

        let session_id = Uuid::new_v4().to_string();
        let path = dir.join(format!(
            "{}_{}.jsonl",
            Utc::now().format("%Y%m%d_%H%M%S"),
            &session_id[..8]
        ));
        File::create(&path)?;
        tracing::info!(path = %path.display(), "session journal created");
        Ok(Self { session_id, path })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn record(&self, kind: &str, data: impl Serialize) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "session": self.session_id,
            "kind": kind,
            "data": data,
        });
        if let Err(e) = self.append(&entry) {
            tracing::debug!(error = %e, "journal write failed");
        }
    }

    fn append(&self, entry: &serde_json::Value) -> std::io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{entry}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_append_as_one_json_object_per_line() {
        let journal = SessionJournal::new().unwrap();
        journal.record("task_start", json!({"task": "open notepad"}));
        journal.record("action", json!({"kind": "CLICK", "outcome": "executed"}));

        let content = fs::read_to_string(journal.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["kind"], "task_start");
        assert_eq!(first["session"], journal.session_id());

        fs::remove_file(journal.path()).unwrap();
    }
}
