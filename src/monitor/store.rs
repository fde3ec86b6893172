//! Durable monitor list: a JSON array rewritten in full on every change and
//! read once at startup.
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::warn;

use crate::cards::{CardId, CardLocation};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to replace monitors file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedMonitorRecord {
    pub message_id: CardId,
    pub channel_id: String,
    #[serde(alias = "ip")]
    pub target: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub stopped: bool,
}

impl PersistedMonitorRecord {
    pub fn location(&self) -> CardLocation {
        CardLocation {
            channel_id: self.channel_id.clone(),
            message_id: self.message_id.clone(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.message_id.is_empty() && !self.channel_id.is_empty() && !self.target.is_empty()
    }
}

pub struct MonitorStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl MonitorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the file contents with `records`, atomically.
    pub fn save(&self, records: &[PersistedMonitorRecord]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let json = serde_json::to_string_pretty(records)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut temp_file = NamedTempFile::new_in(dir)?;
        temp_file.write_all(json.as_bytes())?;
        temp_file.persist(&self.path)?;
        Ok(())
    }

    /// Reads every usable record. A missing or empty file is an empty list;
    /// individual malformed or incomplete records are skipped.
    pub fn load(&self) -> Result<Vec<PersistedMonitorRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<serde_json::Value> = serde_json::from_str(&raw)?;
        let records = values
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| {
                match serde_json::from_value::<PersistedMonitorRecord>(value) {
                    Ok(record) if record.is_complete() => Some(record),
                    Ok(_) => {
                        warn!(index, "Skipping incomplete monitor record.");
                        None
                    }
                    Err(e) => {
                        warn!(index, error = %e, "Skipping malformed monitor record.");
                        None
                    }
                }
            })
            .collect();
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str, target: &str, stopped: bool) -> PersistedMonitorRecord {
        PersistedMonitorRecord {
            message_id: id.to_string(),
            channel_id: "100".to_string(),
            target: target.to_string(),
            owner_id: Some("owner".to_string()),
            stopped,
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = MonitorStore::new(dir.path().join("monitors.json"));
        let records = vec![
            record("1", "a.example.org", false),
            record("2", "b.example.org:25566", true),
        ];

        store.save(&records).unwrap();
        assert_eq!(store.load().unwrap(), records);

        // rewritten in full, not appended
        store.save(&records[..1]).unwrap();
        assert_eq!(store.load().unwrap(), records[..1].to_vec());
    }

    #[test]
    fn test_file_layout_is_camel_case() {
        let dir = TempDir::new().unwrap();
        let store = MonitorStore::new(dir.path().join("monitors.json"));
        store.save(&[record("1", "a.example.org", true)]).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"messageId\": \"1\""));
        assert!(raw.contains("\"channelId\": \"100\""));
        assert!(raw.contains("\"ownerId\": \"owner\""));
    }

    #[test]
    fn test_missing_or_empty_file_is_empty_list() {
        let dir = TempDir::new().unwrap();
        let store = MonitorStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_empty());

        fs::write(store.path(), "  \n").unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_bad_records_are_skipped_individually() {
        let dir = TempDir::new().unwrap();
        let store = MonitorStore::new(dir.path().join("monitors.json"));
        fs::write(
            store.path(),
            r#"[
                {"messageId": "1", "channelId": "100", "ip": "legacy.example.org", "ownerId": "9", "stopped": true},
                {"messageId": "2", "channelId": null, "target": "x.example.org"},
                {"messageId": "3", "channelId": "100", "target": ""},
                "garbage",
                {"messageId": "4", "channelId": "100", "target": "ok.example.org"}
            ]"#,
        )
        .unwrap();

        let records = store.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].target, "legacy.example.org");
        assert!(records[0].stopped);
        assert_eq!(records[1].message_id, "4");
        assert!(!records[1].stopped);
        assert_eq!(records[1].owner_id, None);
    }

    #[test]
    fn test_unparseable_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = MonitorStore::new(dir.path().join("monitors.json"));
        fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Serialization(_))));
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let store = MonitorStore::new(dir.path().join("data").join("monitors.json"));
        store.save(&[record("1", "a", false)]).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }
}
