//! Run log: the progress record persisted as `logs.json`.
//!
//! A [`RunLog`] is owned by the top-level run and handed to each stage by
//! `&mut`. Entries are append-only; [`RunLog::add_data`] is the only way to
//! touch an existing entry and it can only add fields to the newest one.

use std::fmt;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::error::Result;

/// One progress message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Ordered, append-only run log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message without structured data.
    pub fn add_message(&mut self, message: impl Into<String>) {
        self.push(message.into(), None);
    }

    /// Append a message with structured data.
    pub fn add_message_with(&mut self, message: impl Into<String>, data: Value) {
        self.push(message.into(), Some(data));
    }

    /// Merge `fields` into the data of the newest entry.
    ///
    /// With no entries yet, the fields are recorded under a `"data"` message.
    pub fn add_data(&mut self, fields: Map<String, Value>) {
        let Some(last) = self.entries.last_mut() else {
            self.push("data".to_string(), Some(Value::Object(fields)));
            return;
        };
        match &mut last.data {
            Some(Value::Object(existing)) => existing.extend(fields),
            Some(other) => {
                let mut merged = Map::new();
                merged.insert("value".to_string(), other.take());
                merged.extend(fields);
                last.data = Some(Value::Object(merged));
            }
            None => last.data = Some(Value::Object(fields)),
        }
    }

    fn push(&mut self, message: String, data: Option<Value>) {
        tracing::debug!(event = "run_log.append", message = %message);
        self.entries.push(LogEntry {
            message,
            timestamp: Utc::now(),
            data,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the newest entry with `message`.
    pub fn find(&self, message: &str) -> Option<&LogEntry> {
        self.entries.iter().rev().find(|e| e.message == message)
    }

    /// Write the log to `path` as a pretty JSON array.
    ///
    /// The file is written to a temporary sibling and renamed into place.
    pub fn save_as_json(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let json = serde_json::to_vec_pretty(self)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Read a log previously written by [`RunLog::save_as_json`].
    pub fn load_json(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl fmt::Display for RunLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            write!(
                f,
                "[{}] {}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                entry.message
            )?;
            if let Some(data) = &entry.data {
                write!(f, " {data}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Build a JSON object from `(key, value)` pairs.
pub fn fields<I, K, V>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_messages_are_ordered() {
        let mut log = RunLog::new();
        log.add_message("first");
        log.add_message_with("second", json!({"k": 1}));
        log.add_message("third");

        let messages: Vec<_> = log.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert!(log.entries()[0].timestamp <= log.entries()[2].timestamp);
    }

    #[test]
    fn test_add_data_merges_into_newest_entry() {
        let mut log = RunLog::new();
        log.add_message_with("Compilation successful", json!({"a": 1}));
        log.add_data(fields([("Found pre file", true), ("Found post file", false)]));

        let data = log.entries()[0].data.as_ref().unwrap();
        assert_eq!(
            data,
            &json!({"a": 1, "Found pre file": true, "Found post file": false})
        );
    }

    #[test]
    fn test_add_data_on_entry_without_data() {
        let mut log = RunLog::new();
        log.add_message("Compilation successful");
        log.add_data(fields([("Found pre file", false)]));
        assert_eq!(
            log.entries()[0].data,
            Some(json!({"Found pre file": false}))
        );
    }

    #[test]
    fn test_add_data_on_empty_log_creates_entry() {
        let mut log = RunLog::new();
        log.add_data(fields([("k", "v")]));
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].message, "data");
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.json");

        let mut log = RunLog::new();
        log.add_message_with("Converting ONNX to DFP", json!({"ONNX Path": "net.onnx"}));
        log.add_message("Conversion complete");
        log.save_as_json(&path).unwrap();

        let raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let array = raw.as_array().expect("top-level array");
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["message"], "Converting ONNX to DFP");
        assert!(array[0]["timestamp"].is_string());
        assert!(array[1].get("data").is_none());

        assert_eq!(RunLog::load_json(&path).unwrap(), log);
    }

    #[test]
    fn test_display_renders_one_line_per_entry() {
        let mut log = RunLog::new();
        log.add_message("a");
        log.add_message_with("b", json!({"x": 1}));
        let text = log.to_string();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("b {\"x\":1}"));
    }
}
