use std::collections::VecDeque;

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};

/// Number of entries the log panel keeps.
pub const LOG_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Info,
    Success,
    Error,
    Warning,
    Request,
}

impl LogKind {
    pub fn icon(&self) -> &'static str {
        match self {
            LogKind::Info => "ℹ",
            LogKind::Success => "✓",
            LogKind::Error => "✗",
            LogKind::Warning => "⚠",
            LogKind::Request => "→",
        }
    }
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogKind::Info => write!(f, "info"),
            LogKind::Success => write!(f, "success"),
            LogKind::Error => write!(f, "error"),
            LogKind::Warning => write!(f, "warning"),
            LogKind::Request => write!(f, "request"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub timestamp: String,
    pub message: String,
    pub kind: LogKind,
}

/// Append-only log of the most recent entries, oldest first.
#[derive(Debug, Clone)]
pub struct LogRecorder {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    last_id: i64,
}

impl LogRecorder {
    pub fn new() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            last_id: 0,
        }
    }

    /// Appends an entry and drops the oldest ones beyond capacity.
    pub fn add(&mut self, message: impl Into<String>, kind: LogKind) -> LogEntry {
        // Time-based, bumped when two entries land in the same millisecond.
        let id = Utc::now().timestamp_millis().max(self.last_id + 1);
        self.last_id = id;

        let entry = LogEntry {
            id,
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            message: message.into(),
            kind,
        };

        self.entries.push_back(entry.clone());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }

        entry
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for LogRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_returns_entry() {
        let mut logs = LogRecorder::new();
        let entry = logs.add("Client: GET /users/42", LogKind::Request);

        assert_eq!(entry.message, "Client: GET /users/42");
        assert_eq!(entry.kind, LogKind::Request);
        assert_eq!(entry.timestamp.len(), 8);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs.latest(), Some(&entry));
    }

    #[test]
    fn test_truncates_to_last_ten() {
        let mut logs = LogRecorder::new();
        for i in 0..15 {
            logs.add(format!("message {}", i), LogKind::Info);
        }

        assert_eq!(logs.len(), LOG_CAPACITY);
        let messages: Vec<_> = logs.entries().map(|e| e.message.clone()).collect();
        let expected: Vec<_> = (5..15).map(|i| format!("message {}", i)).collect();
        assert_eq!(messages, expected);
    }

    #[test]
    fn test_ids_are_strictly_increasing() {
        let mut logs = LogRecorder::new();
        for _ in 0..10 {
            logs.add("same millisecond", LogKind::Info);
        }

        let ids: Vec<_> = logs.entries().map(|e| e.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_clear() {
        let mut logs = LogRecorder::new();
        logs.add("one", LogKind::Success);
        logs.add("two", LogKind::Error);
        logs.clear();

        assert!(logs.is_empty());
        assert!(logs.latest().is_none());

        let next = logs.add("three", LogKind::Info);
        assert_eq!(logs.to_vec(), vec![next]);
    }

    #[test]
    fn test_custom_capacity() {
        let mut logs = LogRecorder::with_capacity(3);
        for i in 0..5 {
            logs.add(i.to_string(), LogKind::Warning);
        }
        assert_eq!(logs.len(), 3);
        assert_eq!(logs.entries().next().map(|e| e.message.as_str()), Some("2"));
    }

    #[test]
    fn test_log_kind_display() {
        assert_eq!(LogKind::Request.to_string(), "request");
        assert_eq!(LogKind::Warning.to_string(), "warning");
        let json = serde_json::to_string(&LogKind::Success).unwrap();
        assert_eq!(json, "\"success\"");
    }
}
