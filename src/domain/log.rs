use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Severity tag of a user-visible event log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "success" => Ok(Severity::Success),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

/// One entry of the append-only event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
}

impl LogEntry {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            severity,
            message: message.into(),
        }
    }
}

/// Entries kept in memory unless configured otherwise.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 10_000;

#[derive(Debug, Default)]
struct Entries {
    kept: VecDeque<LogEntry>,
    /// Entries evicted from the front since the last clear. Positions handed
    /// to readers are absolute, so they stay valid across eviction.
    evicted: usize,
}

impl Entries {
    fn next_index(&self) -> usize {
        self.evicted + self.kept.len()
    }
}

/// Append-only, insertion-ordered log of user-visible events.
///
/// Every entry is mirrored to `tracing` at a matching level. Readers take
/// snapshots; the log is never edited in place, only appended to or cleared.
/// At most `capacity` entries are kept; the oldest are evicted first.
#[derive(Debug)]
pub struct EventLog {
    entries: Mutex<Entries>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_LOG_CAPACITY)
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            capacity: capacity.max(1),
        }
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn append(&self, severity: Severity, message: impl Into<String>) -> LogEntry {
        let entry = LogEntry::new(severity, message);
        match severity {
            Severity::Info | Severity::Success => info!(target: "event_log", "{}", entry.message),
            Severity::Warning => warn!(target: "event_log", "{}", entry.message),
            Severity::Error => error!(target: "event_log", "{}", entry.message),
        }
        let mut entries = self.entries();
        if entries.kept.len() == self.capacity {
            entries.kept.pop_front();
            entries.evicted += 1;
        }
        entries.kept.push_back(entry.clone());
        entry
    }

    pub fn info(&self, message: impl Into<String>) -> LogEntry {
        self.append(Severity::Info, message)
    }

    pub fn success(&self, message: impl Into<String>) -> LogEntry {
        self.append(Severity::Success, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> LogEntry {
        self.append(Severity::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> LogEntry {
        self.append(Severity::Error, message)
    }

    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries().kept.iter().cloned().collect()
    }

    /// Entries at absolute position `index` or later, plus the position to
    /// resume from. Positions already evicted are skipped.
    pub fn since(&self, index: usize) -> (Vec<LogEntry>, usize) {
        let entries = self.entries();
        let skip = index.saturating_sub(entries.evicted);
        let page = entries.kept.iter().skip(skip).cloned().collect();
        (page, entries.next_index())
    }

    pub fn len(&self) -> usize {
        self.entries().kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().kept.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        *self.entries() = Entries::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_round_trip() {
        for s in [
            Severity::Info,
            Severity::Success,
            Severity::Warning,
            Severity::Error,
        ] {
            assert_eq!(Severity::from_str(s.as_str()).unwrap(), s);
        }
        assert!(Severity::from_str("fatal").is_err());
    }

    #[test]
    fn test_entries_get_unique_ids() {
        let a = LogEntry::new(Severity::Info, "a");
        let b = LogEntry::new(Severity::Info, "b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_event_log_keeps_insertion_order() {
        let log = EventLog::new();
        log.info("first");
        log.warning("second");
        log.success("third");

        let messages: Vec<_> = log.snapshot().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        let (page, next) = log.since(1);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].severity, Severity::Warning);
        assert_eq!(next, 3);
        let (page, next) = log.since(10);
        assert!(page.is_empty());
        assert_eq!(next, 3);
    }

    #[test]
    fn test_event_log_clear() {
        let log = EventLog::new();
        log.error("boom");
        assert_eq!(log.len(), 1);
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_event_log_evicts_oldest_beyond_capacity() {
        let log = EventLog::with_capacity(3);
        for i in 0..5 {
            log.info(format!("poll {}", i));
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.capacity(), 3);

        let messages: Vec<_> = log.snapshot().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["poll 2", "poll 3", "poll 4"]);

        // Positions are absolute: a reader at 4 still gets only the newest entry.
        let (page, next) = log.since(4);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].message, "poll 4");
        assert_eq!(next, 5);

        // A reader behind the eviction point resumes at the oldest kept entry.
        let (page, next) = log.since(0);
        assert_eq!(page.len(), 3);
        assert_eq!(next, 5);
    }

    #[test]
    fn test_clear_resets_positions() {
        let log = EventLog::with_capacity(2);
        log.info("a");
        log.info("b");
        log.info("c");
        log.clear();
        log.info("d");
        let (page, next) = log.since(0);
        assert_eq!(page[0].message, "d");
        assert_eq!(next, 1);
    }
}
