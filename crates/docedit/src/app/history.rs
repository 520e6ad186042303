//! Linear undo/redo history of whole-document snapshots.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

/// Maximum number of snapshots retained unless configured otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// A document state reachable through undo/redo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub content: String,
    pub label: String,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

impl HistoryEntry {
    fn new(content: String, label: String) -> Self {
        Self {
            content,
            label,
            at: OffsetDateTime::now_utc(),
        }
    }
}

/// Bounded snapshot history.
///
/// Recording a new state discards everything after the current position, so the
/// history stays linear. When the limit is exceeded the oldest snapshots are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredHistory")]
pub struct EditHistory {
    entries: VecDeque<HistoryEntry>,
    current: usize,
    limit: usize,
}

/// Persisted history whose position has not been checked yet.
#[derive(Deserialize)]
struct StoredHistory {
    entries: VecDeque<HistoryEntry>,
    current: usize,
    limit: usize,
}

/// Error returned when persisted history is inconsistent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("history has no snapshots")]
    Empty,
    #[error("history position {current} is past the last of {len} snapshots")]
    PositionOutOfRange { current: usize, len: usize },
}

impl TryFrom<StoredHistory> for EditHistory {
    type Error = HistoryError;

    fn try_from(stored: StoredHistory) -> Result<Self, Self::Error> {
        if stored.entries.is_empty() {
            return Err(HistoryError::Empty);
        }
        if stored.current >= stored.entries.len() {
            return Err(HistoryError::PositionOutOfRange {
                current: stored.current,
                len: stored.entries.len(),
            });
        }
        let mut history = Self {
            entries: stored.entries,
            current: stored.current,
            limit: stored.limit.max(1),
        };
        history.enforce_limit();
        Ok(history)
    }
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new(String::new(), DEFAULT_HISTORY_LIMIT)
    }
}

impl EditHistory {
    /// Start a history at `initial`, keeping at most `limit` snapshots (minimum one).
    pub fn new(initial: impl Into<String>, limit: usize) -> Self {
        let mut entries = VecDeque::new();
        entries.push_back(HistoryEntry::new(initial.into(), "open".into()));
        Self {
            entries,
            current: 0,
            limit: limit.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Index of the current snapshot within [`EditHistory::entries`].
    pub fn position(&self) -> usize {
        self.current
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.current]
    }

    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.entries.len()
    }

    /// Record a new document state. Returns `false` when `content` equals the current
    /// snapshot and nothing was recorded.
    pub fn record(&mut self, content: impl Into<String>, label: impl Into<String>) -> bool {
        let content = content.into();
        if self.current().content == content {
            return false;
        }

        self.entries.truncate(self.current + 1);
        self.entries.push_back(HistoryEntry::new(content, label.into()));
        self.current = self.entries.len() - 1;
        self.enforce_limit();
        true
    }

    /// Step back one snapshot.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if !self.can_undo() {
            return None;
        }
        self.current -= 1;
        Some(&self.entries[self.current])
    }

    /// Step forward one snapshot.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if !self.can_redo() {
            return None;
        }
        self.current += 1;
        Some(&self.entries[self.current])
    }

    /// Change the limit, evicting the oldest snapshots if the history is now too long.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        self.enforce_limit();
    }

    fn enforce_limit(&mut self) {
        while self.entries.len() > self.limit {
            if self.current == 0 {
                // Never evict the current snapshot; drop redo states from the back instead.
                self.entries.pop_back();
            } else {
                self.entries.pop_front();
                self.current -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_and_redo_walk_snapshots() {
        let mut history = EditHistory::new("v0", DEFAULT_HISTORY_LIMIT);
        assert!(history.record("v1", "edit"));
        assert!(history.record("v2", "edit"));

        assert_eq!(history.undo().map(|e| e.content.as_str()), Some("v1"));
        assert_eq!(history.undo().map(|e| e.content.as_str()), Some("v0"));
        assert!(history.undo().is_none());

        assert_eq!(history.redo().map(|e| e.content.as_str()), Some("v1"));
        assert_eq!(history.current().content, "v1");
    }

    #[test]
    fn recording_after_undo_discards_redo_branch() {
        let mut history = EditHistory::new("v0", DEFAULT_HISTORY_LIMIT);
        history.record("v1", "edit");
        history.record("v2", "edit");
        history.undo();

        history.record("v1b", "edit");
        assert!(!history.can_redo());
        assert_eq!(history.len(), 3);
        let contents: Vec<_> = history.entries().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, ["v0", "v1", "v1b"]);
    }

    #[test]
    fn identical_state_is_not_recorded() {
        let mut history = EditHistory::new("same", DEFAULT_HISTORY_LIMIT);
        assert!(!history.record("same", "noop"));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn history_is_capped_at_limit() {
        let mut history = EditHistory::default();
        for n in 1..=75 {
            history.record(format!("v{n}"), "edit");
        }
        assert_eq!(history.len(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(history.current().content, "v75");
        assert_eq!(history.entries().next().unwrap().content, "v26");

        let mut undone = 0;
        while history.undo().is_some() {
            undone += 1;
        }
        assert_eq!(undone, DEFAULT_HISTORY_LIMIT - 1);
        assert_eq!(history.current().content, "v26");
    }

    #[test]
    fn shrinking_limit_keeps_current_snapshot() {
        let mut history = EditHistory::new("v0", 10);
        for n in 1..=5 {
            history.record(format!("v{n}"), "edit");
        }
        for _ in 0..5 {
            history.undo();
        }
        history.set_limit(2);
        assert_eq!(history.len(), 2);
        assert_eq!(history.current().content, "v0");
        assert!(history.can_redo());
    }

    #[test]
    fn inconsistent_stored_history_is_rejected() {
        let mut history = EditHistory::new("v0", 5);
        history.record("v1", "edit");
        let mut value = serde_json::to_value(&history).unwrap();

        value["current"] = serde_json::json!(7);
        let err = serde_json::from_value::<EditHistory>(value.clone()).unwrap_err();
        assert!(err.to_string().contains("past the last of 2 snapshots"));

        value["current"] = serde_json::json!(0);
        value["entries"] = serde_json::json!([]);
        let err = serde_json::from_value::<EditHistory>(value).unwrap_err();
        assert!(err.to_string().contains("no snapshots"));
    }

    #[test]
    fn serde_round_trip_preserves_position() {
        let mut history = EditHistory::new("v0", 5);
        history.record("v1", "edit");
        history.undo();
        let json = serde_json::to_string(&history).unwrap();
        let restored: EditHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, history);
        assert!(restored.can_redo());
    }
}
