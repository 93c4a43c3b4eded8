//! Append-only ledger of task field changes.
//!
//! Entries reference tasks by identifier only and copy the task's title and
//! owner at the time of the change, so they stay readable after the task is
//! deleted. Nothing in the ledger is ever edited or removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{FieldChange, Task, TaskField};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub task_id: u64,
    #[serde(default)]
    pub task_title: String,
    #[serde(default)]
    pub task_owner: String,
    pub timestamp: DateTime<Utc>,
    pub field: TaskField,
    #[serde(default)]
    pub old_value: String,
    #[serde(default)]
    pub new_value: String,
}

impl HistoryEntry {
    /// Entry for `change` on task `task_id`.
    ///
    /// `task` is the task as it stands when the change is recorded; a missing
    /// task leaves the denormalized title and owner empty.
    pub fn new(
        task_id: u64,
        task: Option<&Task>,
        change: &FieldChange,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            task_title: task.map(|t| t.title.clone()).unwrap_or_default(),
            task_owner: task.map(|t| t.owner.clone()).unwrap_or_default(),
            timestamp,
            field: change.field,
            old_value: change.old_value.clone(),
            new_value: change.new_value.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap entries loaded from disk, keeping their order
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Entries for one task identifier, oldest first
    pub fn for_task(&self, task_id: u64) -> Vec<HistoryEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.task_id == task_id)
            .cloned()
            .collect()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Largest task identifier any entry refers to
    pub fn max_task_id(&self) -> Option<u64> {
        self.entries.iter().map(|entry| entry.task_id).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(field: TaskField, old: &str, new: &str) -> FieldChange {
        FieldChange {
            field,
            old_value: old.to_string(),
            new_value: new.to_string(),
        }
    }

    fn task(id: u64) -> Task {
        Task {
            id,
            title: format!("task {id}"),
            owner: "bob".to_string(),
            status: "open".to_string(),
            start_time: "2024-01-01".to_string(),
            end_time: String::new(),
        }
    }

    #[test]
    fn entry_copies_title_and_owner() {
        let task = task(3);
        let entry = HistoryEntry::new(
            3,
            Some(&task),
            &change(TaskField::Status, "open", "closed"),
            Utc::now(),
        );
        assert_eq!(entry.task_title, "task 3");
        assert_eq!(entry.task_owner, "bob");
        assert_eq!(entry.field, TaskField::Status);
    }

    #[test]
    fn entry_without_task_is_blank() {
        let entry = HistoryEntry::new(
            9,
            None,
            &change(TaskField::Owner, "a", "b"),
            Utc::now(),
        );
        assert_eq!(entry.task_title, "");
        assert_eq!(entry.task_owner, "");
    }

    #[test]
    fn for_task_filters_in_order() {
        let mut ledger = HistoryLedger::new();
        let now = Utc::now();
        ledger.append(HistoryEntry::new(1, None, &change(TaskField::Status, "a", "b"), now));
        ledger.append(HistoryEntry::new(2, None, &change(TaskField::Status, "x", "y"), now));
        ledger.append(HistoryEntry::new(1, None, &change(TaskField::Status, "b", "c"), now));

        let entries = ledger.for_task(1);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].new_value, "b");
        assert_eq!(entries[1].new_value, "c");
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.max_task_id(), Some(2));
    }

    #[test]
    fn entry_json_shape() {
        let entry = HistoryEntry::new(
            1,
            Some(&task(1)),
            &change(TaskField::StartTime, "2024-01-01", "2024-01-02"),
            Utc::now(),
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["taskId"], 1);
        assert_eq!(json["taskTitle"], "task 1");
        assert_eq!(json["field"], "startTime");
        assert_eq!(json["oldValue"], "2024-01-01");
        assert_eq!(json["newValue"], "2024-01-02");
    }

    #[test]
    fn entry_accepts_offset_timestamps() {
        let raw = r#"{
            "taskId": 4,
            "taskTitle": "t",
            "taskOwner": "o",
            "timestamp": "2024-05-01T10:00:00.123456+08:00",
            "field": "owner",
            "oldValue": "a",
            "newValue": "b"
        }"#;
        let entry: HistoryEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.timestamp.to_rfc3339(), "2024-05-01T02:00:00.123456+00:00");
    }
}
