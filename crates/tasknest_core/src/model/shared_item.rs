//! Staged share-sheet items consumed by the import pipeline.
//!
//! # Responsibility
//! - Define the queue entry written by the external staging area.
//! - Decode legacy payloads (missing destination/status/drafts) with safe
//!   defaults instead of rejecting them.
//!
//! # Invariants
//! - The store never creates queue entries; it only reads, removes and
//!   rewrites them.
//! - `marked_failed` is the single path that flips an item to `failed`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::task::Priority;

/// Where a staged item should land after import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportDestination {
    Note,
    Task,
    TaskBatch,
}

impl Default for ImportDestination {
    fn default() -> Self {
        Self::Task
    }
}

/// Processing state of a staged item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SharedItemStatus {
    Pending,
    Failed,
}

impl Default for SharedItemStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// One task extracted from a multi-task share payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedTaskDraft {
    pub title: String,
    #[serde(default)]
    pub notes: String,
}

impl SharedTaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            notes: String::new(),
        }
    }
}

/// Item staged by an external writer, waiting for import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedImportItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Attribution, e.g. "Safari".
    #[serde(default)]
    pub source_app: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<i64>,
    #[serde(default)]
    pub reminder_date: Option<i64>,
    #[serde(default)]
    pub destination: ImportDestination,
    #[serde(default)]
    pub task_drafts: Vec<SharedTaskDraft>,
    #[serde(default)]
    pub status: SharedItemStatus,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    /// Unix epoch milliseconds when the item was staged.
    #[serde(default)]
    pub import_timestamp: i64,
    /// True when the staging area truncated the shared text.
    #[serde(default)]
    pub was_truncated: bool,
}

impl SharedImportItem {
    /// Creates a minimal pending item, mainly for tests and tooling.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            text: None,
            url: None,
            source_app: None,
            categories: Vec::new(),
            priority: Priority::default(),
            due_date: None,
            reminder_date: None,
            destination: ImportDestination::default(),
            task_drafts: Vec::new(),
            status: SharedItemStatus::default(),
            last_error: None,
            retry_count: 0,
            import_timestamp: 0,
            was_truncated: false,
        }
    }

    /// Resolved destination: a multi-draft payload always imports as a batch.
    pub fn resolved_destination(&self) -> ImportDestination {
        if self.task_drafts.len() > 1 {
            ImportDestination::TaskBatch
        } else {
            self.destination
        }
    }

    /// Returns a copy rewritten as failed, retaining the failure reason.
    pub fn marked_failed(&self, reason: impl Into<String>) -> Self {
        Self {
            status: SharedItemStatus::Failed,
            last_error: Some(reason.into()),
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ImportDestination, SharedImportItem, SharedItemStatus, SharedTaskDraft};
    use crate::model::task::Priority;

    #[test]
    fn legacy_payload_decodes_with_safe_defaults() {
        let legacy_json = r#"{
            "id": "legacy-1",
            "title": "Legacy Task",
            "text": "Some shared body",
            "sourceApp": "ChatGPT",
            "categories": ["finance"],
            "priority": "medium"
        }"#;
        let item: SharedImportItem = serde_json::from_str(legacy_json).unwrap();

        assert_eq!(item.destination, ImportDestination::Task);
        assert_eq!(item.status, SharedItemStatus::Pending);
        assert_eq!(item.retry_count, 0);
        assert_eq!(item.priority, Priority::Medium);
        assert!(!item.was_truncated);
        assert!(item.task_drafts.is_empty());
    }

    #[test]
    fn marked_failed_updates_failure_metadata() {
        let item = SharedImportItem::new("Example");
        let failed = item.marked_failed("parse failed");

        assert_eq!(failed.status, SharedItemStatus::Failed);
        assert_eq!(failed.last_error.as_deref(), Some("parse failed"));
        assert_eq!(failed.retry_count, 1);
    }

    #[test]
    fn multi_draft_payload_resolves_to_task_batch() {
        let mut item = SharedImportItem::new("Imported task list");
        item.task_drafts = vec![
            SharedTaskDraft::new("Step 1"),
            SharedTaskDraft::new("Step 2"),
        ];
        assert_eq!(item.resolved_destination(), ImportDestination::TaskBatch);

        item.task_drafts.truncate(1);
        assert_eq!(item.resolved_destination(), ImportDestination::Task);
    }
}
