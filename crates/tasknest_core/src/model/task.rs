//! Task domain model.
//!
//! # Responsibility
//! - Define the task record, its priority scale and id conventions.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - Hierarchy fields (`parent_task_id`, `parent_manual_reopen_at`) are only
//!   mutated through the store, which keeps the single-level guarantee.
//! - `order_index` is a monotonic display hint: larger values sort first,
//!   ties break by id for determinism.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::now_epoch_ms;

/// Stable identifier for tasks.
///
/// Kept as a string because ids are shared verbatim with other clients.
pub type TaskId = String;

/// Task urgency scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
    Deferred,
}

impl Priority {
    /// Human-readable label for display surfaces.
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Deferred => "Deferred",
        }
    }

    /// Sort rank, lower sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
            Self::Deferred => 3,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

/// Actionable task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    /// Category ids; membership is a set, duplicates are never stored.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub due_date: Option<i64>,
    #[serde(default)]
    pub completed_at: Option<i64>,
    #[serde(default)]
    pub task_notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    /// Monotonic display hint; larger shows first.
    #[serde(default)]
    pub order_index: Option<i64>,
    /// Parent task id; the referenced task must itself be top-level.
    #[serde(default)]
    pub parent_task_id: Option<TaskId>,
    /// Set when a parent is manually reopened after all children completed.
    /// Meaningful only on top-level tasks.
    #[serde(default)]
    pub parent_manual_reopen_at: Option<i64>,
    /// When the reminder notification should fire.
    #[serde(default)]
    pub reminder_date: Option<i64>,
    /// Collaborator-side handle used to cancel a scheduled reminder.
    #[serde(default)]
    pub reminder_ref: Option<String>,
}

impl Task {
    /// Creates a task with a generated id and current timestamps.
    pub fn new(title: impl Into<String>) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            categories: Vec::new(),
            priority: Priority::default(),
            due_date: None,
            completed_at: None,
            task_notes: None,
            created_at: now,
            updated_at: now,
            order_index: None,
            parent_task_id: None,
            parent_manual_reopen_at: None,
            reminder_date: None,
            reminder_ref: None,
        }
    }

    /// Returns whether the task is completed.
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Returns whether the task sits at the top level of the hierarchy.
    pub fn is_top_level(&self) -> bool {
        self.parent_task_id.is_none()
    }
}

/// Sort key for task lists: larger `order_index` first, id tie-break.
pub fn display_order_key(task: &Task) -> (i64, &str) {
    (-task.order_index.unwrap_or(0), task.id.as_str())
}
