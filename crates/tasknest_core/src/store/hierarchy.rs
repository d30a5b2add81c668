//! Parent/child structural rules and parent-completion reconciliation.
//!
//! # Responsibility
//! - Validate parent links (single-level hierarchy, no self-parenting).
//! - Derive a parent's completion state from its children, honoring the
//!   manual-reopen override.
//! - Sanitize task payloads arriving from outside the mutation API.
//!
//! # Invariants
//! - A parent link always points at an existing top-level task.
//! - A child never carries a manual-reopen override.
//! - Reconciliation is idempotent; reruns without an input change persist
//!   and forward nothing.

use std::collections::HashSet;

use log::debug;

use crate::model::task::{Task, TaskId};
use crate::time::now_epoch_ms;

use super::{Store, StoreResult};

impl Store {
    /// Whether `parent_id` may become the parent of `child_id`: a distinct,
    /// existing task that is itself top-level.
    pub(crate) fn is_valid_parent(&self, child_id: &str, parent_id: &str) -> bool {
        if parent_id == child_id {
            return false;
        }
        self.task(parent_id)
            .map(Task::is_top_level)
            .unwrap_or(false)
    }

    pub(crate) fn has_children(&self, id: &str) -> bool {
        self.tasks
            .iter()
            .any(|task| task.parent_task_id.as_deref() == Some(id))
    }

    /// Re-derives a parent's completion from its children.
    ///
    /// A parent is completed exactly when it has children, all of them are
    /// completed, and no manual-reopen override is set. Mutations that alter
    /// the child set pass `reset_manual_override = true`; completion-state
    /// changes of an existing child pass `false` so a manual reopen survives
    /// them.
    pub(crate) fn reconcile_parent_completion(
        &mut self,
        parent_id: &str,
        reset_manual_override: bool,
    ) -> StoreResult<()> {
        let Some(index) = self.task_index(parent_id) else {
            return Ok(());
        };
        if !self.tasks[index].is_top_level() {
            return Ok(());
        }

        let mut child_count = 0usize;
        let mut completed_children = 0usize;
        for task in &self.tasks {
            if task.parent_task_id.as_deref() == Some(parent_id) {
                child_count += 1;
                if task.is_completed() {
                    completed_children += 1;
                }
            }
        }
        let all_completed = child_count > 0 && completed_children == child_count;

        let mut parent = self.tasks[index].clone();
        let mut changed = false;

        if child_count == 0 {
            // Childless tasks keep their completion; the override is
            // meaningless without children.
            if parent.parent_manual_reopen_at.is_some() {
                parent.parent_manual_reopen_at = None;
                changed = true;
            }
        } else if all_completed {
            if reset_manual_override && parent.parent_manual_reopen_at.is_some() {
                parent.parent_manual_reopen_at = None;
                changed = true;
            }
            if parent.parent_manual_reopen_at.is_none() && !parent.is_completed() {
                parent.completed_at = Some(now_epoch_ms());
                changed = true;
            }
        } else {
            if parent.is_completed() {
                parent.completed_at = None;
                changed = true;
            }
            if parent.parent_manual_reopen_at.is_some() {
                parent.parent_manual_reopen_at = None;
                changed = true;
            }
        }

        if !changed {
            return Ok(());
        }
        debug!(
            "event=hierarchy_reconcile module=store status=changed parent={} children={} completed={}",
            parent_id, child_count, completed_children
        );
        parent.updated_at = now_epoch_ms();
        self.tasks[index] = parent.clone();
        self.save_tasks()?;
        self.forward(|backend| backend.upsert_task(&parent));
        Ok(())
    }
}

/// Clears structurally invalid parent links in a payload that bypassed the
/// mutation API (remote snapshots, persisted state from older builds).
///
/// A link is cleared when it self-references, names an unknown task, or
/// names a task that is itself a child in the incoming payload. Surviving
/// children get their manual-reopen override forced off. Returns the number
/// of cleared links.
pub(crate) fn sanitize_hierarchy(tasks: &mut [Task]) -> usize {
    let top_level: HashSet<TaskId> = tasks
        .iter()
        .filter(|task| task.is_top_level())
        .map(|task| task.id.clone())
        .collect();

    let mut cleared = 0;
    for task in tasks.iter_mut() {
        if let Some(parent_id) = task.parent_task_id.as_deref() {
            if parent_id == task.id || !top_level.contains(parent_id) {
                task.parent_task_id = None;
                cleared += 1;
            }
        }
        if task.parent_task_id.is_some() {
            task.parent_manual_reopen_at = None;
        }
    }
    cleared
}

#[cfg(test)]
mod tests {
    use super::sanitize_hierarchy;
    use crate::model::task::Task;

    fn task(id: &str, parent: Option<&str>) -> Task {
        let mut task = Task::new(id);
        task.id = id.to_string();
        task.parent_task_id = parent.map(str::to_string);
        task
    }

    #[test]
    fn sanitize_clears_self_reference() {
        let mut tasks = vec![task("a", Some("a"))];
        assert_eq!(sanitize_hierarchy(&mut tasks), 1);
        assert!(tasks[0].parent_task_id.is_none());
    }

    #[test]
    fn sanitize_clears_unknown_parent() {
        let mut tasks = vec![task("a", Some("ghost"))];
        assert_eq!(sanitize_hierarchy(&mut tasks), 1);
        assert!(tasks[0].parent_task_id.is_none());
    }

    #[test]
    fn sanitize_clears_grandchild_link() {
        let mut tasks = vec![
            task("root", None),
            task("mid", Some("root")),
            task("leaf", Some("mid")),
        ];
        assert_eq!(sanitize_hierarchy(&mut tasks), 1);
        assert_eq!(tasks[1].parent_task_id.as_deref(), Some("root"));
        assert!(tasks[2].parent_task_id.is_none());
    }

    #[test]
    fn sanitize_strips_manual_reopen_from_children() {
        let mut tasks = vec![task("root", None), task("child", Some("root"))];
        tasks[1].parent_manual_reopen_at = Some(42);

        assert_eq!(sanitize_hierarchy(&mut tasks), 0);
        assert!(tasks[1].parent_manual_reopen_at.is_none());
    }
}
