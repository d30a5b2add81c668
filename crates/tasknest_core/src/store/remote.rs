//! Inbound remote application and the echo-suppression gate.
//!
//! # Responsibility
//! - Apply remote snapshots and per-collection replacements.
//! - Guarantee that nothing applied from remote is forwarded back out.
//!
//! # Invariants
//! - Every remote application runs inside the suppression scope; the
//!   counter is balanced even when the body errors.
//! - Remote task payloads are sanitized before they replace local state.
//! - Reminders are rescheduled from the applied task set, not the old one.

use log::{info, warn};

use crate::model::category::{normalize_hex_or_default, Category};
use crate::model::note::Note;
use crate::model::task::Task;
use crate::time::now_epoch_ms;

use super::hierarchy::sanitize_hierarchy;
use super::{Store, StoreResult};

impl Store {
    /// Runs `apply` with outbound forwarding suppressed.
    ///
    /// Reentrant: nested scopes stack, and forwarding resumes only when the
    /// outermost scope ends.
    pub(crate) fn with_remote_suppressed<T>(
        &mut self,
        apply: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.suppress_depth += 1;
        let result = apply(self);
        self.suppress_depth = self.suppress_depth.saturating_sub(1);
        result
    }

    /// Whether outbound forwarding is currently suppressed.
    pub fn is_remote_suppressed(&self) -> bool {
        self.suppress_depth > 0
    }

    /// Replaces all three collections from one remote snapshot.
    pub fn apply_remote_snapshot(
        &mut self,
        notes: Vec<Note>,
        tasks: Vec<Task>,
        categories: Vec<Category>,
    ) -> StoreResult<()> {
        self.with_remote_suppressed(|store| {
            store.replace_notes_from_remote(notes)?;
            store.replace_tasks_from_remote(tasks)?;
            store.replace_categories_from_remote(categories)?;
            info!("event=remote_apply module=store status=ok kind=snapshot");
            Ok(())
        })
    }

    /// Replaces the notes collection from remote.
    pub fn apply_remote_notes(&mut self, notes: Vec<Note>) -> StoreResult<()> {
        self.with_remote_suppressed(|store| store.replace_notes_from_remote(notes))
    }

    /// Replaces the tasks collection from remote, sanitizing hierarchy
    /// links against the incoming payload first.
    pub fn apply_remote_tasks(&mut self, tasks: Vec<Task>) -> StoreResult<()> {
        self.with_remote_suppressed(|store| store.replace_tasks_from_remote(tasks))
    }

    /// Replaces the categories collection from remote. Colors are
    /// canonicalized and the uncategorized position re-clamped.
    pub fn apply_remote_categories(&mut self, categories: Vec<Category>) -> StoreResult<()> {
        self.with_remote_suppressed(|store| store.replace_categories_from_remote(categories))
    }

    /// Adopts a remote uncategorized position, clamped to the current
    /// category count.
    pub fn apply_remote_uncategorized_position(&mut self, position: usize) -> StoreResult<()> {
        self.with_remote_suppressed(|store| {
            store.set_uncategorized_position_clamped(position);
            store.save_uncategorized_position()
        })
    }

    fn replace_notes_from_remote(&mut self, notes: Vec<Note>) -> StoreResult<()> {
        self.replace_notes_collection(notes);
        self.save_notes()
    }

    fn replace_tasks_from_remote(&mut self, mut tasks: Vec<Task>) -> StoreResult<()> {
        let cleared = sanitize_hierarchy(&mut tasks);
        if cleared > 0 {
            warn!(
                "event=remote_apply module=store status=sanitized kind=tasks cleared_parents={}",
                cleared
            );
        }
        self.replace_tasks_collection(tasks);
        self.save_tasks()?;
        self.reschedule_reminders_after_sync();
        Ok(())
    }

    fn replace_categories_from_remote(&mut self, mut categories: Vec<Category>) -> StoreResult<()> {
        for category in &mut categories {
            category.color = normalize_hex_or_default(&category.color, &category.id);
        }
        self.replace_categories_collection(categories);
        self.sort_and_renormalize_categories();
        self.clamp_uncategorized_position();
        self.save_categories()?;
        self.save_uncategorized_position()
    }

    // Re-arms the scheduler for every open task whose reminder is still in
    // the future; stale local schedules for tasks the remote completed or
    // dropped are left to expire on the collaborator side.
    fn reschedule_reminders_after_sync(&self) {
        let now = now_epoch_ms();
        for task in self.tasks() {
            if task.is_completed() {
                continue;
            }
            let (Some(reminder_date), Some(reminder_ref)) =
                (task.reminder_date, task.reminder_ref.as_deref())
            else {
                continue;
            };
            if reminder_date > now {
                self.schedule_reminder_ref(task, reminder_date, reminder_ref);
            }
        }
    }
}
