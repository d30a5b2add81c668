//! The mutation engine owning notes, tasks, categories and preferences.
//!
//! # Responsibility
//! - Provide the only path by which owned entities change.
//! - Persist every mutation synchronously before returning.
//! - Forward accepted mutations to the backend collaborator unless the
//!   remote-suppression scope is active.
//!
//! # Invariants
//! - Structural task invariants hold after every mutation; structurally
//!   invalid requests are silently rejected as no-ops, never surfaced.
//! - Category `order` values and the vector position stay consistent
//!   (sorted ascending by `order`, id tie-break).
//! - The uncategorized position is re-clamped after every category change.
//! - All reconciliation effects of a mutation are persisted before the
//!   forwarding step runs and before the call returns.

use log::{debug, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

use crate::model::category::{normalize_hex_or_default, Category, CategoryId};
use crate::model::note::{Note, NoteId};
use crate::model::prefs::{ExperimentalFeaturePreference, InsightsHintState};
use crate::model::shared_item::SharedImportItem;
use crate::model::task::{display_order_key, Task, TaskId};
use crate::persist::{keys, load_json_or_default, save_json, KvStore, PersistError};
use crate::reminder::{NullReminders, ReminderScheduling};
use crate::sync::backend::{BackendResult, BackendSync};
use crate::time::now_epoch_ms;

pub(crate) mod hierarchy;
pub mod prefs;
pub mod remote;
pub mod undo;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level failure. Only persistence problems propagate; structural
/// violations and collaborator failures never do.
#[derive(Debug)]
pub enum StoreError {
    Persist(PersistError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Persist(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persist(err) => Some(err),
        }
    }
}

impl From<PersistError> for StoreError {
    fn from(value: PersistError) -> Self {
        Self::Persist(value)
    }
}

/// How `delete_parent_task` treats the children of the deleted parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtaskStrategy {
    /// Delete every child along with the parent.
    DeleteSubtasks,
    /// Promote every child to top level, then delete the parent.
    DetachSubtasks,
}

/// Local-first store for notes, tasks, categories and preference records.
///
/// All collection access is serialized by the single owner of this value;
/// callers that share it across threads wrap it in `Arc<Mutex<Store>>`.
pub struct Store {
    notes: Vec<Note>,
    tasks: Vec<Task>,
    categories: Vec<Category>,
    uncategorized_position: usize,
    pub(crate) experimental: ExperimentalFeaturePreference,
    pub(crate) experimental_persisted: bool,
    pub(crate) insights_hint: InsightsHintState,
    pub(crate) insights_hint_persisted: bool,
    kv: Box<dyn KvStore + Send>,
    backend: Option<Box<dyn BackendSync + Send>>,
    reminders: Box<dyn ReminderScheduling + Send>,
    pub(crate) suppress_depth: u32,
}

impl Store {
    /// Opens a store over the given persistence collaborator, loading all
    /// collections and running first-run/migration fixups.
    pub fn open(kv: Box<dyn KvStore + Send>) -> StoreResult<Self> {
        let (notes, _) = load_json_or_default::<Vec<Note>>(kv.as_ref(), keys::NOTES)?;
        let (tasks, _) = load_json_or_default::<Vec<Task>>(kv.as_ref(), keys::TASKS)?;
        let (categories, _) =
            load_json_or_default::<Vec<Category>>(kv.as_ref(), keys::CATEGORIES)?;
        let (uncategorized_position, _) =
            load_json_or_default::<usize>(kv.as_ref(), keys::UNCATEGORIZED_POSITION)?;
        let (experimental, experimental_persisted) =
            load_json_or_default::<ExperimentalFeaturePreference>(
                kv.as_ref(),
                keys::EXPERIMENTAL_FEATURE,
            )?;
        let (insights_hint, insights_hint_persisted) =
            load_json_or_default::<InsightsHintState>(kv.as_ref(), keys::INSIGHTS_HINT)?;

        let mut store = Self {
            notes,
            tasks,
            categories,
            uncategorized_position,
            experimental,
            experimental_persisted,
            insights_hint,
            insights_hint_persisted,
            kv,
            backend: None,
            reminders: Box::new(NullReminders),
            suppress_depth: 0,
        };
        store.migrate_if_needed()?;

        info!(
            "event=store_open module=store status=ok notes={} tasks={} categories={}",
            store.notes.len(),
            store.tasks.len(),
            store.categories.len()
        );
        Ok(store)
    }

    /// Attaches (or detaches) the outbound backend collaborator.
    pub fn attach_backend(&mut self, backend: Option<Box<dyn BackendSync + Send>>) {
        self.backend = backend;
    }

    /// Replaces the reminder scheduling collaborator.
    pub fn attach_reminders(&mut self, reminders: Box<dyn ReminderScheduling + Send>) {
        self.reminders = reminders;
    }

    // First-run and fixup pass: starter categories, color canonicalization,
    // hierarchy sanitization of whatever was persisted, position clamp.
    fn migrate_if_needed(&mut self) -> StoreResult<()> {
        if self.categories.is_empty() {
            self.categories = Category::default_set();
            self.save_categories()?;
        } else {
            let mut changed = false;
            for category in &mut self.categories {
                let normalized = normalize_hex_or_default(&category.color, &category.id);
                if normalized != category.color {
                    category.color = normalized;
                    changed = true;
                }
            }
            let before: Vec<CategoryId> =
                self.categories.iter().map(|c| c.id.clone()).collect();
            self.sort_and_renormalize_categories();
            let after: Vec<CategoryId> = self.categories.iter().map(|c| c.id.clone()).collect();
            if changed || before != after {
                self.save_categories()?;
            }
        }

        let cleared = hierarchy::sanitize_hierarchy(&mut self.tasks);
        if cleared > 0 {
            warn!(
                "event=store_migrate module=store status=sanitized cleared_parents={}",
                cleared
            );
            self.save_tasks()?;
        }

        if self.clamp_uncategorized_position() {
            self.save_uncategorized_position()?;
        }
        Ok(())
    }

    // ---- Accessors ------------------------------------------------------

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Tasks sorted for display: larger `order_index` first, id tie-break.
    pub fn tasks_in_display_order(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().collect();
        tasks.sort_by(|lhs, rhs| display_order_key(lhs).cmp(&display_order_key(rhs)));
        tasks
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn uncategorized_position(&self) -> usize {
        self.uncategorized_position
    }

    pub fn experimental(&self) -> &ExperimentalFeaturePreference {
        &self.experimental
    }

    pub fn insights_hint(&self) -> &InsightsHintState {
        &self.insights_hint
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub(crate) fn task_index(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    // ---- Notes ----------------------------------------------------------

    /// Appends a note, persists and forwards it.
    pub fn add_note(&mut self, note: Note) -> StoreResult<NoteId> {
        let note_id = note.id;
        self.notes.push(note.clone());
        self.save_notes()?;
        self.forward(|backend| backend.upsert_note(&note));
        Ok(note_id)
    }

    /// Removes a note by id. Unknown ids are a no-op.
    pub fn delete_note(&mut self, id: NoteId) -> StoreResult<()> {
        let before = self.notes.len();
        self.notes.retain(|note| note.id != id);
        if self.notes.len() == before {
            return Ok(());
        }
        self.save_notes()?;
        self.forward(|backend| backend.delete_note(id));
        Ok(())
    }

    // ---- Tasks ----------------------------------------------------------

    /// Adds a task, assigning a monotonic `order_index` when absent.
    ///
    /// An invalid `parent_task_id` (self-reference, unknown parent, parent
    /// that is itself a child) is silently cleared: a valid top-level task
    /// is preferred over rejecting the write. A parented task with no
    /// categories inherits the parent's set.
    pub fn add_task(&mut self, mut task: Task) -> StoreResult<TaskId> {
        if task.order_index.is_none() {
            task.order_index = Some(now_epoch_ms());
        }

        if let Some(parent_id) = task.parent_task_id.clone() {
            if !self.is_valid_parent(&task.id, &parent_id) {
                debug!(
                    "event=task_add module=store status=parent_cleared task={}",
                    task.id
                );
                task.parent_task_id = None;
            }
        }
        if let Some(parent_id) = task.parent_task_id.clone() {
            task.parent_manual_reopen_at = None;
            if task.categories.is_empty() {
                if let Some(parent) = self.task(&parent_id) {
                    task.categories = parent.categories.clone();
                }
            }
        }

        let task_id = task.id.clone();
        let parent_id = task.parent_task_id.clone();
        self.tasks.push(task.clone());
        self.save_tasks()?;
        self.forward(|backend| backend.upsert_task(&task));

        if let Some(parent_id) = parent_id {
            self.reconcile_parent_completion(&parent_id, true)?;
        }
        Ok(task_id)
    }

    /// Applies a read-modify-write transformation to a task.
    ///
    /// Unknown ids are a no-op. The id and creation time are preserved and
    /// `updated_at` is re-stamped. A parent-link change introduced by the
    /// transformation goes through the same structural validation as
    /// [`Self::set_parent`] and is reverted when invalid.
    pub fn update_task(
        &mut self,
        id: &str,
        apply: impl FnOnce(Task) -> Task,
    ) -> StoreResult<()> {
        let Some(index) = self.task_index(id) else {
            return Ok(());
        };
        let before = self.tasks[index].clone();
        let mut task = apply(before.clone());
        task.id = before.id.clone();
        task.created_at = before.created_at;
        task.updated_at = now_epoch_ms();

        if task.parent_task_id != before.parent_task_id {
            if let Some(parent_id) = task.parent_task_id.clone() {
                if self.has_children(id) || !self.is_valid_parent(id, &parent_id) {
                    debug!(
                        "event=task_update module=store status=parent_reverted task={}",
                        id
                    );
                    task.parent_task_id = before.parent_task_id.clone();
                }
            }
        }
        if task.parent_task_id.is_some() {
            task.parent_manual_reopen_at = None;
        }

        self.tasks[index] = task.clone();
        self.save_tasks()?;
        self.forward(|backend| backend.upsert_task(&task));

        let parent_changed = task.parent_task_id != before.parent_task_id;
        let completion_changed = task.is_completed() != before.is_completed();
        if parent_changed {
            if let Some(old_parent) = before.parent_task_id.clone() {
                self.reconcile_parent_completion(&old_parent, true)?;
            }
            if let Some(new_parent) = task.parent_task_id.clone() {
                self.reconcile_parent_completion(&new_parent, true)?;
            }
        } else if completion_changed {
            if let Some(parent_id) = task.parent_task_id.clone() {
                self.reconcile_parent_completion(&parent_id, false)?;
            }
        }
        Ok(())
    }

    /// Re-parents a task (or detaches it with `None`).
    ///
    /// Silent no-op when the request is structurally invalid: self-parent,
    /// parenting a task that itself has children, or a target that is not an
    /// existing top-level task.
    pub fn set_parent(
        &mut self,
        task_id: &str,
        new_parent_id: Option<TaskId>,
    ) -> StoreResult<()> {
        let Some(index) = self.task_index(task_id) else {
            return Ok(());
        };
        if let Some(parent_id) = new_parent_id.as_deref() {
            if parent_id == task_id
                || self.has_children(task_id)
                || !self.is_valid_parent(task_id, parent_id)
            {
                debug!(
                    "event=task_set_parent module=store status=rejected task={}",
                    task_id
                );
                return Ok(());
            }
        }

        let old_parent_id = self.tasks[index].parent_task_id.clone();
        if old_parent_id == new_parent_id {
            return Ok(());
        }

        let mut task = self.tasks[index].clone();
        task.parent_task_id = new_parent_id.clone();
        task.parent_manual_reopen_at = None;
        if let Some(parent_id) = new_parent_id.as_deref() {
            if task.categories.is_empty() {
                if let Some(parent) = self.task(parent_id) {
                    task.categories = parent.categories.clone();
                }
            }
        }
        task.updated_at = now_epoch_ms();

        self.tasks[index] = task.clone();
        self.save_tasks()?;
        self.forward(|backend| backend.upsert_task(&task));

        if let Some(old_parent_id) = old_parent_id {
            self.reconcile_parent_completion(&old_parent_id, true)?;
        }
        if let Some(new_parent_id) = new_parent_id {
            self.reconcile_parent_completion(&new_parent_id, true)?;
        }
        Ok(())
    }

    /// Marks a task completed, cancelling any active reminder.
    pub fn complete_task(&mut self, id: &str) -> StoreResult<()> {
        let Some(index) = self.task_index(id) else {
            return Ok(());
        };
        if self.tasks[index].is_completed() {
            return Ok(());
        }

        let now = now_epoch_ms();
        let mut task = self.tasks[index].clone();
        let reminder_ref = task.reminder_ref.take();
        task.reminder_date = None;
        task.completed_at = Some(now);
        task.parent_manual_reopen_at = None;
        task.updated_at = now;

        self.tasks[index] = task.clone();
        self.save_tasks()?;
        if let Some(reminder_ref) = reminder_ref {
            self.cancel_reminder_ref(&reminder_ref);
        }
        self.forward(|backend| backend.upsert_task(&task));

        if let Some(parent_id) = task.parent_task_id.clone() {
            self.reconcile_parent_completion(&parent_id, false)?;
        }
        Ok(())
    }

    /// Reopens a completed task.
    ///
    /// Restoring a parent sets the manual-reopen override so it stays open
    /// even while all children are complete. A stored reminder is
    /// rescheduled when still in the future, otherwise cleared.
    pub fn restore_task(&mut self, id: &str) -> StoreResult<()> {
        let Some(index) = self.task_index(id) else {
            return Ok(());
        };
        if !self.tasks[index].is_completed() {
            return Ok(());
        }

        let now = now_epoch_ms();
        let mut task = self.tasks[index].clone();
        task.completed_at = None;
        if self.has_children(id) {
            task.parent_manual_reopen_at = Some(now);
        }

        if let (Some(reminder_date), Some(reminder_ref)) =
            (task.reminder_date, task.reminder_ref.clone())
        {
            if reminder_date > now {
                self.schedule_reminder_ref(&task, reminder_date, &reminder_ref);
            } else {
                task.reminder_date = None;
                task.reminder_ref = None;
            }
        }
        task.updated_at = now;

        self.tasks[index] = task.clone();
        self.save_tasks()?;
        self.forward(|backend| backend.upsert_task(&task));

        if let Some(parent_id) = task.parent_task_id.clone() {
            self.reconcile_parent_completion(&parent_id, false)?;
        }
        Ok(())
    }

    /// Deletes a childless task.
    ///
    /// A top-level task that still has children requires an explicit
    /// strategy via [`Self::delete_parent_task`]; this call is a silent
    /// no-op for it.
    pub fn delete_task(&mut self, id: &str) -> StoreResult<()> {
        let Some(index) = self.task_index(id) else {
            return Ok(());
        };
        if self.has_children(id) {
            debug!(
                "event=task_delete module=store status=rejected_needs_strategy task={}",
                id
            );
            return Ok(());
        }

        let removed = self.tasks.remove(index);
        self.save_tasks()?;
        if let Some(reminder_ref) = removed.reminder_ref.as_deref() {
            self.cancel_reminder_ref(reminder_ref);
        }
        let removed_id = removed.id.clone();
        self.forward(|backend| backend.delete_task(&removed_id));

        if let Some(parent_id) = removed.parent_task_id {
            self.reconcile_parent_completion(&parent_id, true)?;
        }
        Ok(())
    }

    /// Deletes a top-level task together with (or after detaching) its
    /// children, per the chosen strategy.
    pub fn delete_parent_task(
        &mut self,
        id: &str,
        strategy: SubtaskStrategy,
    ) -> StoreResult<()> {
        if self.task_index(id).is_none() {
            return Ok(());
        }
        let child_ids: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|task| task.parent_task_id.as_deref() == Some(id))
            .map(|task| task.id.clone())
            .collect();

        match strategy {
            SubtaskStrategy::DeleteSubtasks => {
                for child_id in &child_ids {
                    if let Some(index) = self.task_index(child_id) {
                        let removed = self.tasks.remove(index);
                        if let Some(reminder_ref) = removed.reminder_ref.as_deref() {
                            self.cancel_reminder_ref(reminder_ref);
                        }
                        self.forward(|backend| backend.delete_task(child_id));
                    }
                }
            }
            SubtaskStrategy::DetachSubtasks => {
                let now = now_epoch_ms();
                let mut detached = Vec::new();
                for child_id in &child_ids {
                    if let Some(index) = self.task_index(child_id) {
                        let task = &mut self.tasks[index];
                        task.parent_task_id = None;
                        task.parent_manual_reopen_at = None;
                        task.updated_at = now;
                        detached.push(task.clone());
                    }
                }
                if !detached.is_empty() {
                    self.forward(|backend| backend.upsert_tasks(&detached));
                }
            }
        }

        let mut former_parent_id = None;
        if let Some(index) = self.task_index(id) {
            let removed = self.tasks.remove(index);
            if let Some(reminder_ref) = removed.reminder_ref.as_deref() {
                self.cancel_reminder_ref(reminder_ref);
            }
            let removed_id = removed.id.clone();
            self.forward(|backend| backend.delete_task(&removed_id));
            former_parent_id = removed.parent_task_id;
        }
        self.save_tasks()?;
        if let Some(parent_id) = former_parent_id {
            self.reconcile_parent_completion(&parent_id, true)?;
        }
        Ok(())
    }

    /// Re-assigns strictly descending `order_index` values to `ordered_ids`
    /// from a single "now" anchor. Tasks not listed keep their index and
    /// trail the reordered block in display order.
    pub fn reorder_tasks(&mut self, ordered_ids: &[TaskId]) -> StoreResult<()> {
        let now = now_epoch_ms();
        let id_set: HashSet<&str> = ordered_ids.iter().map(String::as_str).collect();

        let mut reordered = Vec::new();
        for id in ordered_ids {
            if let Some(index) = self.task_index(id) {
                let mut task = self.tasks[index].clone();
                task.order_index = Some(now - reordered.len() as i64);
                task.updated_at = now;
                reordered.push(task);
            }
        }
        if reordered.is_empty() {
            return Ok(());
        }

        let remaining: Vec<Task> = self
            .tasks
            .iter()
            .filter(|task| !id_set.contains(task.id.as_str()))
            .cloned()
            .collect();
        self.tasks = reordered;
        self.tasks.extend(remaining);
        self.save_tasks()?;

        let all = self.tasks.clone();
        self.forward(|backend| backend.upsert_tasks(&all));
        Ok(())
    }

    /// Schedules a reminder for a task, replacing any existing one.
    ///
    /// Collaborator failures are logged and leave the task unchanged.
    pub fn set_reminder(&mut self, task_id: &str, at_epoch_ms: i64) -> StoreResult<()> {
        let Some(index) = self.task_index(task_id) else {
            return Ok(());
        };
        let mut task = self.tasks[index].clone();
        if let Some(existing_ref) = task.reminder_ref.as_deref() {
            self.cancel_reminder_ref(existing_ref);
        }

        let reminder_ref = Uuid::new_v4().to_string();
        if let Err(err) =
            self.reminders
                .schedule(&task, at_epoch_ms, &self.categories, &reminder_ref)
        {
            warn!(
                "event=reminder_schedule module=store status=error task={} error={}",
                task_id, err
            );
            return Ok(());
        }

        task.reminder_date = Some(at_epoch_ms);
        task.reminder_ref = Some(reminder_ref);
        task.updated_at = now_epoch_ms();
        self.tasks[index] = task.clone();
        self.save_tasks()?;
        self.forward(|backend| backend.upsert_task(&task));
        Ok(())
    }

    /// Cancels and clears a task's reminder.
    pub fn remove_reminder(&mut self, task_id: &str) -> StoreResult<()> {
        let Some(index) = self.task_index(task_id) else {
            return Ok(());
        };
        let mut task = self.tasks[index].clone();
        if let Some(existing_ref) = task.reminder_ref.take() {
            self.cancel_reminder_ref(&existing_ref);
        } else if task.reminder_date.is_none() {
            return Ok(());
        }
        task.reminder_date = None;
        task.updated_at = now_epoch_ms();

        self.tasks[index] = task.clone();
        self.save_tasks()?;
        self.forward(|backend| backend.upsert_task(&task));
        Ok(())
    }

    // ---- Categories -----------------------------------------------------

    /// Inserts a category at the top of the display order (newest-first);
    /// every existing category shifts down by one.
    pub fn add_category(&mut self, mut category: Category) -> StoreResult<CategoryId> {
        category.color = normalize_hex_or_default(&category.color, &category.id);
        category.order = 0;
        for existing in &mut self.categories {
            existing.order += 1;
        }
        self.categories.insert(0, category);
        let category_id = self.categories[0].id.clone();

        self.clamp_uncategorized_position();
        self.save_categories()?;
        self.save_uncategorized_position()?;

        let all = self.categories.clone();
        self.forward(|backend| backend.upsert_categories(&all));
        Ok(category_id)
    }

    /// Applies a read-modify-write transformation to a category.
    pub fn update_category(
        &mut self,
        id: &str,
        apply: impl FnOnce(Category) -> Category,
    ) -> StoreResult<()> {
        let Some(index) = self.categories.iter().position(|c| c.id == id) else {
            return Ok(());
        };
        let before = self.categories[index].clone();
        let mut category = apply(before.clone());
        category.id = before.id;
        category.order = before.order;
        category.color = normalize_hex_or_default(&category.color, &category.id);

        self.categories[index] = category.clone();
        self.save_categories()?;
        self.forward(|backend| backend.upsert_category(&category));
        Ok(())
    }

    /// Re-sequences categories: the listed ids first in the given order,
    /// omitted categories appended after them in their previous order.
    pub fn reorder_categories(&mut self, ordered_ids: &[CategoryId]) -> StoreResult<()> {
        let id_set: HashSet<&str> = ordered_ids.iter().map(String::as_str).collect();

        let mut ordered = Vec::new();
        for id in ordered_ids {
            if let Some(category) = self.categories.iter().find(|c| &c.id == id) {
                ordered.push(category.clone());
            }
        }
        let omitted: Vec<Category> = self
            .categories
            .iter()
            .filter(|category| !id_set.contains(category.id.as_str()))
            .cloned()
            .collect();
        ordered.extend(omitted);
        for (position, category) in ordered.iter_mut().enumerate() {
            category.order = position as i32;
        }
        self.categories = ordered;

        self.clamp_uncategorized_position();
        self.save_categories()?;
        self.save_uncategorized_position()?;

        let all = self.categories.clone();
        self.forward(|backend| backend.upsert_categories(&all));
        Ok(())
    }

    /// Deletes a category, first rewriting every task that references it.
    ///
    /// With `reassign_to`, affected tasks gain the replacement category
    /// unless they already carry it. Orders are renormalized afterwards.
    pub fn delete_category(
        &mut self,
        id: &str,
        reassign_to: Option<&str>,
    ) -> StoreResult<()> {
        let Some(position) = self.categories.iter().position(|c| c.id == id) else {
            return Ok(());
        };
        let replacement: Option<CategoryId> = reassign_to
            .filter(|candidate| *candidate != id)
            .filter(|candidate| self.categories.iter().any(|c| &c.id == candidate))
            .map(str::to_string);

        let now = now_epoch_ms();
        let mut updated_tasks = Vec::new();
        for task in &mut self.tasks {
            if !task.categories.iter().any(|c| c == id) {
                continue;
            }
            task.categories.retain(|c| c != id);
            if let Some(replacement) = replacement.as_ref() {
                if !task.categories.contains(replacement) {
                    task.categories.push(replacement.clone());
                }
            }
            task.updated_at = now;
            updated_tasks.push(task.clone());
        }

        self.categories.remove(position);
        for (index, category) in self.categories.iter_mut().enumerate() {
            category.order = index as i32;
        }
        self.clamp_uncategorized_position();

        if !updated_tasks.is_empty() {
            self.save_tasks()?;
        }
        self.save_categories()?;
        self.save_uncategorized_position()?;

        let survivors = self.categories.clone();
        self.forward(|backend| backend.upsert_categories(&survivors));
        if !updated_tasks.is_empty() {
            self.forward(|backend| backend.upsert_tasks(&updated_tasks));
        }
        Ok(())
    }

    /// Moves the synthetic "uncategorized" bucket; the value is clamped to
    /// `[0, categories.len()]`.
    pub fn set_uncategorized_position(&mut self, position: usize) -> StoreResult<()> {
        self.uncategorized_position = position.min(self.categories.len());
        self.save_uncategorized_position()
    }

    /// Clears all owned collections and reinstalls first-run defaults.
    /// Used when a different user signs in; never forwarded.
    pub fn reset_for_new_user(&mut self) -> StoreResult<()> {
        self.with_remote_suppressed(|store| {
            store.notes.clear();
            store.tasks.clear();
            store.categories.clear();
            store.uncategorized_position = 0;
            store.save_notes()?;
            store.save_tasks()?;
            store.save_categories()?;
            store.save_uncategorized_position()?;
            store.migrate_if_needed()
        })
    }

    // ---- Shared-import queue and batch commits --------------------------

    /// Reads the externally staged shared-item queue.
    pub fn shared_queue(&self) -> StoreResult<Vec<SharedImportItem>> {
        let (queue, _) =
            load_json_or_default::<Vec<SharedImportItem>>(self.kv.as_ref(), keys::SHARED_QUEUE)?;
        Ok(queue)
    }

    /// Rewrites the shared-item queue. The staging area is the only other
    /// writer; the import pipeline uses this to retain failed items.
    pub fn replace_shared_queue(&mut self, items: &[SharedImportItem]) -> StoreResult<()> {
        save_json(self.kv.as_mut(), keys::SHARED_QUEUE, &items.to_vec())?;
        Ok(())
    }

    /// Appends a batch of imported notes with one persist and one forward.
    pub fn import_notes(&mut self, notes: Vec<Note>) -> StoreResult<()> {
        if notes.is_empty() {
            return Ok(());
        }
        self.notes.extend(notes.iter().cloned());
        self.save_notes()?;
        self.forward(|backend| backend.upsert_notes(&notes));
        Ok(())
    }

    /// Appends a batch of imported tasks with one persist and one forward.
    ///
    /// Each task goes through the `add_task` rules (synthetic ordering key,
    /// parent validation, category inheritance); future reminders are
    /// scheduled through the reminder collaborator.
    pub fn import_tasks(&mut self, tasks: Vec<Task>) -> StoreResult<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        let now = now_epoch_ms();
        let mut added = Vec::new();
        let mut parents = Vec::new();
        for (position, mut task) in tasks.into_iter().enumerate() {
            if task.order_index.is_none() {
                task.order_index = Some(now - position as i64);
            }
            if let Some(parent_id) = task.parent_task_id.clone() {
                if !self.is_valid_parent(&task.id, &parent_id) {
                    task.parent_task_id = None;
                }
            }
            if let Some(parent_id) = task.parent_task_id.clone() {
                task.parent_manual_reopen_at = None;
                if task.categories.is_empty() {
                    if let Some(parent) = self.task(&parent_id) {
                        task.categories = parent.categories.clone();
                    }
                }
                parents.push(parent_id);
            }
            if let Some(reminder_date) = task.reminder_date {
                if reminder_date > now && task.reminder_ref.is_none() {
                    let reminder_ref = Uuid::new_v4().to_string();
                    if self
                        .reminders
                        .schedule(&task, reminder_date, &self.categories, &reminder_ref)
                        .is_ok()
                    {
                        task.reminder_ref = Some(reminder_ref);
                    }
                }
            }
            added.push(task);
        }

        self.tasks.extend(added.iter().cloned());
        self.save_tasks()?;
        self.forward(|backend| backend.upsert_tasks(&added));

        parents.dedup();
        for parent_id in parents {
            self.reconcile_parent_completion(&parent_id, true)?;
        }
        Ok(())
    }

    // ---- Persistence and collaborator helpers ---------------------------

    pub(crate) fn save_notes(&mut self) -> StoreResult<()> {
        let notes = self.notes.clone();
        save_json(self.kv.as_mut(), keys::NOTES, &notes)?;
        Ok(())
    }

    pub(crate) fn save_tasks(&mut self) -> StoreResult<()> {
        let tasks = self.tasks.clone();
        save_json(self.kv.as_mut(), keys::TASKS, &tasks)?;
        Ok(())
    }

    pub(crate) fn save_categories(&mut self) -> StoreResult<()> {
        let categories = self.categories.clone();
        save_json(self.kv.as_mut(), keys::CATEGORIES, &categories)?;
        Ok(())
    }

    pub(crate) fn save_uncategorized_position(&mut self) -> StoreResult<()> {
        let position = self.uncategorized_position;
        save_json(self.kv.as_mut(), keys::UNCATEGORIZED_POSITION, &position)?;
        Ok(())
    }

    pub(crate) fn save_experimental(&mut self) -> StoreResult<()> {
        let value = self.experimental;
        save_json(self.kv.as_mut(), keys::EXPERIMENTAL_FEATURE, &value)?;
        self.experimental_persisted = true;
        Ok(())
    }

    pub(crate) fn save_insights_hint(&mut self) -> StoreResult<()> {
        let value = self.insights_hint;
        save_json(self.kv.as_mut(), keys::INSIGHTS_HINT, &value)?;
        self.insights_hint_persisted = true;
        Ok(())
    }

    /// Forwards one outbound call unless suppression is active or no
    /// backend is attached. Failures are logged and swallowed.
    pub(crate) fn forward(&self, send: impl FnOnce(&dyn BackendSync) -> BackendResult) {
        if self.suppress_depth > 0 {
            return;
        }
        let Some(backend) = self.backend.as_deref() else {
            return;
        };
        if let Err(err) = send(backend) {
            warn!(
                "event=backend_forward module=store status=error error={}",
                err
            );
        }
    }

    pub(crate) fn cancel_reminder_ref(&self, reminder_ref: &str) {
        if let Err(err) = self.reminders.cancel(reminder_ref) {
            warn!(
                "event=reminder_cancel module=store status=error error={}",
                err
            );
        }
    }

    pub(crate) fn schedule_reminder_ref(&self, task: &Task, at_epoch_ms: i64, reminder_ref: &str) {
        if let Err(err) = self
            .reminders
            .schedule(task, at_epoch_ms, &self.categories, reminder_ref)
        {
            warn!(
                "event=reminder_schedule module=store status=error task={} error={}",
                task.id, err
            );
        }
    }

    pub(crate) fn replace_notes_collection(&mut self, notes: Vec<Note>) {
        self.notes = notes;
    }

    pub(crate) fn replace_tasks_collection(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub(crate) fn replace_categories_collection(&mut self, categories: Vec<Category>) {
        self.categories = categories;
    }

    /// Clamps the uncategorized position into `[0, categories.len()]`.
    /// Returns whether the value changed.
    pub(crate) fn clamp_uncategorized_position(&mut self) -> bool {
        let clamped = self.uncategorized_position.min(self.categories.len());
        if clamped == self.uncategorized_position {
            return false;
        }
        self.uncategorized_position = clamped;
        true
    }

    pub(crate) fn set_uncategorized_position_clamped(&mut self, position: usize) {
        self.uncategorized_position = position.min(self.categories.len());
    }

    pub(crate) fn sort_and_renormalize_categories(&mut self) {
        self.categories
            .sort_by(|lhs, rhs| (lhs.order, &lhs.id).cmp(&(rhs.order, &rhs.id)));
        for (index, category) in self.categories.iter_mut().enumerate() {
            category.order = index as i32;
        }
    }
}
