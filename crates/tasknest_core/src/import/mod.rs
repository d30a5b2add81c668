//! Shared-item import pipeline.
//!
//! # Responsibility
//! - Drain the externally staged queue into notes and tasks.
//! - Keep failed items in the queue, marked, for a later retry.
//! - Serialize drains: at most one runs at a time, overlapping requests
//!   are dropped.
//!
//! # Invariants
//! - Per-item failures never abort the drain; only persistence failures do.
//! - The queue rewrite after a drain contains exactly the failed items.
//! - Status reflects the outcome of the most recent completed drain.

use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::model::note::Note;
use crate::model::shared_item::{ImportDestination, SharedImportItem, SharedTaskDraft};
use crate::model::task::Task;
use crate::store::{Store, StoreResult};
use crate::time::{format_attribution_ms, now_epoch_ms};

/// Attribution fallback when the staging writer did not name the source.
const DEFAULT_SOURCE: &str = "Share Sheet";

/// Task titles derived from body text keep this many leading words.
const DERIVED_TITLE_WORDS: usize = 6;

/// Per-item conversion failure. Stored on the failed queue item as its
/// retry reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportItemError {
    /// The item carries no usable title, text or URL.
    EmptyPayload,
    /// A task item has no title and no text to derive one from.
    MissingTaskTitle,
    /// A batch item has no draft with a non-empty title.
    NoTaskDrafts,
}

impl std::fmt::Display for ImportItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "shared item has no usable content"),
            Self::MissingTaskTitle => write!(f, "shared task is missing a title"),
            Self::NoTaskDrafts => write!(f, "shared task list has no usable drafts"),
        }
    }
}

impl std::error::Error for ImportItemError {}

/// Snapshot of the pipeline after its most recent drain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStatus {
    /// Items still in the queue (all failed) after the last drain.
    pub pending_count: usize,
    /// First failed item's reason, if any item failed.
    pub last_error: Option<String>,
    /// When the last drain completed, epoch milliseconds.
    pub last_processed_at: Option<i64>,
}

enum ImportOutput {
    Note(Note),
    Tasks(Vec<Task>),
}

/// Single-flight consumer of the shared-item queue.
pub struct ImportPipeline {
    store: Arc<Mutex<Store>>,
    drain_active: Mutex<bool>,
    status: Mutex<ImportStatus>,
}

impl ImportPipeline {
    pub fn new(store: Arc<Mutex<Store>>) -> Self {
        Self {
            store,
            drain_active: Mutex::new(false),
            status: Mutex::new(ImportStatus::default()),
        }
    }

    /// Status of the most recent completed drain.
    pub fn status(&self) -> ImportStatus {
        lock(&self.status).clone()
    }

    /// Drains the queue unless a drain is already running.
    ///
    /// Returns `false` when the request was dropped because of an active
    /// drain; the active drain will pick up anything staged meanwhile on
    /// its own queue read, and a later request covers the rest.
    pub fn request_drain(&self) -> StoreResult<bool> {
        {
            let mut active = lock(&self.drain_active);
            if *active {
                debug!("event=import_drain module=import status=dropped_already_running");
                return Ok(false);
            }
            *active = true;
        }
        let outcome = self.drain();
        *lock(&self.drain_active) = false;
        outcome.map(|_| true)
    }

    fn drain(&self) -> StoreResult<()> {
        let mut store = lock(&self.store);
        let queue = store.shared_queue()?;
        let now = now_epoch_ms();
        if queue.is_empty() {
            *lock(&self.status) = ImportStatus {
                pending_count: 0,
                last_error: None,
                last_processed_at: Some(now),
            };
            return Ok(());
        }

        let total = queue.len();
        let mut notes = Vec::new();
        let mut tasks = Vec::new();
        let mut failed = Vec::new();
        for item in queue {
            match convert_item(&item) {
                Ok(ImportOutput::Note(note)) => notes.push(note),
                Ok(ImportOutput::Tasks(converted)) => tasks.extend(converted),
                Err(err) => {
                    warn!(
                        "event=import_item module=import status=failed item={} retry={} error={}",
                        item.id,
                        item.retry_count + 1,
                        err
                    );
                    failed.push(item.marked_failed(err.to_string()));
                }
            }
        }

        store.import_notes(notes)?;
        store.import_tasks(tasks)?;
        store.replace_shared_queue(&failed)?;

        info!(
            "event=import_drain module=import status=ok total={} failed={}",
            total,
            failed.len()
        );
        *lock(&self.status) = ImportStatus {
            pending_count: failed.len(),
            last_error: failed.first().and_then(|item| item.last_error.clone()),
            last_processed_at: Some(now),
        };
        Ok(())
    }
}

// Mutex poisoning only means another drain panicked mid-flight; the data it
// guards is still consistent enough to continue.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn convert_item(item: &SharedImportItem) -> Result<ImportOutput, ImportItemError> {
    match item.resolved_destination() {
        ImportDestination::Note => convert_to_note(item).map(ImportOutput::Note),
        ImportDestination::Task => convert_to_task(item).map(|task| ImportOutput::Tasks(vec![task])),
        ImportDestination::TaskBatch => convert_to_task_batch(item).map(ImportOutput::Tasks),
    }
}

fn convert_to_note(item: &SharedImportItem) -> Result<Note, ImportItemError> {
    let title = item.title.trim();
    let text = item.text.as_deref().map(str::trim).unwrap_or_default();
    let url = item.url.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() && text.is_empty() && url.is_empty() {
        return Err(ImportItemError::EmptyPayload);
    }

    let mut sections = Vec::new();
    if !title.is_empty() {
        sections.push(format!("# {title}"));
    }
    if !text.is_empty() {
        sections.push(text.to_string());
    }
    if !url.is_empty() {
        sections.push(url.to_string());
    }
    sections.push(attribution_line(item));
    if item.was_truncated {
        sections.push("Note: the shared content was truncated during import.".to_string());
    }
    Ok(Note::new(sections.join("\n\n")))
}

fn convert_to_task(item: &SharedImportItem) -> Result<Task, ImportItemError> {
    let title = derive_task_title(item).ok_or(ImportItemError::MissingTaskTitle)?;
    Ok(build_task(item, title, item.text.as_deref()))
}

fn convert_to_task_batch(item: &SharedImportItem) -> Result<Vec<Task>, ImportItemError> {
    let drafts: Vec<&SharedTaskDraft> = item
        .task_drafts
        .iter()
        .filter(|draft| !draft.title.trim().is_empty())
        .collect();
    if drafts.is_empty() {
        return Err(ImportItemError::NoTaskDrafts);
    }
    Ok(drafts
        .into_iter()
        .map(|draft| {
            let notes = Some(draft.notes.as_str()).filter(|notes| !notes.trim().is_empty());
            build_task(item, draft.title.trim().to_string(), notes)
        })
        .collect())
}

// Explicit title wins; otherwise the first few words of the body stand in.
fn derive_task_title(item: &SharedImportItem) -> Option<String> {
    let title = item.title.trim();
    if !title.is_empty() {
        return Some(title.to_string());
    }
    let text = item.text.as_deref()?.trim();
    if text.is_empty() {
        return None;
    }
    Some(
        text.split_whitespace()
            .take(DERIVED_TITLE_WORDS)
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn build_task(item: &SharedImportItem, title: String, body: Option<&str>) -> Task {
    let mut task = Task::new(title);
    task.categories = item.categories.clone();
    task.priority = item.priority;
    task.due_date = item.due_date;
    task.reminder_date = item.reminder_date;
    task.task_notes = Some(assemble_task_notes(item, body));
    task
}

fn assemble_task_notes(item: &SharedImportItem, body: Option<&str>) -> String {
    let mut sections = Vec::new();
    if let Some(url) = item.url.as_deref().map(str::trim) {
        if !url.is_empty() {
            sections.push(url.to_string());
        }
    }
    if let Some(body) = body.map(str::trim) {
        if !body.is_empty() {
            sections.push(body.to_string());
        }
    }
    sections.push(attribution_line(item));
    if item.was_truncated {
        sections.push("Note: the shared content was truncated during import.".to_string());
    }
    sections.join("\n\n")
}

fn attribution_line(item: &SharedImportItem) -> String {
    let source = item
        .source_app
        .as_deref()
        .map(str::trim)
        .filter(|source| !source.is_empty())
        .unwrap_or(DEFAULT_SOURCE);
    format!(
        "Imported from {} on {}",
        source,
        format_attribution_ms(item.import_timestamp)
    )
}
