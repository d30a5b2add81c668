//! Outbound backend contract and the no-op default adapter.

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::model::category::Category;
use crate::model::note::{Note, NoteId};
use crate::model::task::{Task, TaskId};

pub type BackendResult = Result<(), BackendError>;

/// Transport-level failure reported by a backend adapter.
///
/// The store logs these and moves on; eventual consistency is acceptable for
/// the outbound side channel.
#[derive(Debug)]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "backend sync failed: {}", self.message)
    }
}

impl Error for BackendError {}

/// Best-effort outbound sync collaborator.
///
/// Calls are fire-and-forget from the store's point of view: the store never
/// awaits confirmation and never retries.
pub trait BackendSync {
    fn upsert_note(&self, note: &Note) -> BackendResult;
    fn upsert_notes(&self, notes: &[Note]) -> BackendResult;
    fn delete_note(&self, id: NoteId) -> BackendResult;
    fn upsert_task(&self, task: &Task) -> BackendResult;
    fn upsert_tasks(&self, tasks: &[Task]) -> BackendResult;
    fn delete_task(&self, id: &TaskId) -> BackendResult;
    fn upsert_category(&self, category: &Category) -> BackendResult;
    fn upsert_categories(&self, categories: &[Category]) -> BackendResult;
}

/// Backend adapter that accepts and discards every call.
#[derive(Debug, Default)]
pub struct NullBackend;

impl BackendSync for NullBackend {
    fn upsert_note(&self, _note: &Note) -> BackendResult {
        Ok(())
    }

    fn upsert_notes(&self, _notes: &[Note]) -> BackendResult {
        Ok(())
    }

    fn delete_note(&self, _id: NoteId) -> BackendResult {
        Ok(())
    }

    fn upsert_task(&self, _task: &Task) -> BackendResult {
        Ok(())
    }

    fn upsert_tasks(&self, _tasks: &[Task]) -> BackendResult {
        Ok(())
    }

    fn delete_task(&self, _id: &TaskId) -> BackendResult {
        Ok(())
    }

    fn upsert_category(&self, _category: &Category) -> BackendResult {
        Ok(())
    }

    fn upsert_categories(&self, _categories: &[Category]) -> BackendResult {
        Ok(())
    }
}
