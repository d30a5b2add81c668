//! Invertible task commands and the undo/redo stack.
//!
//! # Responsibility
//! - Capture destructive task mutations as replayable commands.
//! - Drive the store through undo/redo without bypassing the mutation API.
//!
//! # Invariants
//! - Undoing a command pushes it onto the redo stack; recording a new
//!   command clears the redo stack.
//! - Commands replay through the store's public mutations, so persistence
//!   and forwarding behave exactly like a user-initiated edit.

use crate::model::task::Task;

use super::{Store, StoreResult};

/// A task mutation that can be inverted.
#[derive(Debug, Clone)]
pub enum TaskCommand {
    /// Delete the captured task.
    Delete(Task),
    /// Re-add the captured task with its original id and fields.
    Add(Task),
}

impl TaskCommand {
    /// Replays the command against the store.
    pub fn apply(&self, store: &mut Store) -> StoreResult<()> {
        match self {
            Self::Delete(task) => store.delete_task(&task.id),
            Self::Add(task) => {
                store.add_task(task.clone())?;
                Ok(())
            }
        }
    }

    /// The command that reverses this one.
    pub fn invert(&self) -> TaskCommand {
        match self {
            Self::Delete(task) => Self::Add(task.clone()),
            Self::Add(task) => Self::Delete(task.clone()),
        }
    }
}

/// Linear undo/redo history of task commands.
#[derive(Debug, Default)]
pub struct TaskUndoStack {
    undo: Vec<TaskCommand>,
    redo: Vec<TaskCommand>,
}

impl TaskUndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Records an already-applied command and invalidates the redo branch.
    pub fn record(&mut self, command: TaskCommand) {
        self.undo.push(command);
        self.redo.clear();
    }

    /// Reverses the most recent command. Returns `false` on an empty stack.
    pub fn undo(&mut self, store: &mut Store) -> StoreResult<bool> {
        let Some(command) = self.undo.pop() else {
            return Ok(false);
        };
        command.invert().apply(store)?;
        self.redo.push(command);
        Ok(true)
    }

    /// Replays the most recently undone command.
    pub fn redo(&mut self, store: &mut Store) -> StoreResult<bool> {
        let Some(command) = self.redo.pop() else {
            return Ok(false);
        };
        command.apply(store)?;
        self.undo.push(command);
        Ok(true)
    }
}

impl Store {
    /// Deletes a childless task and records the deletion for undo.
    pub fn delete_task_recorded(
        &mut self,
        id: &str,
        history: &mut TaskUndoStack,
    ) -> StoreResult<()> {
        let Some(task) = self.task(id).cloned() else {
            return Ok(());
        };
        if self.has_children(id) {
            return Ok(());
        }
        self.delete_task(id)?;
        history.record(TaskCommand::Delete(task));
        Ok(())
    }
}
