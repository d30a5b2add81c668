//! Reminder scheduling boundary.
//!
//! The store asks this collaborator to schedule or cancel notification
//! reminders around completion/restoration and reminder edits. Failures are
//! logged by the store and never surfaced to the caller of the triggering
//! mutation.

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::model::category::Category;
use crate::model::task::Task;

pub type ReminderResult = Result<(), ReminderError>;

/// Failure reported by the reminder collaborator.
#[derive(Debug)]
pub struct ReminderError {
    message: String,
}

impl ReminderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for ReminderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "reminder scheduling failed: {}", self.message)
    }
}

impl Error for ReminderError {}

/// Notification scheduling collaborator.
pub trait ReminderScheduling {
    /// Schedules a reminder for `task` firing at `at_epoch_ms`.
    ///
    /// `reminder_ref` is the handle a later [`Self::cancel`] receives.
    fn schedule(
        &self,
        task: &Task,
        at_epoch_ms: i64,
        categories: &[Category],
        reminder_ref: &str,
    ) -> ReminderResult;

    /// Cancels a previously scheduled reminder. Unknown refs are a no-op.
    fn cancel(&self, reminder_ref: &str) -> ReminderResult;
}

/// Reminder adapter that accepts and discards every call.
#[derive(Debug, Default)]
pub struct NullReminders;

impl ReminderScheduling for NullReminders {
    fn schedule(
        &self,
        _task: &Task,
        _at_epoch_ms: i64,
        _categories: &[Category],
        _reminder_ref: &str,
    ) -> ReminderResult {
        Ok(())
    }

    fn cancel(&self, _reminder_ref: &str) -> ReminderResult {
        Ok(())
    }
}
