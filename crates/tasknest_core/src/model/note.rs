//! Note domain model.
//!
//! Notes are intentionally minimal: immutable id, free text, creation time.
//! They are never field-edited after creation; the only full replace happens
//! through the remote reconciliation gate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::now_epoch_ms;

/// Stable identifier for notes.
pub type NoteId = Uuid;

/// Free-form note record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub text: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Note {
    /// Creates a note with a generated stable id, stamped with the current time.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            created_at: now_epoch_ms(),
        }
    }

    /// Creates a note with a caller-provided id and creation time.
    ///
    /// Used by import/sync paths where identity already exists externally.
    pub fn with_id(id: NoteId, text: impl Into<String>, created_at: i64) -> Self {
        Self {
            id,
            text: text.into(),
            created_at,
        }
    }
}
