//! Core domain logic for TaskNest.
//! This crate is the single source of truth for business invariants.

pub mod import;
pub mod logging;
pub mod model;
pub mod persist;
pub mod reminder;
pub mod store;
pub mod sync;
pub mod time;

pub use import::{ImportItemError, ImportPipeline, ImportStatus};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::category::{default_color_for, normalize_hex_or_default, Category, CategoryId};
pub use model::note::{Note, NoteId};
pub use model::prefs::{
    ExperimentalFeaturePreference, ExperimentalSyncState, InsightsHintState, LwwStamped,
};
pub use model::shared_item::{
    ImportDestination, SharedImportItem, SharedItemStatus, SharedTaskDraft,
};
pub use model::task::{display_order_key, Priority, Task, TaskId};
pub use persist::{KvStore, MemoryKvStore, PersistError, PersistResult, SqliteKvStore};
pub use reminder::{NullReminders, ReminderError, ReminderResult, ReminderScheduling};
pub use store::prefs::{reconcile_lww, LwwOutcome};
pub use store::undo::{TaskCommand, TaskUndoStack};
pub use store::{Store, StoreError, StoreResult, SubtaskStrategy};
pub use sync::backend::{BackendError, BackendResult, BackendSync, NullBackend};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
