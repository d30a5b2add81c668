//! Canonical domain model for the tasknest store.
//!
//! # Responsibility
//! - Define the entity shapes owned by the store: notes, tasks, categories,
//!   preference records and staged shared-import items.
//! - Keep wire compatibility with payloads produced by other clients
//!   (camelCase JSON field names).
//!
//! # Invariants
//! - Every entity is identified by a stable id that is never reused.
//! - Structural task invariants (single-level hierarchy, manual-reopen
//!   exclusivity) are enforced by the store, not by constructors.

pub mod category;
pub mod note;
pub mod prefs;
pub mod shared_item;
pub mod task;
