//! Durable key-value persistence boundary.
//!
//! # Responsibility
//! - Define the synchronous get/set-by-key blob contract the store relies on.
//! - Encode/decode entity collections as JSON blobs.
//!
//! # Invariants
//! - Decode failures are treated as "value absent": callers receive defaults
//!   and a warning is logged; malformed persisted bytes never crash the
//!   engine.
//! - Each collection lives under its own distinct key.

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod sqlite;

pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

/// Persistence keys, one per owned collection/record.
pub mod keys {
    pub const NOTES: &str = "notes";
    pub const TASKS: &str = "tasks";
    pub const CATEGORIES: &str = "categories";
    pub const UNCATEGORIZED_POSITION: &str = "uncategorized_position";
    pub const EXPERIMENTAL_FEATURE: &str = "experimental_feature";
    pub const INSIGHTS_HINT: &str = "insights_hint";
    pub const SHARED_QUEUE: &str = "shared_queue";
}

pub type PersistResult<T> = Result<T, PersistError>;

/// Persistence-layer failure.
#[derive(Debug)]
pub enum PersistError {
    Sqlite(rusqlite::Error),
    Encode(serde_json::Error),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode persisted value: {err}"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for PersistError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Synchronous durable blob storage scoped to one namespace.
pub trait KvStore {
    fn get(&self, key: &str) -> PersistResult<Option<Vec<u8>>>;
    fn set(&mut self, key: &str, value: &[u8]) -> PersistResult<()>;
}

/// Serializes `value` as JSON and writes it under `key`.
pub fn save_json<T: Serialize>(kv: &mut dyn KvStore, key: &str, value: &T) -> PersistResult<()> {
    let bytes = serde_json::to_vec(value).map_err(PersistError::Encode)?;
    kv.set(key, &bytes)
}

/// Loads and decodes the value under `key`.
///
/// Returns `(value, was_present)`. Missing or undecodable bytes yield the
/// default with `was_present = false`.
pub fn load_json_or_default<T: DeserializeOwned + Default>(
    kv: &dyn KvStore,
    key: &str,
) -> PersistResult<(T, bool)> {
    match kv.get(key)? {
        None => Ok((T::default(), false)),
        Some(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => Ok((value, true)),
            Err(err) => {
                warn!(
                    "event=kv_decode module=persist status=fallback key={} error={}",
                    key, err
                );
                Ok((T::default(), false))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{load_json_or_default, save_json, MemoryKvStore};

    #[test]
    fn roundtrip_preserves_value_and_presence() {
        let mut kv = MemoryKvStore::new();
        save_json(&mut kv, "numbers", &vec![1_i64, 2, 3]).unwrap();

        let (loaded, present): (Vec<i64>, bool) = load_json_or_default(&kv, "numbers").unwrap();
        assert!(present);
        assert_eq!(loaded, vec![1, 2, 3]);
    }

    #[test]
    fn missing_key_yields_default_and_absent() {
        let kv = MemoryKvStore::new();
        let (loaded, present): (Vec<i64>, bool) = load_json_or_default(&kv, "missing").unwrap();
        assert!(!present);
        assert!(loaded.is_empty());
    }

    #[test]
    fn malformed_bytes_fall_back_to_default() {
        let mut kv = MemoryKvStore::new();
        kv.set_raw("numbers", b"{not json".to_vec());

        let (loaded, present): (Vec<i64>, bool) = load_json_or_default(&kv, "numbers").unwrap();
        assert!(!present);
        assert!(loaded.is_empty());
    }
}
