//! In-memory key-value store for tests and embedding without durability.

use std::collections::HashMap;

use super::{KvStore, PersistResult};

/// Volatile `KvStore` backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    values: HashMap<String, Vec<u8>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds raw bytes under a key, bypassing the JSON codec.
    ///
    /// Test hook for exercising decode-failure fallbacks.
    pub fn set_raw(&mut self, key: &str, value: Vec<u8>) {
        self.values.insert(key.to_string(), value);
    }

    /// Returns the set of keys currently stored.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> PersistResult<Option<Vec<u8>>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> PersistResult<()> {
        self.values.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
