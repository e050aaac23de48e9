use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::CoreError;

/// Minimal key-value port shared by the profile repository, the ID-mapping
/// store, the status list and the vault.
///
/// Implementations must give read-committed consistency per key.
/// `put_if_absent` must be atomic: of two concurrent callers for the same
/// key exactly one wins, and the loser observes the winner's value.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CoreError>;

    /// Write a value, replacing any previous one.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), CoreError>;

    /// Write a value only if the key is absent.
    ///
    /// Returns `None` when the value was written, or `Some(existing)` when the
    /// key was already present (nothing is written in that case).
    fn put_if_absent(&self, key: &str, value: &[u8]) -> Result<Option<Vec<u8>>, CoreError>;

    /// Remove a key. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), CoreError>;
}

/// In-memory `KeyValueStore` backed by a `DashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CoreError> {
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), CoreError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> Result<Option<Vec<u8>>, CoreError> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(existing) => Ok(Some(existing.get().clone())),
            Entry::Vacant(slot) => {
                slot.insert(value.to_vec());
                Ok(None)
            }
        }
    }

    fn delete(&self, key: &str) -> Result<(), CoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
