//! Concurrent key storage.
//!
//! [`KeyCache`] maps key IDs to key material. Entries are never removed;
//! the only way a value changes is by being overwritten with a newer one
//! for the same key ID.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Thread-safe mapping from key ID to shared key material.
///
/// Readers proceed in parallel; a writer excludes all readers and other
/// writers for the duration of a single insert, so a reader never observes
/// a partially written entry.
pub struct KeyCache<V> {
    entries: RwLock<HashMap<String, Arc<V>>>,
}

impl<V> KeyCache<V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the key stored under `kid`, if any.
    pub fn get(&self, kid: &str) -> Option<Arc<V>> {
        self.entries.read().get(kid).cloned()
    }

    /// Inserts or overwrites the key stored under `kid`.
    ///
    /// Returns `true` if an existing entry was replaced.
    pub fn put(&self, kid: impl Into<String>, value: V) -> bool {
        self.entries
            .write()
            .insert(kid.into(), Arc::new(value))
            .is_some()
    }

    /// Returns `true` if a key is stored under `kid`.
    pub fn contains(&self, kid: &str) -> bool {
        self.entries.read().contains_key(kid)
    }

    /// Returns the cached key IDs in sorted order.
    pub fn key_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.read().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the number of cached keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<V> Default for KeyCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for KeyCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache")
            .field("key_ids", &self.key_ids())
            .finish()
    }
}
