use std::collections::hash_map::Iter;
use std::collections::HashMap;

use crate::{Key, Value};

/// State of a single key in the overlay.
///
/// A key with no entry defers to the engine. `Deleted` is a tombstone and is
/// distinct from `Present` with an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Present(Value),
    Deleted,
}

/// In-memory map of pending writes, tombstones and cached reads.
///
/// Cached reads and pending writes are both stored as [`Entry::Present`] and
/// cannot be told apart once inserted.
#[derive(Debug, Default)]
pub struct Overlay {
    entries: HashMap<Key, Entry>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &[u8]) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Sets the key to `Present(value)`, replacing any earlier entry.
    pub fn put(&mut self, key: Key, value: Value) {
        self.entries.insert(key, Entry::Present(value));
    }

    /// Marks the key as deleted whether or not it exists anywhere.
    pub fn delete(&mut self, key: Key) {
        self.entries.insert(key, Entry::Deleted);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, Key, Entry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
