//! Index entries handed to the search engine

use std::sync::Arc;

use crate::entry::Entry;
use crate::store::EntryId;

/// A `(value, id)` pair, optionally carrying the already-fetched entry.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry<K> {
    pub key: K,
    pub id: EntryId,
    /// Set once the entry has been read from the master table
    pub entry: Option<Arc<Entry>>,
}

impl<K> IndexEntry<K> {
    pub fn new(key: K, id: EntryId) -> Self {
        Self {
            key,
            id,
            entry: None,
        }
    }

    /// Attaches the resolved entry
    pub fn with_entry(mut self, entry: Arc<Entry>) -> Self {
        self.entry = Some(entry);
        self
    }

    /// Reuses this entry for another tuple, dropping the cached entry
    pub fn reset(&mut self, key: K, id: EntryId) {
        self.key = key;
        self.id = id;
        self.entry = None;
    }

    /// Drops only the cached entry
    pub fn clear_entry(&mut self) {
        self.entry = None;
    }
}
