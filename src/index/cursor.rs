//! Cursors over one index, yielding `IndexEntry` values

use super::entry::IndexEntry;
use crate::cursor::{CloseCause, Cursor, CursorResult, TupleCursor};
use crate::store::EntryId;
use crate::table::{Storable, TableCursor};

/// Positioning by index value, shared by every cursor that walks index
/// entries in key order.
pub trait IndexCursor<K>: Cursor<Element = IndexEntry<K>> {
    /// Positions before the first entry whose key is at or above `key`
    fn before_key(&mut self, key: &K) -> CursorResult<()>;
    /// Positions after the last entry whose key is at or below `key`
    fn after_key(&mut self, key: &K) -> CursorResult<()>;
    /// Positions before `(key, id)`
    fn before_value(&mut self, key: &K, id: EntryId) -> CursorResult<()>;
    /// Positions after `(key, id)`
    fn after_value(&mut self, key: &K, id: EntryId) -> CursorResult<()>;
}

/// Walks the forward table: ordered by key, then id
pub struct ForwardIndexCursor<'i, K> {
    inner: TableCursor<'i, K, EntryId>,
}

impl<'i, K: Storable> ForwardIndexCursor<'i, K> {
    pub(crate) fn new(inner: TableCursor<'i, K, EntryId>) -> Self {
        Self { inner }
    }
}

impl<K: Storable> Cursor for ForwardIndexCursor<'_, K> {
    type Element = IndexEntry<K>;

    fn available(&self) -> bool {
        self.inner.available()
    }

    fn before_first(&mut self) -> CursorResult<()> {
        self.inner.before_first()
    }

    fn after_last(&mut self) -> CursorResult<()> {
        self.inner.after_last()
    }

    fn first(&mut self) -> CursorResult<bool> {
        self.inner.first()
    }

    fn last(&mut self) -> CursorResult<bool> {
        self.inner.last()
    }

    fn next(&mut self) -> CursorResult<bool> {
        self.inner.next()
    }

    fn previous(&mut self) -> CursorResult<bool> {
        self.inner.previous()
    }

    fn get(&self) -> CursorResult<IndexEntry<K>> {
        let tuple = self.inner.get()?;
        Ok(IndexEntry::new(tuple.key, tuple.value))
    }

    fn close_with_cause(&mut self, cause: Option<CloseCause>) -> CursorResult<()> {
        self.inner.close_with_cause(cause)
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl<K: Storable> IndexCursor<K> for ForwardIndexCursor<'_, K> {
    fn before_key(&mut self, key: &K) -> CursorResult<()> {
        self.inner.before_key(key)
    }

    fn after_key(&mut self, key: &K) -> CursorResult<()> {
        self.inner.after_key(key)
    }

    fn before_value(&mut self, key: &K, id: EntryId) -> CursorResult<()> {
        self.inner.before_value(key, &id)
    }

    fn after_value(&mut self, key: &K, id: EntryId) -> CursorResult<()> {
        self.inner.after_value(key, &id)
    }
}

/// Walks the reverse table: ordered by id, then key
pub struct ReverseIndexCursor<'i, K> {
    inner: TableCursor<'i, EntryId, K>,
}

impl<'i, K: Storable> ReverseIndexCursor<'i, K> {
    pub(crate) fn new(inner: TableCursor<'i, EntryId, K>) -> Self {
        Self { inner }
    }

    /// Positions before the first tuple of `id`
    pub fn before_id(&mut self, id: EntryId) -> CursorResult<()> {
        self.inner.before_key(&id)
    }

    /// Positions after the last tuple of `id`
    pub fn after_id(&mut self, id: EntryId) -> CursorResult<()> {
        self.inner.after_key(&id)
    }

    /// Positions before `(id, key)`
    pub fn before_value(&mut self, id: EntryId, key: &K) -> CursorResult<()> {
        self.inner.before_value(&id, key)
    }
}

impl<K: Storable> Cursor for ReverseIndexCursor<'_, K> {
    type Element = IndexEntry<K>;

    fn available(&self) -> bool {
        self.inner.available()
    }

    fn before_first(&mut self) -> CursorResult<()> {
        self.inner.before_first()
    }

    fn after_last(&mut self) -> CursorResult<()> {
        self.inner.after_last()
    }

    fn first(&mut self) -> CursorResult<bool> {
        self.inner.first()
    }

    fn last(&mut self) -> CursorResult<bool> {
        self.inner.last()
    }

    fn next(&mut self) -> CursorResult<bool> {
        self.inner.next()
    }

    fn previous(&mut self) -> CursorResult<bool> {
        self.inner.previous()
    }

    fn get(&self) -> CursorResult<IndexEntry<K>> {
        let tuple = self.inner.get()?;
        Ok(IndexEntry::new(tuple.value, tuple.key))
    }

    fn close_with_cause(&mut self, cause: Option<CloseCause>) -> CursorResult<()> {
        self.inner.close_with_cause(cause)
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}
