//! One index: a forward table (value -> ids) and a reverse table
//! (id -> values) kept in step.
//!
//! Values must already be normalized; the index never normalizes on its
//! own. For attribute indices the matching rule is resolved once, when the
//! index is created, and exposed through `normalize`.

use std::path::Path;

use super::cursor::{ForwardIndexCursor, ReverseIndexCursor};
use super::errors::{IndexError, IndexResult};
use super::IndexKey;
use crate::schema::{MatchingRule, SchemaError, SchemaRegistry, SchemaResult};
use crate::store::EntryId;
use crate::table::{BTreeTable, Storable, Table};

/// Forward/reverse index over keys of type `K`
#[derive(Debug, Clone)]
pub struct Index<K> {
    name: String,
    /// OID of the indexed attribute, or the system index name
    attribute: String,
    matching: Option<MatchingRule>,
    forward: BTreeTable<K, EntryId>,
    reverse: BTreeTable<EntryId, K>,
}

impl<K: Storable> Index<K> {
    /// Creates an in-memory index
    pub fn new(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            forward: BTreeTable::new(format!("{}.fwd", name), true),
            reverse: BTreeTable::new(format!("{}.rev", name), true),
            attribute: attribute.into(),
            matching: None,
            name,
        }
    }

    /// Opens the index tables in `dir`
    pub fn open(dir: &Path, name: impl Into<String>, attribute: impl Into<String>) -> IndexResult<Self> {
        let name = name.into();
        let forward = BTreeTable::open(dir, format!("{}.fwd", name), true)
            .map_err(|e| IndexError::build_failed(&name, e))?;
        let reverse = BTreeTable::open(dir, format!("{}.rev", name), true)
            .map_err(|e| IndexError::build_failed(&name, e))?;

        Ok(Self {
            forward,
            reverse,
            attribute: attribute.into(),
            matching: None,
            name,
        })
    }

    /// Returns true if both tables of index `name` exist in `dir`
    pub fn files_exist(dir: &Path, name: &str) -> bool {
        BTreeTable::<K, EntryId>::file_exists(dir, &format!("{}.fwd", name))
            && BTreeTable::<EntryId, K>::file_exists(dir, &format!("{}.rev", name))
    }

    /// Attaches the matching rule values are normalized with
    pub fn with_matching_rule(mut self, rule: MatchingRule) -> Self {
        self.matching = Some(rule);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn matching_rule(&self) -> Option<MatchingRule> {
        self.matching
    }

    /// Adds `(key, id)` to both tables.
    ///
    /// Returns false if the tuple was already present. If the reverse write
    /// fails the forward write is undone before the error is returned.
    pub fn add(&mut self, key: K, id: EntryId) -> IndexResult<bool> {
        let inserted = self
            .forward
            .put(key.clone(), id)
            .map_err(|e| IndexError::write_failed(&self.name, e))?;

        if let Err(e) = self.reverse.put(id, key.clone()) {
            if inserted {
                self.forward
                    .remove_value(&key, &id)
                    .map_err(|undo| IndexError::write_failed(&self.name, undo))?;
            }
            return Err(IndexError::write_failed(&self.name, e));
        }
        Ok(inserted)
    }

    /// Removes one `(key, id)` tuple from both tables
    pub fn drop_value(&mut self, key: &K, id: EntryId) -> IndexResult<bool> {
        let removed = self
            .reverse
            .remove_value(&id, key)
            .map_err(|e| IndexError::write_failed(&self.name, e))?;

        if let Err(e) = self.forward.remove_value(key, &id) {
            if removed {
                self.reverse
                    .put(id, key.clone())
                    .map_err(|undo| IndexError::write_failed(&self.name, undo))?;
            }
            return Err(IndexError::write_failed(&self.name, e));
        }
        Ok(removed)
    }

    /// Removes every tuple of `id`, returning the keys it had.
    pub fn drop(&mut self, id: EntryId) -> IndexResult<Vec<K>> {
        let keys = self.reverse.values(&id);
        let mut dropped = Vec::with_capacity(keys.len());
        for key in keys {
            match self.drop_value(&key, id) {
                Ok(_) => dropped.push(key),
                Err(e) => {
                    for key in dropped {
                        self.add(key, id)?;
                    }
                    return Err(e);
                }
            }
        }
        Ok(dropped)
    }

    /// First id holding `key`
    pub fn forward_lookup(&self, key: &K) -> Option<EntryId> {
        self.forward.get(key)
    }

    /// All ids holding `key`
    pub fn forward_values(&self, key: &K) -> Vec<EntryId> {
        self.forward.values(key)
    }

    /// First key of `id`
    pub fn reverse_lookup(&self, id: EntryId) -> Option<K> {
        self.reverse.get(&id)
    }

    /// All keys of `id`
    pub fn reverse_values(&self, id: EntryId) -> Vec<K> {
        self.reverse.values(&id)
    }

    pub fn has(&self, key: &K, id: EntryId) -> bool {
        self.forward.has_value(key, &id)
    }

    pub fn has_key(&self, key: &K) -> bool {
        self.forward.has(key)
    }

    /// Number of `(key, id)` tuples
    pub fn count(&self) -> usize {
        self.forward.count()
    }

    /// Number of ids holding `key`
    pub fn count_key(&self, key: &K) -> usize {
        self.forward.count_key(key)
    }

    pub fn greater_than_count(&self, key: &K) -> usize {
        self.forward.greater_than_count(key)
    }

    pub fn less_than_count(&self, key: &K) -> usize {
        self.forward.less_than_count(key)
    }

    pub fn is_count_exact(&self) -> bool {
        self.forward.is_count_exact()
    }

    /// Cursor over all tuples in key order
    pub fn forward_cursor(&self) -> ForwardIndexCursor<'_, K> {
        ForwardIndexCursor::new(self.forward.cursor())
    }

    /// Cursor over the ids holding exactly `key`
    pub fn forward_cursor_for(&self, key: &K) -> ForwardIndexCursor<'_, K> {
        ForwardIndexCursor::new(self.forward.cursor_for(key))
    }

    /// Cursor over all tuples in id order
    pub fn reverse_cursor(&self) -> ReverseIndexCursor<'_, K> {
        ReverseIndexCursor::new(self.reverse.cursor())
    }

    /// Cursor over the keys of one id
    pub fn reverse_cursor_for(&self, id: EntryId) -> ReverseIndexCursor<'_, K> {
        ReverseIndexCursor::new(self.reverse.cursor_for(&id))
    }

    /// All `(key, id)` tuples in key order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &EntryId)> {
        self.forward.iter()
    }

    /// Ids present in the reverse table
    pub fn ids(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.reverse.keys().copied()
    }

    /// Checks that every forward tuple has its reverse twin and vice versa
    pub fn verify_symmetry(&self) -> IndexResult<()> {
        if self.forward.count() != self.reverse.count() {
            return Err(IndexError::asymmetry(
                &self.name,
                format!(
                    "forward has {} tuples, reverse has {}",
                    self.forward.count(),
                    self.reverse.count()
                ),
            ));
        }
        for (key, id) in self.forward.iter() {
            if !self.reverse.has_value(id, key) {
                return Err(IndexError::asymmetry(
                    &self.name,
                    format!("({:?}, {}) has no reverse tuple", key, id),
                ));
            }
        }
        Ok(())
    }

    /// Removes every tuple
    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }

    pub fn sync(&mut self) -> IndexResult<()> {
        self.forward
            .sync()
            .map_err(|e| IndexError::write_failed(&self.name, e))?;
        self.reverse
            .sync()
            .map_err(|e| IndexError::write_failed(&self.name, e))
    }

    /// Fault injection: the reverse table fails after `writes` more writes
    pub fn set_write_budget(&mut self, writes: Option<usize>) {
        self.reverse.set_write_budget(writes);
    }
}

impl Index<IndexKey> {
    /// Normalizes a raw value with this index's matching rule
    pub fn normalize(&self, value: &str, schema: &SchemaRegistry) -> SchemaResult<IndexKey> {
        let rule = self
            .matching
            .ok_or_else(|| SchemaError::no_equality_rule(&self.attribute))?;
        rule.normalize(&self.attribute, value, schema)
    }
}
