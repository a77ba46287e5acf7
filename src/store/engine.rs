//! The store: one master table, the system indices and the user indices
//! of a single partition.
//!
//! # Lifecycle
//!
//! ```text
//! Created --init()--> Initialized --destroy()--> Destroyed
//! ```
//!
//! Structural properties (suffix, working directory, cache size, user
//! indices) can only change while `Created`. Every read and write needs
//! `Initialized`.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use super::config::{IndexConfig, StoreConfig};
use super::errors::{StoreError, StoreResult};
use super::id::EntryId;
use super::indices::SystemIndices;
use super::master::{MasterRecord, MasterTable};
use super::ops::WriteSet;
use crate::cursor::ListCursor;
use crate::dn::Dn;
use crate::entry::{CsnFactory, Entry};
use crate::index::{ForwardIndexCursor, Index, IndexEntry, IndexError, IndexKey};
use crate::observability::{Event, Logger, MetricsRegistry, ObservationScope};
use crate::schema::{MatchingRule, SchemaRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Initialized,
    Destroyed,
}

#[derive(Debug)]
pub(crate) struct Tables {
    pub(crate) master: MasterTable,
    pub(crate) indices: SystemIndices,
}

/// Where an entry sits: its record, full DN and ancestor ids
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    pub(crate) id: EntryId,
    pub(crate) record: MasterRecord,
    /// Normalized
    pub(crate) dn: Dn,
    /// Parent first, context entry last; empty for the context entry
    pub(crate) ancestors: Vec<EntryId>,
}

/// Indexed entry store for one partition
#[derive(Debug)]
pub struct Store {
    pub(crate) config: StoreConfig,
    pub(crate) schema: Arc<SchemaRegistry>,
    state: State,
    /// Normalized, set by `init`
    pub(crate) suffix: Dn,
    pub(crate) tables: Option<Tables>,
    pub(crate) csn: CsnFactory,
    pub(crate) metrics: Arc<MetricsRegistry>,
    /// Remaining writes before injected failures start
    fault_budget: Option<usize>,
}

impl Store {
    pub fn new(config: StoreConfig, schema: Arc<SchemaRegistry>) -> Self {
        Self {
            config,
            schema,
            state: State::Created,
            suffix: Dn::root(),
            tables: None,
            csn: CsnFactory::new(0),
            metrics: Arc::new(MetricsRegistry::new()),
            fault_budget: None,
        }
    }

    // ==================================================================
    // Configuration
    // ==================================================================

    /// Fails once the store has been initialized
    fn protect(&self, property: &str) -> StoreResult<()> {
        if self.state != State::Created {
            return Err(StoreError::illegal_state(format!(
                "property '{}' cannot change after init",
                property
            )));
        }
        Ok(())
    }

    pub fn set_suffix(&mut self, suffix: impl Into<String>) -> StoreResult<()> {
        self.protect("suffix")?;
        self.config.suffix = suffix.into();
        Ok(())
    }

    pub fn set_working_directory(&mut self, dir: impl Into<PathBuf>) -> StoreResult<()> {
        self.protect("working_directory")?;
        self.config.working_directory = Some(dir.into());
        Ok(())
    }

    pub fn set_cache_size(&mut self, cache_size: usize) -> StoreResult<()> {
        self.protect("cache_size")?;
        self.config.cache_size = cache_size;
        Ok(())
    }

    /// Adds a user index
    pub fn add_index(&mut self, index: IndexConfig) -> StoreResult<()> {
        self.protect("indexed_attributes")?;
        self.config.indexed_attributes.push(index);
        Ok(())
    }

    /// Not structural; may change at any time
    pub fn set_sync_on_write(&mut self, sync_on_write: bool) {
        self.config.sync_on_write = sync_on_write;
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn schema(&self) -> &Arc<SchemaRegistry> {
        &self.schema
    }

    /// Normalized suffix; the root DN before `init`
    pub fn suffix(&self) -> &Dn {
        &self.suffix
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn is_initialized(&self) -> bool {
        self.state == State::Initialized
    }

    /// Fault injection: the write set op after `writes` more ops fails.
    pub fn fail_after_writes(&mut self, writes: Option<usize>) {
        self.fault_budget = writes;
    }

    // ==================================================================
    // Lifecycle
    // ==================================================================

    /// Opens the tables, then verifies them and rebuilds the indices from
    /// the master table if anything is missing or inconsistent.
    pub fn init(&mut self) -> StoreResult<()> {
        if self.state != State::Created {
            return Err(StoreError::illegal_state("store already initialized"));
        }

        let scope = ObservationScope::with_fields(
            Event::StoreInit,
            &[("partition", self.config.partition_id.as_str())],
        );

        let missing_indices = match self.open_tables() {
            Ok(missing) => missing,
            Err(e) => {
                scope.fail(e.message());
                return Err(e);
            }
        };
        self.state = State::Initialized;

        let needs_rebuild = missing_indices || self.verify().is_err();
        if needs_rebuild {
            if let Err(e) = self.rebuild_indices() {
                scope.fail_fatal(e.message());
                return Err(e);
            }
        }

        let count = self.count()?;
        self.metrics.set_entries(count as u64);
        scope.complete_with_fields(&[
            ("suffix", &self.suffix.up_name()),
            ("entries", &count.to_string()),
            ("rebuilt", if needs_rebuild { "true" } else { "false" }),
        ]);
        Ok(())
    }

    /// Returns true if the master table exists but some index table does not
    fn open_tables(&mut self) -> StoreResult<bool> {
        if self.config.suffix.trim().is_empty() {
            return Err(StoreError::invalid_config("a suffix is required"));
        }
        self.suffix = Dn::parse(&self.config.suffix)?.normalize(&self.schema)?;
        let user = self.resolve_user_indices()?;
        let suffix = self.suffix.norm_name();

        let (tables, missing) = match &self.config.working_directory {
            Some(dir) => {
                fs::create_dir_all(dir).map_err(|e| {
                    StoreError::write_failed(format!("cannot create {}", dir.display()), e)
                })?;
                let missing =
                    MasterTable::exists(dir) && SystemIndices::files_missing(dir, &user);
                let tables = Tables {
                    master: MasterTable::open(dir, &suffix)?,
                    indices: SystemIndices::open(Some(dir), &user)?,
                };
                (tables, missing)
            }
            None => {
                let tables = Tables {
                    master: MasterTable::new(&suffix),
                    indices: SystemIndices::open(None, &user)?,
                };
                (tables, false)
            }
        };
        self.tables = Some(tables);
        Ok(missing)
    }

    /// `(oid, equality rule)` of every configured user index
    fn resolve_user_indices(&self) -> StoreResult<Vec<(String, MatchingRule)>> {
        let mut user: Vec<(String, MatchingRule)> = Vec::new();
        for index in &self.config.indexed_attributes {
            let at = self.schema.lookup(&index.attribute)?;
            let rule = at
                .equality
                .ok_or_else(|| IndexError::not_indexable(at.name()))?;
            if !user.iter().any(|(oid, _)| *oid == at.oid) {
                user.push((at.oid.clone(), rule));
            }
        }
        Ok(user)
    }

    /// Writes every table to the working directory
    pub fn sync(&mut self) -> StoreResult<()> {
        let tables = self.tables_mut()?;
        tables.master.sync()?;
        tables.indices.sync()?;
        self.metrics.increment_syncs();
        Logger::trace(Event::StoreSync.as_str(), &[]);
        Ok(())
    }

    /// Syncs and releases the tables. One-way.
    pub fn destroy(&mut self) -> StoreResult<()> {
        match self.state {
            State::Destroyed => Err(StoreError::illegal_state("store already destroyed")),
            State::Created => {
                self.state = State::Destroyed;
                Ok(())
            }
            State::Initialized => {
                self.sync()?;
                self.tables = None;
                self.state = State::Destroyed;
                Logger::info(
                    Event::StoreDestroyed.as_str(),
                    &[("partition", &self.config.partition_id)],
                );
                Ok(())
            }
        }
    }

    // ==================================================================
    // Internal access
    // ==================================================================

    pub(crate) fn tables(&self) -> StoreResult<&Tables> {
        match (&self.state, &self.tables) {
            (State::Initialized, Some(tables)) => Ok(tables),
            _ => Err(StoreError::illegal_state("store is not initialized")),
        }
    }

    pub(crate) fn tables_mut(&mut self) -> StoreResult<&mut Tables> {
        match (&self.state, &mut self.tables) {
            (State::Initialized, Some(tables)) => Ok(tables),
            _ => Err(StoreError::illegal_state("store is not initialized")),
        }
    }

    /// Applies a write set, counting rollbacks
    pub(crate) fn commit(&mut self, set: WriteSet) -> StoreResult<()> {
        let tables = match (&self.state, &mut self.tables) {
            (State::Initialized, Some(tables)) => tables,
            _ => return Err(StoreError::illegal_state("store is not initialized")),
        };
        set.apply(&mut tables.master, &mut tables.indices, &mut self.fault_budget)
            .inspect_err(|_| self.metrics.increment_rollbacks())?;

        if self.config.sync_on_write {
            self.sync()?;
        }
        Ok(())
    }

    pub(crate) fn normalize_dn(&self, dn: &Dn) -> StoreResult<Dn> {
        Ok(dn.normalize(&self.schema)?)
    }

    /// DN and ancestor ids of `id`, following parent links in the master
    /// table.
    pub(crate) fn walk(&self, id: EntryId) -> StoreResult<(Dn, Vec<EntryId>)> {
        let tables = self.tables()?;
        let mut rdns = Vec::new();
        let mut ancestors = Vec::new();
        let mut current = id;

        loop {
            let record = tables.master.get(current).ok_or_else(|| {
                if current == id {
                    StoreError::no_such_id(id)
                } else {
                    StoreError::integrity(format!("entry {} has no ancestor {}", id, current))
                }
            })?;
            rdns.extend(record.parent.rdns().iter().cloned());
            if record.parent.is_context() {
                break;
            }
            current = record.parent.parent_id();
            if ancestors.len() > tables.master.count() {
                return Err(StoreError::integrity(format!(
                    "parent links of entry {} form a cycle",
                    id
                )));
            }
            ancestors.push(current);
        }
        Ok((Dn::from_normalized(rdns), ancestors))
    }

    pub(crate) fn layout(&self, id: EntryId) -> StoreResult<Layout> {
        let record = self
            .tables()?
            .master
            .get(id)
            .ok_or_else(|| StoreError::no_such_id(id))?;
        let (dn, ancestors) = self.walk(id)?;
        Ok(Layout {
            id,
            record,
            dn,
            ancestors,
        })
    }

    // ==================================================================
    // Reads
    // ==================================================================

    /// Id of the entry at `dn`
    pub fn entry_id(&self, dn: &Dn) -> StoreResult<Option<EntryId>> {
        let ndn = self.normalize_dn(dn)?.norm_name();
        Ok(self.tables()?.indices.ndn().forward_lookup(&ndn))
    }

    /// Like `entry_id`, failing with `XDBM_NO_SUCH_OBJECT`
    pub fn require_id(&self, dn: &Dn) -> StoreResult<EntryId> {
        self.entry_id(dn)?
            .ok_or_else(|| StoreError::no_such_object(dn.up_name()))
    }

    pub fn has_entry(&self, dn: &Dn) -> StoreResult<bool> {
        Ok(self.entry_id(dn)?.is_some())
    }

    /// Parent of `id`; `None` for the context entry
    pub fn parent_id(&self, id: EntryId) -> StoreResult<Option<EntryId>> {
        let key = self
            .tables()?
            .indices
            .rdn()
            .reverse_lookup(id)
            .ok_or_else(|| StoreError::no_such_id(id))?;
        Ok((!key.is_context()).then(|| key.parent_id()))
    }

    /// Parent of the entry at `dn`
    pub fn parent_id_of(&self, dn: &Dn) -> StoreResult<Option<EntryId>> {
        let id = self.require_id(dn)?;
        self.parent_id(id)
    }

    /// Normalized DN of `id`
    pub fn entry_dn(&self, id: EntryId) -> StoreResult<Dn> {
        Ok(self.walk(id)?.0)
    }

    /// A copy of the entry
    pub fn lookup(&self, id: EntryId) -> StoreResult<Option<Entry>> {
        let Some(record) = self.tables()?.master.get(id) else {
            return Ok(None);
        };
        let dn = self.entry_dn(id)?;
        Ok(Some(Entry::from_parts(dn, record.attributes)))
    }

    /// Like `lookup`, failing with `XDBM_NO_SUCH_OBJECT`
    pub fn fetch(&self, id: EntryId) -> StoreResult<Entry> {
        self.lookup(id)?.ok_or_else(|| StoreError::no_such_id(id))
    }

    pub fn lookup_dn(&self, dn: &Dn) -> StoreResult<Option<Entry>> {
        match self.entry_id(dn)? {
            Some(id) => self.lookup(id),
            None => Ok(None),
        }
    }

    /// Number of live entries
    pub fn count(&self) -> StoreResult<usize> {
        Ok(self.tables()?.master.count())
    }

    /// Number of immediate children
    pub fn child_count(&self, id: EntryId) -> StoreResult<usize> {
        Ok(self.tables()?.indices.one_level().count_key(&id))
    }

    /// Number of descendants, not counting the entry itself
    pub fn subtree_count(&self, id: EntryId) -> StoreResult<usize> {
        let rows = self.tables()?.indices.sub_level().count_key(&id);
        Ok(rows.saturating_sub(1))
    }

    /// Children of `id` in id order
    pub fn list(&self, id: EntryId) -> StoreResult<ForwardIndexCursor<'_, EntryId>> {
        Ok(self.tables()?.indices.one_level().forward_cursor_for(&id))
    }

    /// Every entry, already resolved, for scans no index can answer
    pub fn entries(&self) -> StoreResult<ListCursor<IndexEntry<EntryId>>> {
        let master = &self.tables()?.master;
        let mut elements = Vec::with_capacity(master.count());
        for id in master.ids() {
            let entry = self.fetch(id)?;
            elements.push(IndexEntry::new(id, id).with_entry(Arc::new(entry)));
        }
        Ok(ListCursor::new(elements))
    }

    /// Normalizes a value the way the attribute's index stores it
    pub fn normalize(&self, attribute: &str, value: &str) -> StoreResult<IndexKey> {
        Ok(self.schema.normalize(attribute, value)?)
    }

    /// The user index on `attribute`.
    ///
    /// `XDBM_INDEX_NOT_FOUND` is recoverable: the caller scans instead.
    pub fn user_index(&self, attribute: &str) -> StoreResult<&Index<IndexKey>> {
        let oid = self.schema.oid_of(attribute)?;
        self.tables()?
            .indices
            .user(&oid)
            .ok_or_else(|| IndexError::not_found(attribute).into())
    }

    pub fn has_user_index(&self, attribute: &str) -> bool {
        self.user_index(attribute).is_ok()
    }

    /// System and user indices, for the search engine
    pub fn indices(&self) -> StoreResult<&SystemIndices> {
        Ok(&self.tables()?.indices)
    }

    /// True if `id` is an alias entry
    pub fn is_alias(&self, id: EntryId) -> StoreResult<bool> {
        Ok(self.tables()?.indices.alias().reverse_lookup(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreErrorCode;

    fn store() -> Store {
        Store::new(
            StoreConfig::with_suffix("dc=example").index("ou"),
            Arc::new(SchemaRegistry::core()),
        )
    }

    #[test]
    fn test_reads_need_init() {
        let store = store();
        let err = store.count().unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::IllegalState);
    }

    #[test]
    fn test_protected_properties() {
        let mut store = store();
        store.set_cache_size(50).unwrap();
        store.init().unwrap();

        assert!(store.set_cache_size(10).unwrap_err().is_fatal());
        assert!(store.set_suffix("dc=other").is_err());
        assert!(store.add_index(IndexConfig::new("uid")).is_err());
        assert_eq!(store.config().cache_size, 50);
        // not structural
        store.set_sync_on_write(true);
    }

    #[test]
    fn test_lifecycle_is_one_way() {
        let mut store = store();
        store.init().unwrap();
        assert!(store.init().is_err());

        store.destroy().unwrap();
        assert!(!store.is_initialized());
        assert!(store.destroy().is_err());
        assert!(store.count().is_err());
    }

    #[test]
    fn test_missing_suffix_rejected() {
        let mut store = Store::new(StoreConfig::default(), Arc::new(SchemaRegistry::core()));
        assert_eq!(store.init().unwrap_err().code(), StoreErrorCode::InvalidConfig);
    }

    #[test]
    fn test_unindexable_attribute_rejected() {
        let mut store = Store::new(
            StoreConfig::with_suffix("dc=example").index("jpegPhoto"),
            Arc::new(SchemaRegistry::core()),
        );
        let err = store.init().unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::InappropriateMatching);
        assert!(err.message().contains("jpegPhoto"));
    }

    #[test]
    fn test_user_index_lookup() {
        let mut store = store();
        store.init().unwrap();

        assert!(store.has_user_index("OU"));
        assert_eq!(store.user_index("ou").unwrap().attribute(), "2.5.4.11");

        let err = store.user_index("mail").unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::IndexNotFound);
        assert!(err.is_recoverable());
    }
}
