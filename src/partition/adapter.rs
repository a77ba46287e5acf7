//! Partition backed by one entry store
//!
//! Translates DN-addressed operations into store calls. The store enforces
//! entry-level invariants; the adapter adds the namespace checks that only
//! make sense for a whole request, such as refusing to move an entry below
//! itself before the store is touched.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::context::{
    AddContext, DeleteContext, ListContext, LookupContext, ModifyContext, MoveAndRenameContext,
    MoveContext, RenameContext, SearchContext, SearchScope,
};
use super::cursor::{CandidateCursor, EntryCursor};
use crate::cursor::ListCursor;
use crate::dn::Dn;
use crate::entry::Entry;
use crate::index::IndexEntry;
use crate::observability::{Event, Logger};
use crate::schema::SchemaRegistry;
use crate::store::{EntryId, Store, StoreConfig, StoreError, StoreResult};

/// Directory operations on one naming context
pub trait Partition {
    fn id(&self) -> &str;

    /// Normalized suffix; empty before `init`
    fn suffix(&self) -> &Dn;

    fn init(&mut self) -> StoreResult<()>;

    /// Syncs and releases the partition. One-way.
    fn destroy(&mut self) -> StoreResult<()>;

    fn is_initialized(&self) -> bool;

    fn sync(&mut self) -> StoreResult<()>;

    fn add(&mut self, ctx: AddContext) -> StoreResult<EntryId>;

    fn delete(&mut self, ctx: &DeleteContext) -> StoreResult<()>;

    fn modify(&mut self, ctx: &ModifyContext) -> StoreResult<Entry>;

    fn rename(&mut self, ctx: &RenameContext) -> StoreResult<Dn>;

    fn move_entry(&mut self, ctx: &MoveContext) -> StoreResult<Dn>;

    fn move_and_rename(&mut self, ctx: &MoveAndRenameContext) -> StoreResult<Dn>;

    fn lookup(&self, ctx: &LookupContext) -> StoreResult<Option<Entry>>;

    fn has_entry(&self, dn: &Dn) -> StoreResult<bool>;

    /// Immediate children of an entry
    fn list(&self, ctx: &ListContext) -> StoreResult<EntryCursor<'_>>;

    fn search(&self, ctx: SearchContext) -> StoreResult<EntryCursor<'_>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Initialized,
    Destroyed,
}

/// `Partition` over an owned `Store`
pub struct StorePartition {
    store: Store,
    state: State,
}

impl StorePartition {
    pub fn new(config: StoreConfig, schema: Arc<SchemaRegistry>) -> Self {
        Self::from_store(Store::new(config, schema))
    }

    /// Wraps a store that has not been initialized yet
    pub fn from_store(store: Store) -> Self {
        Self {
            store,
            state: State::Uninitialized,
        }
    }

    /// Read access for the search engine: indices, counts, normalization
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Mutable access for configuration before `init`
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    fn check_initialized(&self) -> StoreResult<()> {
        match self.state {
            State::Initialized => Ok(()),
            State::Uninitialized => Err(StoreError::illegal_state(format!(
                "partition '{}' is not initialized",
                self.id()
            ))),
            State::Destroyed => Err(StoreError::illegal_state(format!(
                "partition '{}' has been destroyed",
                self.id()
            ))),
        }
    }

    /// Structural check on RDN sequences, before any store call
    fn check_not_below_itself(&self, dn: &Dn, new_superior: &Dn) -> StoreResult<()> {
        let dn = self.store.normalize_dn(dn)?;
        let new_superior = self.store.normalize_dn(new_superior)?;
        if new_superior.is_descendant_or_self(&dn) {
            self.store.metrics().increment_rejections();
            return Err(StoreError::unwilling(format!(
                "cannot move '{}' below itself or one of its descendants ('{}')",
                dn.up_name(),
                new_superior.up_name()
            ))
            .with_dn(dn.up_name()));
        }
        Ok(())
    }

    /// Replaces an alias base by its target
    fn dereference_base(&self, base_id: EntryId, base: &Dn) -> StoreResult<EntryId> {
        if !self.store.is_alias(base_id)? {
            return Ok(base_id);
        }
        let alias = self.store.fetch(base_id)?;
        let target = self.store.alias_target(base, alias.attributes())?;
        self.store.entry_id(&target)?.ok_or_else(|| {
            StoreError::alias_problem(base.up_name(), "the alias target does not exist")
        })
    }

    /// Candidates for a search that follows aliases below the base
    fn dereferenced_candidates(
        &self,
        base_id: EntryId,
        scope: SearchScope,
    ) -> StoreResult<ListCursor<IndexEntry<EntryId>>> {
        let indices = self.store.indices()?;
        let mut ids = BTreeSet::new();

        match scope {
            SearchScope::Base => {
                ids.insert(base_id);
            }
            SearchScope::OneLevel => {
                ids.extend(indices.one_level().forward_values(&base_id));
                ids.extend(indices.one_alias().forward_values(&base_id));
            }
            SearchScope::Subtree => {
                let mut visited = BTreeSet::new();
                let mut pending = vec![base_id];
                while let Some(root) = pending.pop() {
                    if !visited.insert(root) {
                        continue;
                    }
                    ids.extend(indices.sub_level().forward_values(&root));
                    pending.extend(indices.sub_alias().forward_values(&root));
                }
            }
        }

        Ok(ListCursor::new(
            ids.into_iter()
                .map(|id| IndexEntry::new(base_id, id))
                .collect(),
        ))
    }
}

impl Partition for StorePartition {
    fn id(&self) -> &str {
        &self.store.config().partition_id
    }

    fn suffix(&self) -> &Dn {
        self.store.suffix()
    }

    fn init(&mut self) -> StoreResult<()> {
        if self.state != State::Uninitialized {
            return Err(StoreError::illegal_state(format!(
                "partition '{}' already initialized",
                self.id()
            )));
        }
        self.store.init()?;
        self.state = State::Initialized;
        Ok(())
    }

    fn destroy(&mut self) -> StoreResult<()> {
        if self.state == State::Destroyed {
            return Err(StoreError::illegal_state(format!(
                "partition '{}' already destroyed",
                self.id()
            )));
        }
        let was_initialized = self.state == State::Initialized;
        self.state = State::Destroyed;
        if was_initialized {
            self.store.destroy()?;
        }
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.state == State::Initialized
    }

    fn sync(&mut self) -> StoreResult<()> {
        self.check_initialized()?;
        self.store.sync()
    }

    fn add(&mut self, ctx: AddContext) -> StoreResult<EntryId> {
        self.check_initialized()?;
        self.store.add(ctx.entry)
    }

    fn delete(&mut self, ctx: &DeleteContext) -> StoreResult<()> {
        self.check_initialized()?;
        let id = self.store.require_id(&ctx.dn)?;
        self.store.delete(id)
    }

    fn modify(&mut self, ctx: &ModifyContext) -> StoreResult<Entry> {
        self.check_initialized()?;
        self.store.modify(&ctx.dn, &ctx.modifications)
    }

    fn rename(&mut self, ctx: &RenameContext) -> StoreResult<Dn> {
        self.check_initialized()?;
        self.store.rename(&ctx.dn, &ctx.new_rdn, ctx.delete_old_rdn)
    }

    fn move_entry(&mut self, ctx: &MoveContext) -> StoreResult<Dn> {
        self.check_initialized()?;
        self.check_not_below_itself(&ctx.dn, &ctx.new_superior)?;
        self.store.move_entry(&ctx.dn, &ctx.new_superior)
    }

    fn move_and_rename(&mut self, ctx: &MoveAndRenameContext) -> StoreResult<Dn> {
        self.check_initialized()?;
        self.check_not_below_itself(&ctx.dn, &ctx.new_superior)?;
        self.store
            .move_and_rename(&ctx.dn, &ctx.new_superior, &ctx.new_rdn, ctx.delete_old_rdn)
    }

    fn lookup(&self, ctx: &LookupContext) -> StoreResult<Option<Entry>> {
        self.check_initialized()?;
        Ok(self
            .store
            .lookup_dn(&ctx.dn)?
            .map(|entry| entry.select(self.store.schema(), &ctx.attributes)))
    }

    fn has_entry(&self, dn: &Dn) -> StoreResult<bool> {
        self.check_initialized()?;
        self.store.has_entry(dn)
    }

    fn list(&self, ctx: &ListContext) -> StoreResult<EntryCursor<'_>> {
        self.check_initialized()?;
        let id = self.store.require_id(&ctx.dn)?;
        let children: CandidateCursor<'_> = Box::new(self.store.list(id)?);
        Ok(EntryCursor::new(&self.store, children))
    }

    fn search(&self, ctx: SearchContext) -> StoreResult<EntryCursor<'_>> {
        self.check_initialized()?;
        let base = self.store.normalize_dn(&ctx.base)?;
        let mut base_id = self.store.require_id(&base)?;
        if ctx.deref.finding_base() {
            base_id = self.dereference_base(base_id, &base)?;
        }

        let following = ctx.deref.in_searching() && ctx.scope != SearchScope::Base;
        let candidates: CandidateCursor<'_> = if following {
            Box::new(self.dereferenced_candidates(base_id, ctx.scope)?)
        } else {
            let indices = self.store.indices()?;
            match ctx.scope {
                SearchScope::Base => Box::new(ListCursor::singleton(IndexEntry::new(base_id, base_id))),
                SearchScope::OneLevel => Box::new(indices.one_level().forward_cursor_for(&base_id)),
                SearchScope::Subtree => Box::new(indices.sub_level().forward_cursor_for(&base_id)),
            }
        };

        Logger::trace(
            Event::SearchStarted.as_str(),
            &[
                ("base", &base.up_name()),
                ("scope", &format!("{:?}", ctx.scope)),
                ("deref", &format!("{:?}", ctx.deref)),
            ],
        );
        Ok(EntryCursor::new(&self.store, candidates)
            .with_evaluator(ctx.evaluator)
            .with_attributes(ctx.attributes)
            .with_size_limit(ctx.size_limit)
            .hiding_aliases(following))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{Cursor, CursorError};
    use crate::dn::Rdn;
    use crate::store::{IndexRow, StoreErrorCode};

    fn partition() -> StorePartition {
        let mut partition = StorePartition::new(
            StoreConfig::with_suffix("dc=example").index("ou"),
            Arc::new(SchemaRegistry::core()),
        );
        partition.init().unwrap();
        let schema = partition.store().schema().clone();
        for (dn, oc) in [
            ("dc=example", "domain"),
            ("ou=people,dc=example", "organizationalUnit"),
            ("cn=alice,ou=people,dc=example", "person"),
        ] {
            partition
                .add(AddContext::new(
                    Entry::from_pairs(&schema, dn, &[("objectClass", oc)]).unwrap(),
                ))
                .unwrap();
        }
        partition
    }

    fn dn(s: &str) -> Dn {
        Dn::parse(s).unwrap()
    }

    #[test]
    fn test_operations_need_init() {
        let partition = StorePartition::new(
            StoreConfig::with_suffix("dc=example"),
            Arc::new(SchemaRegistry::core()),
        );
        let err = partition.lookup(&LookupContext::new(dn("dc=example"))).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::IllegalState);
    }

    #[test]
    fn test_move_below_itself_rejected_before_store() {
        let mut partition = partition();
        let before = partition.store().indices().unwrap().rows();

        let err = partition
            .move_entry(&MoveContext::new(
                dn("ou=people,dc=example"),
                dn("cn=alice,ou=people,dc=example"),
            ))
            .unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::UnwillingToPerform);
        assert_eq!(partition.store().indices().unwrap().rows(), before);

        let err = partition
            .move_and_rename(&MoveAndRenameContext::new(
                dn("ou=people,dc=example"),
                dn("ou=people,dc=example"),
                Rdn::parse("ou=staff").unwrap(),
                false,
            ))
            .unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::UnwillingToPerform);
    }

    #[test]
    fn test_lookup_selects_attributes() {
        let partition = partition();
        let entry = partition
            .lookup(&LookupContext::new(dn("cn=alice,ou=people,dc=example")).with_attributes(&["cn"]))
            .unwrap()
            .unwrap();
        let schema = partition.store().schema();
        assert!(entry.get(schema, "cn").is_some());
        assert!(entry.get(schema, "objectClass").is_none());
    }

    #[test]
    fn test_list_children() {
        let partition = partition();
        let mut cursor = partition.list(&ListContext::new(dn("dc=example"))).unwrap();
        let names: Vec<String> = cursor
            .iter()
            .map(|e| e.unwrap().entry.unwrap().dn().up_name())
            .collect();
        assert_eq!(names, vec!["ou=people,dc=example".to_string()]);
    }

    #[test]
    fn test_search_fails_on_id_without_master_record() {
        let mut partition = partition();
        partition
            .store_mut()
            .tables_mut()
            .unwrap()
            .indices
            .add(&IndexRow::OneLevel(EntryId(1)), EntryId(99))
            .unwrap();

        let mut cursor = partition
            .search(SearchContext::new(dn("dc=example"), SearchScope::OneLevel))
            .unwrap();
        assert!(cursor.next().unwrap());
        match cursor.next() {
            Err(CursorError::Store(err)) => {
                assert_eq!(err.code(), StoreErrorCode::IntegrityViolation);
                assert!(err.message().contains("99"));
            }
            other => panic!("expected an integrity failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_destroy_is_one_way() {
        let mut partition = partition();
        partition.destroy().unwrap();
        assert!(!partition.is_initialized());
        assert!(partition.destroy().is_err());
        assert!(partition.init().is_err());
    }
}
