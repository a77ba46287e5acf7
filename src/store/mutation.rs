//! Mutating operations
//!
//! Each operation runs in two phases. `prepare_*` validates the request
//! and computes the full write set while the store is only borrowed
//! shared; nothing is written if it fails. `commit` then applies the set,
//! rolling back on partial failure.

use std::collections::BTreeSet;

use uuid::Uuid;

use super::alias::is_alias;
use super::engine::{Layout, Store};
use super::errors::{Severity, StoreError, StoreErrorCode, StoreResult};
use super::id::{EntryId, ParentIdAndRdn};
use super::indices::Row;
use super::master::MasterRecord;
use super::ops::WriteSet;
use super::rows::Resolver;
use crate::dn::{Dn, Rdn};
use crate::entry::{Entry, Modification};
use crate::observability::{Event, Logger};
use crate::schema::{ENTRY_CSN_OID, ENTRY_UUID_OID};

/// Drops rows only in `before`, then adds rows only in `after`
fn diff(set: &mut WriteSet, before: &BTreeSet<Row>, after: &BTreeSet<Row>) {
    set.drop_rows(before.difference(after));
    set.add_rows(after.difference(before));
}

impl Store {
    /// Adds an entry below an existing parent, or the context entry itself.
    ///
    /// Missing RDN values are added to the entry; `entryUUID` is generated
    /// when absent and `entryCSN` is always stamped.
    pub fn add(&mut self, entry: Entry) -> StoreResult<EntryId> {
        let (id, dn, set) = self.prepare_add(entry).map_err(|e| self.rejected(e))?;
        self.consume_id(id);
        self.commit(set)?;

        self.metrics.increment_adds();
        Logger::info(
            Event::EntryAdded.as_str(),
            &[("id", &id.to_string()), ("dn", &dn.up_name())],
        );
        Ok(id)
    }

    /// Deletes a leaf entry
    pub fn delete(&mut self, id: EntryId) -> StoreResult<()> {
        let (dn, set) = self.prepare_delete(id).map_err(|e| self.rejected(e))?;
        self.commit(set)?;

        self.metrics.increment_deletes();
        Logger::info(
            Event::EntryDeleted.as_str(),
            &[("id", &id.to_string()), ("dn", &dn.up_name())],
        );
        Ok(())
    }

    /// Applies modifications, returning the updated entry
    pub fn modify(&mut self, dn: &Dn, mods: &[Modification]) -> StoreResult<Entry> {
        let (entry, set) = self
            .prepare_modify(dn, mods)
            .map_err(|e| self.rejected(e))?;
        let changed = set.len();
        self.commit(set)?;

        self.metrics.increment_modifies();
        Logger::info(
            Event::EntryModified.as_str(),
            &[("dn", &entry.dn().up_name()), ("writes", &changed.to_string())],
        );
        Ok(entry)
    }

    /// Gives the entry a new RDN under the same parent
    pub fn rename(&mut self, dn: &Dn, new_rdn: &Rdn, delete_old_rdn: bool) -> StoreResult<Dn> {
        self.relocate(dn, None, Some(new_rdn), delete_old_rdn)
    }

    /// Moves the entry and its subtree below `new_parent`
    pub fn move_entry(&mut self, dn: &Dn, new_parent: &Dn) -> StoreResult<Dn> {
        self.relocate(dn, Some(new_parent), None, false)
    }

    pub fn move_and_rename(
        &mut self,
        dn: &Dn,
        new_parent: &Dn,
        new_rdn: &Rdn,
        delete_old_rdn: bool,
    ) -> StoreResult<Dn> {
        self.relocate(dn, Some(new_parent), Some(new_rdn), delete_old_rdn)
    }

    fn relocate(
        &mut self,
        dn: &Dn,
        new_parent: Option<&Dn>,
        new_rdn: Option<&Rdn>,
        delete_old_rdn: bool,
    ) -> StoreResult<Dn> {
        let (old_dn, new_dn, moved, set) = self
            .prepare_relocate(dn, new_parent, new_rdn, delete_old_rdn)
            .map_err(|e| self.rejected(e))?;
        self.commit(set)?;

        self.metrics.increment_relocations();
        Logger::info(
            Event::EntryRelocated.as_str(),
            &[
                ("from", &old_dn.up_name()),
                ("to", &new_dn.up_name()),
                ("entries", &moved.to_string()),
            ],
        );
        Ok(new_dn)
    }

    fn rejected(&self, err: StoreError) -> StoreError {
        if err.severity() == Severity::Reject {
            self.metrics.increment_rejections();
        }
        err
    }

    fn consume_id(&mut self, id: EntryId) {
        if let Some(tables) = self.tables.as_mut() {
            tables.master.commit_id(id);
        }
    }

    fn stamp_csn(&self, entry: &mut Entry) -> StoreResult<()> {
        let csn = self.csn.next().to_string();
        entry.set_operational(&self.schema, ENTRY_CSN_OID, &csn)?;
        Ok(())
    }

    /// Alias rows of several aliases under one resolver
    fn alias_rows_of(&self, aliases: &[EntryId], resolve: &Resolver<'_>) -> StoreResult<BTreeSet<Row>> {
        let mut rows = BTreeSet::new();
        for alias in aliases {
            let layout = self.layout(*alias)?;
            rows.extend(self.alias_rows(&layout, resolve)?);
        }
        Ok(rows)
    }

    fn prepare_add(&self, entry: Entry) -> StoreResult<(EntryId, Dn, WriteSet)> {
        let dn = self.normalize_dn(entry.dn())?;
        if !dn.is_descendant_or_self(&self.suffix) {
            return Err(StoreError::new(
                StoreErrorCode::NoSuchObject,
                format!(
                    "'{}' is outside partition '{}'",
                    dn.up_name(),
                    self.suffix.up_name()
                ),
            )
            .with_dn(dn.up_name()));
        }

        let tables = self.tables()?;
        let current = |target: &Dn| tables.indices.ndn().forward_lookup(&target.norm_name());
        if current(&dn).is_some() {
            return Err(StoreError::already_exists(dn.up_name()));
        }

        let (parent, ancestors) = if dn == self.suffix {
            (ParentIdAndRdn::new(EntryId::ROOT, dn.rdns().to_vec()), Vec::new())
        } else {
            let parent_dn = dn.parent().unwrap_or_default();
            let parent_id =
                current(&parent_dn).ok_or_else(|| StoreError::no_such_object(parent_dn.up_name()))?;
            if self.is_alias(parent_id)? {
                return Err(StoreError::alias_problem(
                    parent_dn.up_name(),
                    "entries cannot be added below an alias",
                ));
            }
            let (_, mut ancestors) = self.walk(parent_id)?;
            ancestors.insert(0, parent_id);
            let rdn = dn.rdns()[0].clone();
            (ParentIdAndRdn::child(parent_id, rdn), ancestors)
        };

        let mut entry = entry;
        entry.set_dn(dn.clone());
        if let Some(rdn) = dn.rdn() {
            entry.ensure_rdn_values(&self.schema, rdn)?;
        }
        entry.check_object_class()?;
        entry.check_single_values(&self.schema)?;
        if entry.get(&self.schema, ENTRY_UUID_OID).is_none() {
            let uuid = Uuid::new_v4().to_string();
            entry.set_operational(&self.schema, ENTRY_UUID_OID, &uuid)?;
        }
        self.stamp_csn(&mut entry)?;

        if entry.is_alias() {
            self.check_not_targeted(&dn, None)?;
            self.check_alias(&dn, entry.attributes(), &current)?;
        }

        let id = tables.master.peek_id();
        let after = |target: &Dn| {
            if *target == dn {
                Some(id)
            } else {
                current(target)
            }
        };

        let layout = Layout {
            id,
            record: MasterRecord {
                parent,
                attributes: entry.into_attributes(),
            },
            dn: dn.clone(),
            ancestors,
        };

        // aliases left dangling earlier resolve to the new entry
        let targeting = self.aliases_targeting(&dn)?;
        let before = self.alias_rows_of(&targeting, &current)?;
        let mut rows = self.entry_rows(&layout, &after)?;
        rows.extend(self.alias_rows_of(&targeting, &after)?);

        let mut set = WriteSet::new();
        set.put_master(id, layout.record);
        diff(&mut set, &before, &rows);
        Ok((id, dn, set))
    }

    fn prepare_delete(&self, id: EntryId) -> StoreResult<(Dn, WriteSet)> {
        let layout = self.layout(id)?;
        let children = self.child_count(id)?;
        if children > 0 {
            return Err(StoreError::not_leaf(layout.dn.up_name(), children));
        }

        let tables = self.tables()?;
        let current = |target: &Dn| tables.indices.ndn().forward_lookup(&target.norm_name());
        let after = |target: &Dn| {
            if *target == layout.dn {
                None
            } else {
                current(target)
            }
        };

        let targeting: Vec<EntryId> = self
            .aliases_targeting(&layout.dn)?
            .into_iter()
            .filter(|alias| *alias != id)
            .collect();
        let mut before = self.entry_rows(&layout, &current)?;
        before.extend(self.alias_rows_of(&targeting, &current)?);
        let remaining = self.alias_rows_of(&targeting, &after)?;

        let mut set = WriteSet::new();
        diff(&mut set, &before, &remaining);
        set.remove_master(id);
        Ok((layout.dn, set))
    }

    fn prepare_modify(&self, dn: &Dn, mods: &[Modification]) -> StoreResult<(Entry, WriteSet)> {
        let id = self.require_id(dn)?;
        let layout = self.layout(id)?;

        let mut entry = Entry::from_parts(layout.dn.clone(), layout.record.attributes.clone());
        entry.apply(&self.schema, mods)?;
        self.stamp_csn(&mut entry)?;

        let tables = self.tables()?;
        let current = |target: &Dn| tables.indices.ndn().forward_lookup(&target.norm_name());
        if entry.is_alias() {
            let children = self.child_count(id)?;
            if children > 0 {
                return Err(StoreError::alias_problem(
                    layout.dn.up_name(),
                    "an entry with children cannot be an alias",
                ));
            }
            self.check_not_targeted(&layout.dn, Some(id))?;
            self.check_alias(&layout.dn, entry.attributes(), &current)?;
        }

        let updated = Layout {
            record: MasterRecord {
                parent: layout.record.parent.clone(),
                attributes: entry.attributes().clone(),
            },
            ..layout.clone()
        };
        let before = self.entry_rows(&layout, &current)?;
        let after = self.entry_rows(&updated, &current)?;

        let mut set = WriteSet::new();
        set.put_master(id, updated.record);
        diff(&mut set, &before, &after);
        Ok((entry, set))
    }

    /// Rename, move, or both.
    ///
    /// Children keep their master records, which reference the parent by
    /// id, but every DN, containment and alias row of the moved subtree is
    /// recomputed.
    fn prepare_relocate(
        &self,
        dn: &Dn,
        new_parent: Option<&Dn>,
        new_rdn: Option<&Rdn>,
        delete_old_rdn: bool,
    ) -> StoreResult<(Dn, Dn, usize, WriteSet)> {
        let id = self.require_id(dn)?;
        let layout = self.layout(id)?;
        let old_dn = layout.dn.clone();
        if layout.record.parent.is_context() {
            return Err(StoreError::unwilling(format!(
                "the context entry '{}' cannot be renamed or moved",
                old_dn.up_name()
            )));
        }

        let tables = self.tables()?;
        let current = |target: &Dn| tables.indices.ndn().forward_lookup(&target.norm_name());

        let (parent_id, parent_dn, new_ancestors) = match new_parent {
            Some(parent) => {
                let parent_dn = self.normalize_dn(parent)?;
                if parent_dn.is_descendant_or_self(&old_dn) {
                    return Err(StoreError::unwilling(format!(
                        "cannot move '{}' below itself",
                        old_dn.up_name()
                    )));
                }
                let parent_id = current(&parent_dn)
                    .ok_or_else(|| StoreError::no_such_object(parent_dn.up_name()))?;
                if self.is_alias(parent_id)? {
                    return Err(StoreError::alias_problem(
                        parent_dn.up_name(),
                        "entries cannot be moved below an alias",
                    ));
                }
                let (_, mut ancestors) = self.walk(parent_id)?;
                ancestors.insert(0, parent_id);
                (parent_id, parent_dn, ancestors)
            }
            None => (
                layout.record.parent.parent_id(),
                old_dn.parent().unwrap_or_default(),
                layout.ancestors.clone(),
            ),
        };

        let old_rdn = old_dn.rdns()[0].clone();
        let new_rdn = match new_rdn {
            Some(rdn) => rdn.normalize(&self.schema)?,
            None => old_rdn.clone(),
        };
        let mut rdns = vec![new_rdn.clone()];
        rdns.extend(parent_dn.rdns().iter().cloned());
        let new_dn = Dn::from_normalized(rdns);
        if current(&new_dn).is_some_and(|existing| existing != id) {
            return Err(StoreError::already_exists(new_dn.up_name()));
        }

        let mut entry = Entry::from_parts(new_dn.clone(), layout.record.attributes.clone());
        if delete_old_rdn {
            entry.remove_rdn_values(&self.schema, &old_rdn)?;
        }
        entry.ensure_rdn_values(&self.schema, &new_rdn)?;
        entry.check_object_class()?;
        entry.check_single_values(&self.schema)?;
        self.stamp_csn(&mut entry)?;
        let root_record = MasterRecord {
            parent: ParentIdAndRdn::child(parent_id, new_rdn),
            attributes: entry.into_attributes(),
        };

        // below new_dn, subtree members are still indexed under old_dn
        let after = |target: &Dn| {
            if target.is_descendant_or_self(&new_dn) {
                target
                    .rebase(&new_dn, &old_dn)
                    .ok()
                    .and_then(|old| current(&old))
            } else if target.is_descendant_or_self(&old_dn) {
                None
            } else {
                current(target)
            }
        };

        let subtree = tables.indices.sub_level().forward_values(&id);
        let mut before = BTreeSet::new();
        let mut after_rows = BTreeSet::new();
        let mut targeting = BTreeSet::new();

        for member in &subtree {
            let (old, moved) = if *member == id {
                let moved = Layout {
                    id,
                    record: root_record.clone(),
                    dn: new_dn.clone(),
                    ancestors: new_ancestors.clone(),
                };
                (layout.clone(), moved)
            } else {
                let old = self.layout(*member)?;
                let depth = old.ancestors.iter().position(|a| *a == id).ok_or_else(|| {
                    StoreError::integrity(format!("entry {} is indexed below {}", member, id))
                })?;
                let mut ancestors = old.ancestors[..=depth].to_vec();
                ancestors.extend(new_ancestors.iter().copied());
                let moved = Layout {
                    id: *member,
                    record: old.record.clone(),
                    dn: old.dn.rebase(&old_dn, &new_dn)?,
                    ancestors,
                };
                (old, moved)
            };

            if is_alias(&moved.record.attributes) {
                let target = self.alias_target(&moved.dn, &moved.record.attributes)?;
                if moved.dn.is_descendant_of(&target) {
                    return Err(StoreError::alias_problem(
                        moved.dn.up_name(),
                        "an alias cannot point at one of its ancestors",
                    ));
                }
                if moved.dn != old.dn {
                    self.check_not_targeted(&moved.dn, None)?;
                }
            }

            targeting.extend(self.aliases_targeting(&old.dn)?);
            targeting.extend(self.aliases_targeting(&moved.dn)?);
            before.extend(self.entry_rows(&old, &current)?);
            after_rows.extend(self.entry_rows(&moved, &after)?);
        }

        // aliases outside the subtree whose target moved away or arrived
        let members: BTreeSet<EntryId> = subtree.iter().copied().collect();
        let outside: Vec<EntryId> = targeting.difference(&members).copied().collect();
        before.extend(self.alias_rows_of(&outside, &current)?);
        after_rows.extend(self.alias_rows_of(&outside, &after)?);

        let mut set = WriteSet::new();
        set.put_master(id, root_record);
        diff(&mut set, &before, &after_rows);
        Ok((old_dn, new_dn, subtree.len(), set))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::schema::SchemaRegistry;
    use crate::store::StoreConfig;

    fn store() -> Store {
        let mut store = Store::new(
            StoreConfig::with_suffix("dc=example").index("ou").index("cn"),
            Arc::new(SchemaRegistry::core()),
        );
        store.init().unwrap();
        let schema = store.schema().clone();
        for (dn, oc) in [
            ("dc=example", "domain"),
            ("ou=people,dc=example", "organizationalUnit"),
            ("ou=groups,dc=example", "organizationalUnit"),
            ("cn=bob,ou=people,dc=example", "person"),
        ] {
            store
                .add(Entry::from_pairs(&schema, dn, &[("objectClass", oc)]).unwrap())
                .unwrap();
        }
        store
    }

    fn dn(s: &str) -> Dn {
        Dn::parse(s).unwrap()
    }

    #[test]
    fn test_add_stamps_operational_attributes() {
        let store = store();
        let bob = store.lookup_dn(&dn("cn=bob,ou=people,dc=example")).unwrap().unwrap();
        let schema = store.schema();
        assert!(bob.get(schema, "entryUUID").is_some());
        assert!(bob.get(schema, "entryCSN").is_some());
        assert!(bob.contains(schema, "cn", "Bob").unwrap());
    }

    #[test]
    fn test_add_duplicate_and_orphan() {
        let mut store = store();
        let schema = store.schema().clone();

        let dup = Entry::from_pairs(&schema, "ou=people,dc=example", &[("objectClass", "top")]).unwrap();
        assert_eq!(store.add(dup).unwrap_err().code(), StoreErrorCode::EntryAlreadyExists);

        let orphan =
            Entry::from_pairs(&schema, "cn=x,ou=nowhere,dc=example", &[("objectClass", "top")]).unwrap();
        assert_eq!(store.add(orphan).unwrap_err().code(), StoreErrorCode::NoSuchObject);

        let outside = Entry::from_pairs(&schema, "dc=other", &[("objectClass", "top")]).unwrap();
        assert_eq!(store.add(outside).unwrap_err().code(), StoreErrorCode::NoSuchObject);
        assert_eq!(store.metrics().snapshot().mutations_rejected, 3);
    }

    #[test]
    fn test_modify_touches_only_changed_rows() {
        let mut store = store();
        let (_, set) = store
            .prepare_modify(
                &dn("cn=bob,ou=people,dc=example"),
                &[Modification::add("description", &["not indexed"])],
            )
            .unwrap();
        // master row, old CSN out, new CSN in
        assert_eq!(set.len(), 3);

        store
            .modify(
                &dn("cn=bob,ou=people,dc=example"),
                &[Modification::add("cn", &["Robert"])],
            )
            .unwrap();
        let cn = store.user_index("cn").unwrap();
        assert_eq!(cn.count_key(&crate::index::IndexKey::from("robert")), 1);
    }

    #[test]
    fn test_rename_keeps_children_records() {
        let mut store = store();
        let people = store.require_id(&dn("ou=people,dc=example")).unwrap();
        let bob = store.require_id(&dn("cn=bob,ou=people,dc=example")).unwrap();

        let new_dn = store
            .rename(&dn("ou=people,dc=example"), &Rdn::parse("ou=staff").unwrap(), true)
            .unwrap();
        assert_eq!(new_dn.up_name(), "ou=staff,dc=example");

        assert_eq!(store.parent_id(bob).unwrap(), Some(people));
        assert_eq!(
            store.entry_dn(bob).unwrap().up_name(),
            "cn=bob,ou=staff,dc=example"
        );
        assert_eq!(store.entry_id(&dn("cn=bob,ou=staff,dc=example")).unwrap(), Some(bob));
        assert!(store.entry_id(&dn("cn=bob,ou=people,dc=example")).unwrap().is_none());

        let staff = store.fetch(people).unwrap();
        assert!(!staff.contains(store.schema(), "ou", "people").unwrap());
        assert!(store.verify().is_ok());
    }

    #[test]
    fn test_context_entry_cannot_move() {
        let mut store = store();
        let err = store
            .rename(&dn("dc=example"), &Rdn::parse("dc=renamed").unwrap(), false)
            .unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::UnwillingToPerform);
    }
}
