//! The fixed system indices plus the configured user indices
//!
//! Rows are addressed through `IndexRow`, which names the index and carries
//! the key; the id half of the tuple travels next to it. Computing rows
//! as plain values lets a mutation diff what an entry had against what it
//! should have and touch only the difference.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::errors::StoreResult;
use super::id::{EntryId, ParentIdAndRdn};
use crate::index::{Index, IndexKey, IndexResult};
use crate::schema::MatchingRule;

/// Index name and key of one tuple
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexRow {
    /// OID of an indexed attribute the entry holds
    Presence(String),
    ObjectClass(IndexKey),
    /// Parent id; the tuple id is the child
    OneLevel(EntryId),
    /// Ancestor id, or the entry's own id; the tuple id is the descendant
    SubLevel(EntryId),
    /// Normalized target DN; the tuple id is the alias
    Alias(String),
    /// Parent of an alias; the tuple id is the alias target
    OneAlias(EntryId),
    /// Ancestor of an alias; the tuple id is the alias target
    SubAlias(EntryId),
    Ndn(String),
    Updn(String),
    Rdn(ParentIdAndRdn),
    EntryUuid(IndexKey),
    EntryCsn(IndexKey),
    /// Attribute OID and normalized value
    User(String, IndexKey),
}

/// One index tuple
pub type Row = (IndexRow, EntryId);

const PRESENCE: &str = "presence";
const OBJECT_CLASS: &str = "objectClass";
const ONE_LEVEL: &str = "oneLevel";
const SUB_LEVEL: &str = "subLevel";
const ALIAS: &str = "alias";
const ONE_ALIAS: &str = "oneAlias";
const SUB_ALIAS: &str = "subAlias";
const NDN: &str = "ndn";
const UPDN: &str = "updn";
const RDN: &str = "rdn";
const ENTRY_UUID: &str = "entryUUID";
const ENTRY_CSN: &str = "entryCSN";

const SYSTEM_INDICES: &[&str] = &[
    PRESENCE,
    OBJECT_CLASS,
    ONE_LEVEL,
    SUB_LEVEL,
    ALIAS,
    ONE_ALIAS,
    SUB_ALIAS,
    NDN,
    UPDN,
    RDN,
    ENTRY_UUID,
    ENTRY_CSN,
];

/// All indices of one store
#[derive(Debug)]
pub struct SystemIndices {
    presence: Index<String>,
    object_class: Index<IndexKey>,
    one_level: Index<EntryId>,
    sub_level: Index<EntryId>,
    alias: Index<String>,
    one_alias: Index<EntryId>,
    sub_alias: Index<EntryId>,
    ndn: Index<String>,
    updn: Index<String>,
    rdn: Index<ParentIdAndRdn>,
    entry_uuid: Index<IndexKey>,
    entry_csn: Index<IndexKey>,
    /// Keyed by attribute OID
    user: BTreeMap<String, Index<IndexKey>>,
}

impl SystemIndices {
    /// Opens every index, in `dir` when given, in memory otherwise.
    ///
    /// `user` lists `(oid, equality rule)` of each user index.
    pub fn open(dir: Option<&Path>, user: &[(String, MatchingRule)]) -> StoreResult<Self> {
        let mut user_indices = BTreeMap::new();
        for (oid, rule) in user {
            let index = open_index(dir, oid, oid)?.with_matching_rule(*rule);
            user_indices.insert(oid.clone(), index);
        }

        Ok(Self {
            presence: open_index(dir, PRESENCE, PRESENCE)?,
            object_class: open_index(dir, OBJECT_CLASS, crate::schema::OBJECT_CLASS_OID)?
                .with_matching_rule(MatchingRule::ObjectIdentifier),
            one_level: open_index(dir, ONE_LEVEL, ONE_LEVEL)?,
            sub_level: open_index(dir, SUB_LEVEL, SUB_LEVEL)?,
            alias: open_index(dir, ALIAS, crate::schema::ALIASED_OBJECT_NAME_OID)?,
            one_alias: open_index(dir, ONE_ALIAS, ONE_ALIAS)?,
            sub_alias: open_index(dir, SUB_ALIAS, SUB_ALIAS)?,
            ndn: open_index(dir, NDN, NDN)?,
            updn: open_index(dir, UPDN, UPDN)?,
            rdn: open_index(dir, RDN, RDN)?,
            entry_uuid: open_index(dir, ENTRY_UUID, crate::schema::ENTRY_UUID_OID)?
                .with_matching_rule(MatchingRule::Uuid),
            entry_csn: open_index(dir, ENTRY_CSN, crate::schema::ENTRY_CSN_OID)?
                .with_matching_rule(MatchingRule::Csn),
            user: user_indices,
        })
    }

    /// Returns true if any index table is missing from `dir`
    pub fn files_missing(dir: &Path, user: &[(String, MatchingRule)]) -> bool {
        SYSTEM_INDICES
            .iter()
            .map(|name| name.to_string())
            .chain(user.iter().map(|(oid, _)| oid.clone()))
            .any(|name| !Index::<String>::files_exist(dir, &name))
    }

    pub fn presence(&self) -> &Index<String> {
        &self.presence
    }

    pub fn object_class(&self) -> &Index<IndexKey> {
        &self.object_class
    }

    pub fn one_level(&self) -> &Index<EntryId> {
        &self.one_level
    }

    pub fn sub_level(&self) -> &Index<EntryId> {
        &self.sub_level
    }

    pub fn alias(&self) -> &Index<String> {
        &self.alias
    }

    pub fn one_alias(&self) -> &Index<EntryId> {
        &self.one_alias
    }

    pub fn sub_alias(&self) -> &Index<EntryId> {
        &self.sub_alias
    }

    pub fn ndn(&self) -> &Index<String> {
        &self.ndn
    }

    pub fn updn(&self) -> &Index<String> {
        &self.updn
    }

    pub fn rdn(&self) -> &Index<ParentIdAndRdn> {
        &self.rdn
    }

    pub fn entry_uuid(&self) -> &Index<IndexKey> {
        &self.entry_uuid
    }

    pub fn entry_csn(&self) -> &Index<IndexKey> {
        &self.entry_csn
    }

    /// User index by attribute OID
    pub fn user(&self, oid: &str) -> Option<&Index<IndexKey>> {
        self.user.get(oid)
    }

    /// OIDs of the user-indexed attributes
    pub fn user_oids(&self) -> impl Iterator<Item = &String> {
        self.user.keys()
    }

    /// Adds one tuple; false if it was already present
    pub(crate) fn add(&mut self, row: &IndexRow, id: EntryId) -> IndexResult<bool> {
        match row {
            IndexRow::Presence(oid) => self.presence.add(oid.clone(), id),
            IndexRow::ObjectClass(k) => self.object_class.add(k.clone(), id),
            IndexRow::OneLevel(p) => self.one_level.add(*p, id),
            IndexRow::SubLevel(a) => self.sub_level.add(*a, id),
            IndexRow::Alias(dn) => self.alias.add(dn.clone(), id),
            IndexRow::OneAlias(p) => self.one_alias.add(*p, id),
            IndexRow::SubAlias(a) => self.sub_alias.add(*a, id),
            IndexRow::Ndn(dn) => self.ndn.add(dn.clone(), id),
            IndexRow::Updn(dn) => self.updn.add(dn.clone(), id),
            IndexRow::Rdn(key) => self.rdn.add(key.clone(), id),
            IndexRow::EntryUuid(k) => self.entry_uuid.add(k.clone(), id),
            IndexRow::EntryCsn(k) => self.entry_csn.add(k.clone(), id),
            IndexRow::User(oid, k) => match self.user.get_mut(oid) {
                Some(index) => index.add(k.clone(), id),
                None => Err(crate::index::IndexError::not_found(oid.as_str())),
            },
        }
    }

    /// Removes one tuple; false if it was absent
    pub(crate) fn drop(&mut self, row: &IndexRow, id: EntryId) -> IndexResult<bool> {
        match row {
            IndexRow::Presence(oid) => self.presence.drop_value(oid, id),
            IndexRow::ObjectClass(k) => self.object_class.drop_value(k, id),
            IndexRow::OneLevel(p) => self.one_level.drop_value(p, id),
            IndexRow::SubLevel(a) => self.sub_level.drop_value(a, id),
            IndexRow::Alias(dn) => self.alias.drop_value(dn, id),
            IndexRow::OneAlias(p) => self.one_alias.drop_value(p, id),
            IndexRow::SubAlias(a) => self.sub_alias.drop_value(a, id),
            IndexRow::Ndn(dn) => self.ndn.drop_value(dn, id),
            IndexRow::Updn(dn) => self.updn.drop_value(dn, id),
            IndexRow::Rdn(key) => self.rdn.drop_value(key, id),
            IndexRow::EntryUuid(k) => self.entry_uuid.drop_value(k, id),
            IndexRow::EntryCsn(k) => self.entry_csn.drop_value(k, id),
            IndexRow::User(oid, k) => match self.user.get_mut(oid) {
                Some(index) => index.drop_value(k, id),
                None => Ok(false),
            },
        }
    }

    /// Every tuple currently held, across all indices
    pub fn rows(&self) -> BTreeSet<Row> {
        let mut rows = BTreeSet::new();
        collect(&mut rows, &self.presence, |k| IndexRow::Presence(k.clone()));
        collect(&mut rows, &self.object_class, |k| IndexRow::ObjectClass(k.clone()));
        collect(&mut rows, &self.one_level, |k| IndexRow::OneLevel(*k));
        collect(&mut rows, &self.sub_level, |k| IndexRow::SubLevel(*k));
        collect(&mut rows, &self.alias, |k| IndexRow::Alias(k.clone()));
        collect(&mut rows, &self.one_alias, |k| IndexRow::OneAlias(*k));
        collect(&mut rows, &self.sub_alias, |k| IndexRow::SubAlias(*k));
        collect(&mut rows, &self.ndn, |k| IndexRow::Ndn(k.clone()));
        collect(&mut rows, &self.updn, |k| IndexRow::Updn(k.clone()));
        collect(&mut rows, &self.rdn, |k| IndexRow::Rdn(k.clone()));
        collect(&mut rows, &self.entry_uuid, |k| IndexRow::EntryUuid(k.clone()));
        collect(&mut rows, &self.entry_csn, |k| IndexRow::EntryCsn(k.clone()));
        for (oid, index) in &self.user {
            collect(&mut rows, index, |k| IndexRow::User(oid.clone(), k.clone()));
        }
        rows
    }

    /// Checks forward/reverse symmetry of every index
    pub fn verify_symmetry(&self) -> IndexResult<()> {
        self.presence.verify_symmetry()?;
        self.object_class.verify_symmetry()?;
        self.one_level.verify_symmetry()?;
        self.sub_level.verify_symmetry()?;
        self.alias.verify_symmetry()?;
        self.one_alias.verify_symmetry()?;
        self.sub_alias.verify_symmetry()?;
        self.ndn.verify_symmetry()?;
        self.updn.verify_symmetry()?;
        self.rdn.verify_symmetry()?;
        self.entry_uuid.verify_symmetry()?;
        self.entry_csn.verify_symmetry()?;
        for index in self.user.values() {
            index.verify_symmetry()?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.presence.clear();
        self.object_class.clear();
        self.one_level.clear();
        self.sub_level.clear();
        self.alias.clear();
        self.one_alias.clear();
        self.sub_alias.clear();
        self.ndn.clear();
        self.updn.clear();
        self.rdn.clear();
        self.entry_uuid.clear();
        self.entry_csn.clear();
        for index in self.user.values_mut() {
            index.clear();
        }
    }

    pub fn sync(&mut self) -> IndexResult<()> {
        self.presence.sync()?;
        self.object_class.sync()?;
        self.one_level.sync()?;
        self.sub_level.sync()?;
        self.alias.sync()?;
        self.one_alias.sync()?;
        self.sub_alias.sync()?;
        self.ndn.sync()?;
        self.updn.sync()?;
        self.rdn.sync()?;
        self.entry_uuid.sync()?;
        self.entry_csn.sync()?;
        for index in self.user.values_mut() {
            index.sync()?;
        }
        Ok(())
    }
}

fn open_index<K: crate::table::Storable>(
    dir: Option<&Path>,
    name: &str,
    attribute: &str,
) -> StoreResult<Index<K>> {
    match dir {
        Some(dir) => Ok(Index::open(dir, name, attribute)?),
        None => Ok(Index::new(name, attribute)),
    }
}

fn collect<K: crate::table::Storable>(
    rows: &mut BTreeSet<Row>,
    index: &Index<K>,
    row: impl Fn(&K) -> IndexRow,
) {
    rows.extend(index.iter().map(|(k, id)| (row(k), *id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_drop_dispatch() {
        let mut indices = SystemIndices::open(None, &[]).unwrap();
        let row = IndexRow::OneLevel(EntryId(1));
        assert!(indices.add(&row, EntryId(2)).unwrap());
        assert!(!indices.add(&row, EntryId(2)).unwrap());
        assert_eq!(indices.one_level().forward_lookup(&EntryId(1)), Some(EntryId(2)));

        assert!(indices.drop(&row, EntryId(2)).unwrap());
        assert_eq!(indices.one_level().count(), 0);
    }

    #[test]
    fn test_rows_lists_every_index() {
        let user = vec![("2.5.4.11".to_string(), MatchingRule::CaseIgnore)];
        let mut indices = SystemIndices::open(None, &user).unwrap();
        indices.add(&IndexRow::Ndn("dc=example".into()), EntryId(1)).unwrap();
        indices
            .add(&IndexRow::User("2.5.4.11".into(), IndexKey::from("people")), EntryId(2))
            .unwrap();

        let rows = indices.rows();
        assert_eq!(rows.len(), 2);
        assert!(rows.contains(&(IndexRow::Ndn("dc=example".into()), EntryId(1))));
        assert!(indices.verify_symmetry().is_ok());
    }

    #[test]
    fn test_unknown_user_index() {
        let mut indices = SystemIndices::open(None, &[]).unwrap();
        let row = IndexRow::User("2.5.4.3".into(), IndexKey::from("bob"));
        assert!(indices.add(&row, EntryId(1)).is_err());
        assert!(!indices.drop(&row, EntryId(1)).unwrap());
    }

    #[test]
    fn test_files_missing() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        assert!(SystemIndices::files_missing(temp_dir.path(), &[]));

        let mut indices = SystemIndices::open(Some(temp_dir.path()), &[]).unwrap();
        indices.sync().unwrap();
        assert!(!SystemIndices::files_missing(temp_dir.path(), &[]));
    }
}
