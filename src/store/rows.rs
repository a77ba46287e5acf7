//! Index rows an entry should have
//!
//! Rows are derived from an entry's layout alone, plus a resolver mapping
//! alias target DNs to ids. Mutations compute rows for the state before
//! and the state after, and write only the difference.

use std::collections::BTreeSet;

use super::engine::{Layout, Store};
use super::errors::StoreResult;
use super::id::EntryId;
use super::indices::{IndexRow, Row};
use crate::dn::Dn;
use crate::schema::{ENTRY_CSN_OID, ENTRY_UUID_OID, OBJECT_CLASS_OID};

/// Maps a normalized DN to the id of the entry there
pub(crate) type Resolver<'r> = dyn Fn(&Dn) -> Option<EntryId> + 'r;

impl Store {
    /// Every row of the entry described by `layout`
    pub(crate) fn entry_rows(
        &self,
        layout: &Layout,
        resolve: &Resolver<'_>,
    ) -> StoreResult<BTreeSet<Row>> {
        let id = layout.id;
        let parent = &layout.record.parent;
        let attributes = &layout.record.attributes;

        let mut rows = BTreeSet::new();
        rows.insert((IndexRow::Ndn(layout.dn.norm_name()), id));
        rows.insert((IndexRow::Updn(layout.dn.up_name()), id));
        rows.insert((IndexRow::Rdn(parent.clone()), id));

        if !parent.is_context() {
            rows.insert((IndexRow::OneLevel(parent.parent_id()), id));
        }
        rows.insert((IndexRow::SubLevel(id), id));
        for ancestor in &layout.ancestors {
            rows.insert((IndexRow::SubLevel(*ancestor), id));
        }

        if let Some(object_class) = attributes.get(OBJECT_CLASS_OID) {
            for value in object_class.norm_values() {
                rows.insert((IndexRow::ObjectClass(value.clone()), id));
            }
        }
        if let Some(uuid) = attributes.get(ENTRY_UUID_OID).and_then(|a| a.norm_values().next()) {
            rows.insert((IndexRow::EntryUuid(uuid.clone()), id));
        }
        if let Some(csn) = attributes.get(ENTRY_CSN_OID).and_then(|a| a.norm_values().next()) {
            rows.insert((IndexRow::EntryCsn(csn.clone()), id));
        }

        for oid in self.tables()?.indices.user_oids() {
            let Some(attribute) = attributes.get(oid) else {
                continue;
            };
            rows.insert((IndexRow::Presence(oid.clone()), id));
            for value in attribute.norm_values() {
                rows.insert((IndexRow::User(oid.clone(), value.clone()), id));
            }
        }

        rows.extend(self.alias_rows(layout, resolve)?);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::entry::Entry;
    use crate::index::IndexKey;
    use crate::schema::SchemaRegistry;
    use crate::store::StoreConfig;

    fn store() -> Store {
        let mut store = Store::new(
            StoreConfig::with_suffix("dc=example").index("ou"),
            Arc::new(SchemaRegistry::core()),
        );
        store.init().unwrap();
        store
    }

    #[test]
    fn test_rows_of_new_child() {
        let mut store = store();
        let schema = store.schema().clone();
        store
            .add(Entry::from_pairs(&schema, "dc=example", &[("objectClass", "domain")]).unwrap())
            .unwrap();
        let id = store
            .add(
                Entry::from_pairs(
                    &schema,
                    "ou=People,dc=example",
                    &[("objectClass", "organizationalUnit")],
                )
                .unwrap(),
            )
            .unwrap();

        let layout = store.layout(id).unwrap();
        let rows = store.entry_rows(&layout, &|_| None).unwrap();

        assert!(rows.contains(&(IndexRow::OneLevel(EntryId(1)), id)));
        assert!(rows.contains(&(IndexRow::SubLevel(EntryId(1)), id)));
        assert!(rows.contains(&(IndexRow::SubLevel(id), id)));
        assert!(rows.contains(&(IndexRow::Presence("2.5.4.11".into()), id)));
        assert!(rows.contains(&(
            IndexRow::User("2.5.4.11".into(), IndexKey::from("people")),
            id
        )));
        assert!(rows.contains(&(IndexRow::Updn("ou=People,dc=example".into()), id)));
        // rows computed from the layout match what was written
        let held: BTreeSet<Row> = store
            .indices()
            .unwrap()
            .rows()
            .into_iter()
            .filter(|(_, row_id)| *row_id == id)
            .collect();
        assert_eq!(held, rows);
    }
}
