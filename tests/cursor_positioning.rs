//! Cursor Positioning Tests
//!
//! Tests for cursor laws:
//! - before_key(k) + next() yields the first tuple of k
//! - after_key(k) + next() yields the first tuple after k, or end
//! - value positioning needs duplicate keys
//! - every positioning call fails after close; closing twice is harmless

use std::sync::Arc;

use xdbm::cursor::{CloseCause, Cursor, CursorError, ListCursor, TupleCursor};
use xdbm::dn::Dn;
use xdbm::entry::Entry;
use xdbm::index::{Index, IndexCursor};
use xdbm::schema::SchemaRegistry;
use xdbm::store::{EntryId, Store, StoreConfig};
use xdbm::table::{BTreeTable, Table};

// =============================================================================
// Helper Functions
// =============================================================================

/// k1 -> {1, 2}, k2 -> {3, 4}, k3 -> {5}
fn dup_table() -> BTreeTable<String, u64> {
    let mut table = BTreeTable::new("t", true);
    for (key, value) in [("k1", 1), ("k1", 2), ("k2", 3), ("k2", 4), ("k3", 5)] {
        table.put(key.to_string(), value).unwrap();
    }
    table
}

fn k(s: &str) -> String {
    s.to_string()
}

fn store_with_people() -> Store {
    let mut store = Store::new(
        StoreConfig::with_suffix("dc=example").index("ou"),
        Arc::new(SchemaRegistry::core()),
    );
    store.init().unwrap();
    let schema = store.schema().clone();
    for dn in [
        "dc=example",
        "ou=people,dc=example",
        "cn=alice,ou=people,dc=example",
        "cn=bob,ou=people,dc=example",
        "cn=carol,ou=people,dc=example",
    ] {
        let entry = Entry::from_pairs(&schema, dn, &[("objectClass", "top")]).unwrap();
        store.add(entry).unwrap();
    }
    store
}

// =============================================================================
// Table Cursor Laws
// =============================================================================

/// before_key then next lands on the first tuple of the key.
#[test]
fn test_before_key_law() {
    let table = dup_table();
    let mut cursor = table.cursor();

    cursor.before_key(&k("k2")).unwrap();
    assert!(cursor.next().unwrap());
    let tuple = cursor.get().unwrap();
    assert_eq!((tuple.key.as_str(), tuple.value), ("k2", 3));
}

/// after_key then next lands on the first tuple of the following key.
#[test]
fn test_after_key_law() {
    let table = dup_table();
    let mut cursor = table.cursor();

    cursor.after_key(&k("k2")).unwrap();
    assert!(cursor.next().unwrap());
    let tuple = cursor.get().unwrap();
    assert_eq!((tuple.key.as_str(), tuple.value), ("k3", 5));

    cursor.after_key(&k("k3")).unwrap();
    assert!(!cursor.next().unwrap());
    assert!(!cursor.available());
}

/// Positioning on a key that does not exist still orders correctly.
#[test]
fn test_key_positioning_between_keys() {
    let table = dup_table();
    let mut cursor = table.cursor();

    cursor.before_key(&k("k15")).unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.get().unwrap().key, "k2");

    cursor.before_key(&k("k15")).unwrap();
    assert!(cursor.previous().unwrap());
    assert_eq!(cursor.get().unwrap().value, 2);
}

/// Value positioning walks duplicates of one key.
#[test]
fn test_value_positioning() {
    let table = dup_table();
    let mut cursor = table.cursor();

    cursor.before_value(&k("k2"), &4).unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.get().unwrap().value, 4);

    cursor.after_value(&k("k1"), &1).unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.get().unwrap().value, 2);
}

/// Value positioning on a table without duplicates is unsupported.
#[test]
fn test_value_positioning_unsupported() {
    let mut table: BTreeTable<String, u64> = BTreeTable::new("unique", false);
    table.put(k("a"), 1).unwrap();
    let mut cursor = table.cursor();

    assert!(matches!(
        cursor.before_value(&k("a"), &1),
        Err(CursorError::Unsupported(_))
    ));
    assert!(matches!(
        cursor.after_value(&k("a"), &1),
        Err(CursorError::Unsupported(_))
    ));
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Every positioning call fails after close; a second close succeeds.
#[test]
fn test_closed_cursor_guard() {
    let table = dup_table();
    let mut cursor = table.cursor();
    assert!(cursor.first().unwrap());

    cursor.close().unwrap();
    assert!(cursor.is_closed());
    assert!(!cursor.available());
    assert!(matches!(cursor.next(), Err(CursorError::Closed { .. })));
    assert!(matches!(cursor.previous(), Err(CursorError::Closed { .. })));
    assert!(matches!(cursor.before_first(), Err(CursorError::Closed { .. })));
    assert!(matches!(cursor.before_key(&k("k1")), Err(CursorError::Closed { .. })));
    assert!(matches!(cursor.get(), Err(CursorError::Closed { .. })));

    cursor.close().unwrap();
}

/// Closing with a cause reports it on later calls.
#[test]
fn test_close_with_cause() {
    let mut cursor = ListCursor::new(vec![1, 2, 3]);
    let cause: CloseCause = Arc::new(CursorError::Backend("search abandoned".to_string()));
    cursor.close_with_cause(Some(cause)).unwrap();

    let err = cursor.first().unwrap_err();
    assert!(err.to_string().contains("search abandoned"));
}

/// The iterator view yields every element from the current position.
#[test]
fn test_iterator_view() {
    let table = dup_table();
    let mut cursor = table.cursor_for(&k("k1"));
    let values: Vec<u64> = cursor.iter().map(|t| t.unwrap().value).collect();
    assert_eq!(values, vec![1, 2]);
}

// =============================================================================
// Index Cursors
// =============================================================================

/// A forward cursor restricted to one key only sees that key's ids.
#[test]
fn test_forward_index_cursor_for_key() {
    let mut index: Index<String> = Index::new("test", "test");
    for (key, id) in [("a", 1), ("b", 2), ("b", 3), ("c", 4)] {
        index.add(k(key), EntryId(id)).unwrap();
    }

    let mut cursor = index.forward_cursor_for(&k("b"));
    let ids: Vec<EntryId> = cursor.iter().map(|e| e.unwrap().id).collect();
    assert_eq!(ids, vec![EntryId(2), EntryId(3)]);

    let mut cursor = index.forward_cursor();
    cursor.after_key(&k("b")).unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.get().unwrap().key, "c");
}

/// Reverse cursors walk the values held by one id.
#[test]
fn test_reverse_index_cursor() {
    let mut index: Index<String> = Index::new("test", "test");
    index.add(k("x"), EntryId(7)).unwrap();
    index.add(k("y"), EntryId(7)).unwrap();
    index.add(k("z"), EntryId(8)).unwrap();

    let mut cursor = index.reverse_cursor_for(EntryId(7));
    let keys: Vec<String> = cursor.iter().map(|e| e.unwrap().key).collect();
    assert_eq!(keys, vec![k("x"), k("y")]);
}

/// Listing children goes through the one-level index in id order.
#[test]
fn test_store_list_cursor() {
    let store = store_with_people();
    let people = store
        .require_id(&Dn::parse("ou=people,dc=example").unwrap())
        .unwrap();

    let mut cursor = store.list(people).unwrap();
    let children: Vec<String> = cursor
        .iter()
        .map(|e| store.entry_dn(e.unwrap().id).unwrap().up_name())
        .collect();
    assert_eq!(
        children,
        vec![
            "cn=alice,ou=people,dc=example",
            "cn=bob,ou=people,dc=example",
            "cn=carol,ou=people,dc=example",
        ]
    );

    cursor.close().unwrap();
    assert!(cursor.next().is_err());
}

/// Full master-table scan for unindexed fallback.
#[test]
fn test_store_entries_cursor() {
    let store = store_with_people();
    let mut cursor = store.entries().unwrap();
    assert!(cursor.last().unwrap());
    let last = cursor.get().unwrap();
    assert!(last.entry.is_some());
    assert_eq!(
        last.entry.unwrap().dn().up_name(),
        "cn=carol,ou=people,dc=example"
    );
    assert_eq!(cursor.iter().count(), 0);
}
