//! Store Persistence Tests
//!
//! Tests for invariants:
//! - Synced tables reopen with the same entries and ids
//! - Identifiers are never reused across a reopen
//! - Missing or stale indices are rebuilt from the master table
//! - Corruption is never ignored
//! - Structural configuration is fixed once the store is initialized

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use xdbm::dn::Dn;
use xdbm::entry::Entry;
use xdbm::schema::SchemaRegistry;
use xdbm::store::{EntryId, IndexConfig, Store, StoreConfig, StoreErrorCode};

// =============================================================================
// Test Utilities
// =============================================================================

fn config(dir: &Path) -> StoreConfig {
    StoreConfig::with_suffix("dc=example")
        .index("ou")
        .in_directory(dir)
}

fn open(dir: &Path) -> Store {
    let mut store = Store::new(config(dir), Arc::new(SchemaRegistry::core()));
    store.init().unwrap();
    store
}

fn add(store: &mut Store, dn: &str) -> EntryId {
    let entry = Entry::from_pairs(store.schema(), dn, &[("objectClass", "top")]).unwrap();
    store.add(entry).unwrap()
}

fn dn(s: &str) -> Dn {
    Dn::parse(s).unwrap()
}

/// Writes a store with three entries and destroys it
fn seed(dir: &Path) {
    let mut store = open(dir);
    add(&mut store, "dc=example");
    add(&mut store, "ou=people,dc=example");
    add(&mut store, "ou=groups,dc=example");
    store.destroy().unwrap();
}

// =============================================================================
// Reopen
// =============================================================================

/// Entries, DNs and user index rows survive destroy and reopen.
#[test]
fn test_reopen_preserves_entries() {
    let temp_dir = TempDir::new().unwrap();
    seed(temp_dir.path());

    let store = open(temp_dir.path());
    assert_eq!(store.count().unwrap(), 3);
    let people = store.require_id(&dn("ou=people,dc=example")).unwrap();
    assert_eq!(people, EntryId(2));

    let key = store.normalize("ou", "groups").unwrap();
    assert_eq!(
        store.user_index("ou").unwrap().forward_lookup(&key),
        Some(EntryId(3))
    );
    store.verify().unwrap();
    assert_eq!(store.metrics().snapshot().index_rebuilds, 0);
    assert_eq!(store.metrics().snapshot().entries, 3);
}

/// Deleted ids are not handed out again after a reopen.
#[test]
fn test_ids_not_reused() {
    let temp_dir = TempDir::new().unwrap();
    seed(temp_dir.path());

    {
        let mut store = open(temp_dir.path());
        store.delete(EntryId(3)).unwrap();
        store.destroy().unwrap();
    }

    let mut store = open(temp_dir.path());
    let id = add(&mut store, "ou=devices,dc=example");
    assert_eq!(id, EntryId(4));
}

/// With sync_on_write every mutation reaches disk without an explicit sync.
#[test]
fn test_sync_on_write() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut store = Store::new(
            StoreConfig {
                sync_on_write: true,
                ..config(temp_dir.path())
            },
            Arc::new(SchemaRegistry::core()),
        );
        store.init().unwrap();
        add(&mut store, "dc=example");
        assert!(store.metrics().snapshot().syncs >= 1);
        // dropped without destroy
    }

    let store = open(temp_dir.path());
    assert!(store.has_entry(&dn("dc=example")).unwrap());
}

// =============================================================================
// Rebuild
// =============================================================================

/// A missing index table is rebuilt from the master table on init.
#[test]
fn test_missing_index_rebuilt() {
    let temp_dir = TempDir::new().unwrap();
    seed(temp_dir.path());

    let missing: Vec<_> = fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("oneLevel.fwd"))
        })
        .collect();
    assert_eq!(missing.len(), 1);
    fs::remove_file(&missing[0]).unwrap();

    let store = open(temp_dir.path());
    assert_eq!(store.metrics().snapshot().index_rebuilds, 1);
    assert_eq!(store.child_count(EntryId(1)).unwrap(), 2);
    store.verify().unwrap();
}

/// Adding a user index to an existing store builds it on init.
#[test]
fn test_new_user_index_built() {
    let temp_dir = TempDir::new().unwrap();
    seed(temp_dir.path());

    let mut store = Store::new(config(temp_dir.path()), Arc::new(SchemaRegistry::core()));
    store.add_index(IndexConfig::new("objectClass")).unwrap();
    store.add_index(IndexConfig::new("description")).unwrap();
    store.init().unwrap();

    assert_eq!(store.metrics().snapshot().index_rebuilds, 1);
    let key = store.normalize("objectClass", "TOP").unwrap();
    assert_eq!(store.user_index("objectClass").unwrap().count_key(&key), 3);
}

// =============================================================================
// Corruption
// =============================================================================

/// A flipped byte in the master table fails init with a fatal error.
#[test]
fn test_master_corruption_detected() {
    let temp_dir = TempDir::new().unwrap();
    seed(temp_dir.path());

    let master = temp_dir.path().join("master.tbl");
    let mut bytes = fs::read(&master).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(&master, bytes).unwrap();

    let mut store = Store::new(config(temp_dir.path()), Arc::new(SchemaRegistry::core()));
    let err = store.init().unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::DataCorruption);
    assert!(err.is_fatal());
    assert!(!store.is_initialized());
}

/// Reopening with another suffix is refused.
#[test]
fn test_suffix_mismatch_refused() {
    let temp_dir = TempDir::new().unwrap();
    seed(temp_dir.path());

    let mut store = Store::new(
        StoreConfig::with_suffix("dc=other").in_directory(temp_dir.path()),
        Arc::new(SchemaRegistry::core()),
    );
    let err = store.init().unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::IllegalState);
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration loads from JSON with defaults for omitted fields.
#[test]
fn test_config_from_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("partition.json");
    fs::write(
        &path,
        r#"{
            "partition_id": "users",
            "suffix": "ou=users,dc=example",
            "indexed_attributes": [{ "attribute": "uid" }, { "attribute": "mail", "cache_size": 50 }]
        }"#,
    )
    .unwrap();

    let config = StoreConfig::from_json_file(&path).unwrap();
    assert_eq!(config.partition_id, "users");
    assert_eq!(config.cache_size, 10000);
    assert!(!config.sync_on_write);
    assert_eq!(config.indexed_attributes.len(), 2);
    assert_eq!(config.indexed_attributes[0].cache_size, 100);
    assert_eq!(config.indexed_attributes[1].cache_size, 50);

    fs::write(&path, "{ not json").unwrap();
    let err = StoreConfig::from_json_file(&path).unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::InvalidConfig);
}

/// Structural properties are protected after init.
#[test]
fn test_properties_protected_after_init() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = open(temp_dir.path());

    for result in [
        store.set_suffix("dc=changed"),
        store.set_cache_size(5),
        store.set_working_directory(temp_dir.path().join("elsewhere")),
        store.add_index(IndexConfig::new("cn")),
    ] {
        let err = result.unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::IllegalState);
        assert!(err.is_fatal());
    }
    store.set_sync_on_write(true);
}
