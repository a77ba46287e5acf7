//! Persistent sorted tables
//!
//! The contract every index and the master table are written against.
//! `BTreeTable` is the provider shipped with the crate: ordered in memory,
//! persisted as a checksummed snapshot on `sync`.

mod checksum;
mod cursor;
mod errors;
mod mem;
mod snapshot;

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use cursor::TableCursor;
pub use errors::{Severity, TableError, TableErrorCode, TableResult};
pub use mem::BTreeTable;
pub(crate) use snapshot::{read_records, table_path, write_records};

/// Keys and values a table can hold
pub trait Storable: Ord + Clone + Debug + Serialize + DeserializeOwned {}

impl<T: Ord + Clone + Debug + Serialize + DeserializeOwned> Storable for T {}

/// Ordered key/value table, with or without duplicate keys.
pub trait Table<K, V> {
    fn name(&self) -> &str;

    fn allows_duplicates(&self) -> bool;

    fn has(&self, key: &K) -> bool;

    fn has_value(&self, key: &K, value: &V) -> bool;

    /// First value stored under `key`
    fn get(&self, key: &K) -> Option<V>;

    /// All values under `key`, in order
    fn values(&self, key: &K) -> Vec<V>;

    /// Inserts a tuple; returns false if it was already present.
    ///
    /// Fails with `DuplicateKey` if the table does not allow duplicates
    /// and `key` holds a different value.
    fn put(&mut self, key: K, value: V) -> TableResult<bool>;

    /// Sets the single value of `key`, replacing any previous values
    fn replace(&mut self, key: K, value: V) -> TableResult<()>;

    /// Removes `key` and returns the values it held
    fn remove(&mut self, key: &K) -> TableResult<Vec<V>>;

    /// Removes one tuple; returns false if it was absent
    fn remove_value(&mut self, key: &K, value: &V) -> TableResult<bool>;

    /// Number of tuples
    fn count(&self) -> usize;

    /// Number of tuples under `key`
    fn count_key(&self, key: &K) -> usize;

    /// Tuples with a key strictly greater than `key`
    fn greater_than_count(&self, key: &K) -> usize;

    /// Tuples with a key strictly less than `key`
    fn less_than_count(&self, key: &K) -> usize;

    /// Whether the counts above are exact or estimates
    fn is_count_exact(&self) -> bool;

    /// Makes the table durable
    fn sync(&mut self) -> TableResult<()>;
}
