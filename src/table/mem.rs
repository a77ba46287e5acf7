//! Ordered table backed by a `BTreeMap`, persisted as a snapshot file
//!
//! Tuples are kept as `key -> set of values`, so duplicate-key tables and
//! single-value tables share one representation. A key with no values is
//! never stored.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound::{self, Excluded, Included, Unbounded};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::cursor::TableCursor;
use super::errors::{TableError, TableErrorCode, TableResult};
use super::snapshot::{read_records, table_path, write_records};
use super::{Storable, Table};
use crate::observability::{Event, Logger};

/// One snapshot record: a key and all of its values
#[derive(Serialize, Deserialize)]
struct KeyRecord<K, V> {
    key: K,
    values: Vec<V>,
}

/// In-memory sorted table with optional snapshot persistence.
#[derive(Debug, Clone)]
pub struct BTreeTable<K, V> {
    name: String,
    allows_duplicates: bool,
    data: BTreeMap<K, BTreeSet<V>>,
    /// Number of tuples
    count: usize,
    /// Snapshot file; `None` for a purely in-memory table
    path: Option<PathBuf>,
    /// Remaining writes before injected failures start
    write_budget: Option<usize>,
}

impl<K: Storable, V: Storable> BTreeTable<K, V> {
    /// Creates an empty in-memory table
    pub fn new(name: impl Into<String>, allows_duplicates: bool) -> Self {
        Self {
            name: name.into(),
            allows_duplicates,
            data: BTreeMap::new(),
            count: 0,
            path: None,
            write_budget: None,
        }
    }

    /// Opens the table `name` in `dir`, loading its snapshot if one exists.
    pub fn open(dir: &Path, name: impl Into<String>, allows_duplicates: bool) -> TableResult<Self> {
        let mut table = Self::new(name, allows_duplicates);
        let path = table_path(dir, &table.name);

        if path.exists() {
            table.load(&path).inspect_err(|e| {
                if e.code() == TableErrorCode::DataCorruption {
                    Logger::fatal(
                        Event::TableCorruption.as_str(),
                        &[("table", table.name.as_str()), ("reason", e.message())],
                    );
                }
            })?;
        }

        table.path = Some(path);
        Ok(table)
    }

    fn load(&mut self, path: &Path) -> TableResult<()> {
        for body in read_records(path, &self.name)? {
            let record: KeyRecord<K, V> = serde_json::from_slice(&body).map_err(|e| {
                TableError::data_corruption(&self.name, format!("Invalid record: {}", e))
            })?;
            if record.values.is_empty() || (!self.allows_duplicates && record.values.len() > 1) {
                return Err(TableError::data_corruption(
                    &self.name,
                    format!("key {:?} has {} values", record.key, record.values.len()),
                ));
            }
            self.count += record.values.len();
            self.data.insert(record.key, record.values.into_iter().collect());
        }
        Ok(())
    }

    /// Returns true if a snapshot of table `name` exists in `dir`
    pub fn file_exists(dir: &Path, name: &str) -> bool {
        table_path(dir, name).exists()
    }

    /// Snapshot file, if the table is persistent
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Removes every tuple
    pub fn clear(&mut self) {
        self.data.clear();
        self.count = 0;
    }

    /// All tuples in `(key, value)` order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.data
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k, v)))
    }

    /// Distinct keys in order
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> {
        self.data.keys()
    }

    /// Cursor over the whole table, positioned before the first tuple
    pub fn cursor(&self) -> TableCursor<'_, K, V> {
        TableCursor::new(self, None)
    }

    /// Cursor restricted to the tuples of one key
    pub fn cursor_for(&self, key: &K) -> TableCursor<'_, K, V> {
        TableCursor::new(self, Some(key.clone()))
    }

    /// Makes every write after the next `writes` fail.
    ///
    /// Fault injection for exercising rollback paths; `None` disables it.
    pub fn set_write_budget(&mut self, writes: Option<usize>) {
        self.write_budget = writes;
    }

    fn spend_write(&mut self) -> TableResult<()> {
        match self.write_budget {
            Some(0) => Err(TableError::write_failed(
                &self.name,
                "write budget exhausted",
                None,
            )),
            Some(n) => {
                self.write_budget = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Smallest tuple after `(key, value)`.
    ///
    /// With `value == None` the bound is the whole key. `inclusive` admits
    /// the bound itself.
    pub(crate) fn next_tuple(&self, key: &K, value: Option<&V>, inclusive: bool) -> Option<(K, V)> {
        if let Some(value) = value {
            if let Some(values) = self.data.get(key) {
                let lower = if inclusive { Included(value) } else { Excluded(value) };
                if let Some(v) = values.range::<V, _>((lower, Unbounded)).next() {
                    return Some((key.clone(), v.clone()));
                }
            }
            return self.first_of_range((Excluded(key), Unbounded));
        }

        let lower = if inclusive { Included(key) } else { Excluded(key) };
        self.first_of_range((lower, Unbounded))
    }

    /// Largest tuple before `(key, value)`; mirror of `next_tuple`.
    pub(crate) fn prev_tuple(&self, key: &K, value: Option<&V>, inclusive: bool) -> Option<(K, V)> {
        if let Some(value) = value {
            if let Some(values) = self.data.get(key) {
                let upper = if inclusive { Included(value) } else { Excluded(value) };
                if let Some(v) = values.range::<V, _>((Unbounded, upper)).next_back() {
                    return Some((key.clone(), v.clone()));
                }
            }
            return self.last_of_range((Unbounded, Excluded(key)));
        }

        let upper = if inclusive { Included(key) } else { Excluded(key) };
        self.last_of_range((Unbounded, upper))
    }

    pub(crate) fn first_tuple(&self) -> Option<(K, V)> {
        self.first_of_range((Unbounded, Unbounded))
    }

    pub(crate) fn last_tuple(&self) -> Option<(K, V)> {
        self.last_of_range((Unbounded, Unbounded))
    }

    fn first_of_range(&self, range: (Bound<&K>, Bound<&K>)) -> Option<(K, V)> {
        self.data
            .range::<K, _>(range)
            .next()
            .and_then(|(k, values)| values.iter().next().map(|v| (k.clone(), v.clone())))
    }

    fn last_of_range(&self, range: (Bound<&K>, Bound<&K>)) -> Option<(K, V)> {
        self.data
            .range::<K, _>(range)
            .next_back()
            .and_then(|(k, values)| values.iter().next_back().map(|v| (k.clone(), v.clone())))
    }
}

impl<K: Storable, V: Storable> Table<K, V> for BTreeTable<K, V> {
    fn name(&self) -> &str {
        &self.name
    }

    fn allows_duplicates(&self) -> bool {
        self.allows_duplicates
    }

    fn has(&self, key: &K) -> bool {
        self.data.contains_key(key)
    }

    fn has_value(&self, key: &K, value: &V) -> bool {
        self.data.get(key).is_some_and(|values| values.contains(value))
    }

    fn get(&self, key: &K) -> Option<V> {
        self.data
            .get(key)
            .and_then(|values| values.iter().next().cloned())
    }

    fn values(&self, key: &K) -> Vec<V> {
        self.data
            .get(key)
            .map(|values| values.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn put(&mut self, key: K, value: V) -> TableResult<bool> {
        if self.has_value(&key, &value) {
            return Ok(false);
        }
        if !self.allows_duplicates && self.data.contains_key(&key) {
            return Err(TableError::duplicate_key(&self.name, &key));
        }
        self.spend_write()?;

        self.data.entry(key).or_default().insert(value);
        self.count += 1;
        Ok(true)
    }

    fn replace(&mut self, key: K, value: V) -> TableResult<()> {
        self.spend_write()?;
        let mut values = BTreeSet::new();
        values.insert(value);
        let previous = self.data.insert(key, values);
        self.count = self.count + 1 - previous.map(|p| p.len()).unwrap_or(0);
        Ok(())
    }

    fn remove(&mut self, key: &K) -> TableResult<Vec<V>> {
        if !self.data.contains_key(key) {
            return Ok(Vec::new());
        }
        self.spend_write()?;

        let removed: Vec<V> = self
            .data
            .remove(key)
            .map(|values| values.into_iter().collect())
            .unwrap_or_default();
        self.count -= removed.len();
        Ok(removed)
    }

    fn remove_value(&mut self, key: &K, value: &V) -> TableResult<bool> {
        if !self.has_value(key, value) {
            return Ok(false);
        }
        self.spend_write()?;

        if let Some(values) = self.data.get_mut(key) {
            values.remove(value);
            if values.is_empty() {
                self.data.remove(key);
            }
        }
        self.count -= 1;
        Ok(true)
    }

    fn count(&self) -> usize {
        self.count
    }

    fn count_key(&self, key: &K) -> usize {
        self.data.get(key).map(BTreeSet::len).unwrap_or(0)
    }

    fn greater_than_count(&self, key: &K) -> usize {
        self.data
            .range::<K, _>((Excluded(key), Unbounded))
            .map(|(_, values)| values.len())
            .sum()
    }

    fn less_than_count(&self, key: &K) -> usize {
        self.data
            .range::<K, _>((Unbounded, Excluded(key)))
            .map(|(_, values)| values.len())
            .sum()
    }

    fn is_count_exact(&self) -> bool {
        true
    }

    fn sync(&mut self) -> TableResult<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };

        let mut records = Vec::with_capacity(self.data.len());
        for (key, values) in &self.data {
            let record = KeyRecord {
                key,
                values: values.iter().collect::<Vec<_>>(),
            };
            let body = serde_json::to_vec(&record).map_err(|e| {
                TableError::write_failed(&self.name, format!("Failed to encode record: {}", e), None)
            })?;
            records.push(body);
        }

        write_records(&path, &self.name, &records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableErrorCode;
    use tempfile::TempDir;

    fn dup_table() -> BTreeTable<String, u64> {
        let mut table = BTreeTable::new("ou", true);
        for (k, v) in [("a", 1), ("b", 2), ("b", 3), ("c", 4)] {
            table.put(k.to_string(), v).unwrap();
        }
        table
    }

    #[test]
    fn test_counts() {
        let table = dup_table();
        assert_eq!(table.count(), 4);
        assert_eq!(table.count_key(&"b".to_string()), 2);
        assert_eq!(table.greater_than_count(&"a".to_string()), 3);
        assert_eq!(table.less_than_count(&"c".to_string()), 3);
        assert!(table.is_count_exact());
    }

    #[test]
    fn test_put_is_idempotent() {
        let mut table = dup_table();
        assert!(!table.put("a".to_string(), 1).unwrap());
        assert_eq!(table.count(), 4);
    }

    #[test]
    fn test_no_duplicates() {
        let mut table: BTreeTable<u64, String> = BTreeTable::new("master", false);
        table.put(1, "x".to_string()).unwrap();
        let err = table.put(1, "y".to_string()).unwrap_err();
        assert_eq!(err.code(), TableErrorCode::DuplicateKey);

        table.replace(1, "y".to_string()).unwrap();
        assert_eq!(table.get(&1), Some("y".to_string()));
        assert_eq!(table.count(), 1);
    }

    #[test]
    fn test_remove() {
        let mut table = dup_table();
        assert!(table.remove_value(&"b".to_string(), &2).unwrap());
        assert!(!table.remove_value(&"b".to_string(), &2).unwrap());
        assert_eq!(table.remove(&"b".to_string()).unwrap(), vec![3]);
        assert!(!table.has(&"b".to_string()));
        assert_eq!(table.count(), 2);
    }

    #[test]
    fn test_write_budget() {
        let mut table = dup_table();
        table.set_write_budget(Some(1));
        table.put("d".to_string(), 5).unwrap();
        let err = table.put("e".to_string(), 6).unwrap_err();
        assert_eq!(err.code(), TableErrorCode::WriteFailed);
        assert_eq!(table.count(), 5);

        table.set_write_budget(None);
        table.put("e".to_string(), 6).unwrap();
    }

    #[test]
    fn test_sync_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let mut table: BTreeTable<String, u64> = BTreeTable::open(temp_dir.path(), "ou", true).unwrap();
        table.put("people".to_string(), 2).unwrap();
        table.put("people".to_string(), 3).unwrap();
        table.sync().unwrap();

        assert!(BTreeTable::<String, u64>::file_exists(temp_dir.path(), "ou"));
        let reopened: BTreeTable<String, u64> = BTreeTable::open(temp_dir.path(), "ou", true).unwrap();
        assert_eq!(reopened.count(), 2);
        assert_eq!(reopened.values(&"people".to_string()), vec![2, 3]);
    }

    #[test]
    fn test_neighbours() {
        let table = dup_table();
        let b = "b".to_string();
        assert_eq!(table.next_tuple(&b, None, true), Some((b.clone(), 2)));
        assert_eq!(table.next_tuple(&b, None, false), Some(("c".to_string(), 4)));
        assert_eq!(table.next_tuple(&b, Some(&2), false), Some((b.clone(), 3)));
        assert_eq!(table.prev_tuple(&b, None, false), Some(("a".to_string(), 1)));
        assert_eq!(table.prev_tuple(&b, None, true), Some((b.clone(), 3)));
        assert_eq!(table.prev_tuple(&b, Some(&3), false), Some((b, 2)));
        assert_eq!(table.first_tuple(), Some(("a".to_string(), 1)));
        assert_eq!(table.last_tuple(), Some(("c".to_string(), 4)));
    }
}
