//! Master table: id -> entry record
//!
//! The master table is the source of truth. A record holds the entry's
//! position under its parent and its attributes; the DN is rebuilt by
//! walking parent ids, so renaming an entry never touches its children.
//!
//! Store metadata (next id, suffix) is kept next to the table as a single
//! checksummed record.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};
use super::id::{EntryId, ParentIdAndRdn};
use crate::entry::Attributes;
use crate::table::{read_records, table_path, write_records, BTreeTable, Table, TableError};

const MASTER_TABLE: &str = "master";
const META_TABLE: &str = "meta";

/// One row of the master table
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MasterRecord {
    pub parent: ParentIdAndRdn,
    pub attributes: Attributes,
}

/// Persisted store metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMeta {
    /// Next id to hand out; ids start at 1
    pub next_id: u64,
    /// Normalized suffix the tables were created for
    pub suffix: String,
}

impl StoreMeta {
    fn fresh(suffix: &str) -> Self {
        Self {
            next_id: 1,
            suffix: suffix.to_string(),
        }
    }
}

/// Master table plus metadata
#[derive(Debug)]
pub struct MasterTable {
    table: BTreeTable<EntryId, MasterRecord>,
    meta: StoreMeta,
    dir: Option<PathBuf>,
}

impl MasterTable {
    /// In-memory master table
    pub fn new(suffix: &str) -> Self {
        Self {
            table: BTreeTable::new(MASTER_TABLE, false),
            meta: StoreMeta::fresh(suffix),
            dir: None,
        }
    }

    /// Opens the master table and metadata in `dir`.
    ///
    /// A suffix that differs from the persisted one is rejected.
    pub fn open(dir: &Path, suffix: &str) -> StoreResult<Self> {
        let table = BTreeTable::open(dir, MASTER_TABLE, false)?;

        let meta_path = table_path(dir, META_TABLE);
        let meta = if meta_path.exists() {
            let records = read_records(&meta_path, META_TABLE)?;
            let body = records.first().ok_or_else(|| {
                StoreError::from(TableError::data_corruption(META_TABLE, "empty metadata file"))
            })?;
            let meta: StoreMeta = serde_json::from_slice(body).map_err(|e| {
                StoreError::from(TableError::data_corruption(META_TABLE, e.to_string()))
            })?;
            if meta.suffix != suffix {
                return Err(StoreError::illegal_state(format!(
                    "tables in {} belong to suffix '{}', not '{}'",
                    dir.display(),
                    meta.suffix,
                    suffix
                )));
            }
            meta
        } else {
            StoreMeta::fresh(suffix)
        };

        let mut master = Self {
            table,
            meta,
            dir: Some(dir.to_path_buf()),
        };
        // ids are never reused, even if metadata lagged behind the table
        if let Some(last) = master.table.keys().next_back() {
            master.meta.next_id = master.meta.next_id.max(last.as_u64() + 1);
        }
        Ok(master)
    }

    /// Returns true if a master table file exists in `dir`
    pub fn exists(dir: &Path) -> bool {
        BTreeTable::<EntryId, MasterRecord>::file_exists(dir, MASTER_TABLE)
    }

    /// Reserves the next id without consuming it
    pub fn peek_id(&self) -> EntryId {
        EntryId(self.meta.next_id)
    }

    /// Consumes the id returned by `peek_id`
    pub fn commit_id(&mut self, id: EntryId) {
        self.meta.next_id = self.meta.next_id.max(id.as_u64() + 1);
    }

    pub fn get(&self, id: EntryId) -> Option<MasterRecord> {
        self.table.get(&id)
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.table.has(&id)
    }

    /// Inserts or replaces a record, returning the previous one
    pub fn put(&mut self, id: EntryId, record: MasterRecord) -> StoreResult<Option<MasterRecord>> {
        let previous = self.table.get(&id);
        self.table.replace(id, record)?;
        Ok(previous)
    }

    pub fn remove(&mut self, id: EntryId) -> StoreResult<Option<MasterRecord>> {
        Ok(self.table.remove(&id)?.into_iter().next())
    }

    pub fn count(&self) -> usize {
        self.table.count()
    }

    /// Every `(id, record)` in id order
    pub fn iter(&self) -> impl Iterator<Item = (&EntryId, &MasterRecord)> {
        self.table.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.table.keys().copied()
    }

    /// Writes the table and metadata to the working directory
    pub fn sync(&mut self) -> StoreResult<()> {
        self.table.sync()?;
        if let Some(dir) = &self.dir {
            let body = serde_json::to_vec(&self.meta).map_err(|e| {
                StoreError::from(TableError::data_corruption(META_TABLE, e.to_string()))
            })?;
            write_records(&table_path(dir, META_TABLE), META_TABLE, &[body])?;
        }
        Ok(())
    }

    pub fn set_write_budget(&mut self, writes: Option<usize>) {
        self.table.set_write_budget(writes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::Rdn;
    use tempfile::TempDir;

    fn record(parent: u64, rdn: &str) -> MasterRecord {
        MasterRecord {
            parent: ParentIdAndRdn::child(EntryId(parent), Rdn::parse(rdn).unwrap()),
            attributes: Attributes::new(),
        }
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut master = MasterTable::new("dc=example");
        let id = master.peek_id();
        assert_eq!(id, EntryId(1));
        master.put(id, record(0, "dc=example")).unwrap();
        master.commit_id(id);
        assert_eq!(master.peek_id(), EntryId(2));

        master.remove(id).unwrap();
        assert_eq!(master.peek_id(), EntryId(2));
    }

    #[test]
    fn test_put_returns_previous() {
        let mut master = MasterTable::new("dc=example");
        assert!(master.put(EntryId(1), record(0, "dc=example")).unwrap().is_none());
        let previous = master.put(EntryId(1), record(0, "dc=other")).unwrap();
        assert_eq!(previous, Some(record(0, "dc=example")));
        assert_eq!(master.count(), 1);
    }

    #[test]
    fn test_sync_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let mut master = MasterTable::open(temp_dir.path(), "dc=example").unwrap();
        master.put(EntryId(1), record(0, "dc=example")).unwrap();
        master.commit_id(EntryId(1));
        master.sync().unwrap();
        assert!(MasterTable::exists(temp_dir.path()));

        let reopened = MasterTable::open(temp_dir.path(), "dc=example").unwrap();
        assert_eq!(reopened.count(), 1);
        assert_eq!(reopened.peek_id(), EntryId(2));
    }

    #[test]
    fn test_reopen_with_other_suffix_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut master = MasterTable::open(temp_dir.path(), "dc=example").unwrap();
        master.sync().unwrap();

        let err = MasterTable::open(temp_dir.path(), "dc=other").unwrap_err();
        assert!(err.is_fatal());
    }
}
