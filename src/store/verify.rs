//! Index verification and rebuild
//!
//! The master table is authoritative. Every index row can be recomputed
//! from it, so a store whose indices are missing, asymmetric or stale is
//! repaired by clearing them and writing the recomputed rows.

use std::collections::{BTreeSet, HashMap};

use super::engine::Store;
use super::errors::{StoreError, StoreResult};
use super::id::EntryId;
use super::indices::Row;
use crate::dn::Dn;
use crate::observability::{Event, Logger, ObservationScope};

impl Store {
    /// Rows the indices should hold, computed from the master table alone
    pub(crate) fn expected_rows(&self) -> StoreResult<BTreeSet<Row>> {
        let ids: Vec<EntryId> = self.tables()?.master.ids().collect();

        let mut layouts = Vec::with_capacity(ids.len());
        let mut by_ndn: HashMap<String, EntryId> = HashMap::with_capacity(ids.len());
        for id in ids {
            let layout = self.layout(id)?;
            by_ndn.insert(layout.dn.norm_name(), id);
            layouts.push(layout);
        }

        let resolve = |dn: &Dn| by_ndn.get(&dn.norm_name()).copied();
        let mut rows = BTreeSet::new();
        for layout in &layouts {
            rows.extend(self.entry_rows(layout, &resolve)?);
        }
        Ok(rows)
    }

    /// Checks the indices against the master table.
    ///
    /// Fails with `XDBM_INTEGRITY_VIOLATION` naming the first missing or
    /// unexpected row.
    pub fn verify(&self) -> StoreResult<()> {
        let tables = self.tables()?;
        tables.indices.verify_symmetry().map_err(|e| {
            Logger::error(Event::IntegrityViolation.as_str(), &[("reason", e.message())]);
            StoreError::integrity_caused_by("index tables are asymmetric", e)
        })?;

        let expected = self.expected_rows()?;
        let actual = tables.indices.rows();
        if expected == actual {
            return Ok(());
        }

        let missing: Vec<&Row> = expected.difference(&actual).collect();
        let unexpected: Vec<&Row> = actual.difference(&expected).collect();
        let first = missing
            .first()
            .map(|row| format!("missing {:?}", row))
            .or_else(|| unexpected.first().map(|row| format!("unexpected {:?}", row)))
            .unwrap_or_default();

        Logger::error(
            Event::IntegrityViolation.as_str(),
            &[
                ("missing", &missing.len().to_string()),
                ("unexpected", &unexpected.len().to_string()),
                ("first", &first),
            ],
        );
        Err(StoreError::integrity(format!(
            "indices disagree with the master table: {} missing, {} unexpected rows ({})",
            missing.len(),
            unexpected.len(),
            first
        )))
    }

    /// Clears every index and rewrites it from the master table.
    ///
    /// Returns the number of rows written.
    pub fn rebuild_indices(&mut self) -> StoreResult<usize> {
        let scope = ObservationScope::new(Event::IndexRebuild);

        let rows = match self.expected_rows() {
            Ok(rows) => rows,
            Err(e) => {
                scope.fail_fatal(e.message());
                return Err(e);
            }
        };

        let tables = self.tables_mut()?;
        tables.indices.clear();
        for (row, id) in &rows {
            if let Err(e) = tables.indices.add(row, *id) {
                scope.fail_fatal(e.message());
                return Err(e.into());
            }
        }

        self.metrics.increment_rebuilds();
        scope.complete_with_fields(&[("rows", &rows.len().to_string())]);
        Ok(rows.len())
    }
}
