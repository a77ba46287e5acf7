//! Write sets: every table change of one mutation, applied as a unit
//!
//! A mutation first computes its full write set without touching any
//! table. Applying it records the inverse of each step that changed
//! something; on the first failure the recorded inverses are replayed in
//! reverse order. A failed rollback leaves the store inconsistent and is
//! reported as an integrity violation.

use super::errors::{StoreError, StoreResult};
use super::id::EntryId;
use super::indices::{IndexRow, Row, SystemIndices};
use super::master::{MasterRecord, MasterTable};
use crate::observability::{Event, Logger};

/// One table change
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    PutMaster(EntryId, Box<MasterRecord>),
    RemoveMaster(EntryId),
    AddRow(IndexRow, EntryId),
    DropRow(IndexRow, EntryId),
}

/// Ordered table changes of one mutation
#[derive(Debug, Default)]
pub struct WriteSet {
    ops: Vec<WriteOp>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_master(&mut self, id: EntryId, record: MasterRecord) {
        self.ops.push(WriteOp::PutMaster(id, Box::new(record)));
    }

    pub fn remove_master(&mut self, id: EntryId) {
        self.ops.push(WriteOp::RemoveMaster(id));
    }

    pub fn add_rows<'a>(&mut self, rows: impl IntoIterator<Item = &'a Row>) {
        self.ops
            .extend(rows.into_iter().map(|(row, id)| WriteOp::AddRow(row.clone(), *id)));
    }

    pub fn drop_rows<'a>(&mut self, rows: impl IntoIterator<Item = &'a Row>) {
        self.ops
            .extend(rows.into_iter().map(|(row, id)| WriteOp::DropRow(row.clone(), *id)));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Applies every op or none.
    ///
    /// `budget` is the store's fault-injection counter: when set, each op
    /// spends one write and the op that finds it at zero fails.
    pub fn apply(
        self,
        master: &mut MasterTable,
        indices: &mut SystemIndices,
        budget: &mut Option<usize>,
    ) -> StoreResult<()> {
        let mut undo: Vec<WriteOp> = Vec::with_capacity(self.ops.len());

        for op in self.ops {
            let result = spend(budget).and_then(|_| apply_one(&op, master, indices));
            match result {
                Ok(Some(inverse)) => undo.push(inverse),
                Ok(None) => {}
                Err(e) => {
                    let applied = undo.len();
                    rollback(undo, master, indices)?;
                    Logger::warn(
                        Event::WriteRolledBack.as_str(),
                        &[
                            ("undone", &applied.to_string()),
                            ("cause", e.message()),
                        ],
                    );
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

fn spend(budget: &mut Option<usize>) -> StoreResult<()> {
    match budget {
        Some(0) => Err(StoreError::new(
            super::errors::StoreErrorCode::WriteFailed,
            "injected write failure",
        )),
        Some(n) => {
            *n -= 1;
            Ok(())
        }
        None => Ok(()),
    }
}

/// Applies one op, returning its inverse if it changed anything
fn apply_one(
    op: &WriteOp,
    master: &mut MasterTable,
    indices: &mut SystemIndices,
) -> StoreResult<Option<WriteOp>> {
    Ok(match op {
        WriteOp::PutMaster(id, record) => {
            let inverse = match master.put(*id, (**record).clone())? {
                Some(previous) => WriteOp::PutMaster(*id, Box::new(previous)),
                None => WriteOp::RemoveMaster(*id),
            };
            Some(inverse)
        }
        WriteOp::RemoveMaster(id) => master
            .remove(*id)?
            .map(|previous| WriteOp::PutMaster(*id, Box::new(previous))),
        WriteOp::AddRow(row, id) => indices
            .add(row, *id)?
            .then(|| WriteOp::DropRow(row.clone(), *id)),
        WriteOp::DropRow(row, id) => indices
            .drop(row, *id)?
            .then(|| WriteOp::AddRow(row.clone(), *id)),
    })
}

fn rollback(
    undo: Vec<WriteOp>,
    master: &mut MasterTable,
    indices: &mut SystemIndices,
) -> StoreResult<()> {
    for op in undo.into_iter().rev() {
        if let Err(e) = apply_one(&op, master, indices) {
            Logger::fatal(
                Event::IntegrityViolation.as_str(),
                &[("phase", "rollback"), ("op", &format!("{:?}", op))],
            );
            return Err(StoreError::integrity_caused_by(
                "rollback failed, indices no longer match the master table",
                e,
            ));
        }
    }
    Ok(())
}
