//! Entry-producing cursor for list and search

use std::sync::Arc;

use super::context::Evaluator;
use crate::cursor::{CloseCause, ClosureMonitor, Cursor, CursorError, CursorResult};
use crate::entry::Entry;
use crate::index::IndexEntry;
use crate::observability::{Event, Logger};
use crate::store::{EntryId, Store, StoreError};

/// Candidate ids as `(scope key, id)` index entries
pub type CandidateCursor<'s> = Box<dyn Cursor<Element = IndexEntry<EntryId>> + 's>;

/// Wraps a candidate cursor, resolving each id to its entry and keeping
/// only entries the evaluator accepts.
///
/// Elements carry the resolved entry, restricted to the requested
/// attributes, as their cached entry.
pub struct EntryCursor<'s> {
    store: &'s Store,
    candidates: CandidateCursor<'s>,
    evaluator: Option<Box<dyn Evaluator>>,
    attributes: Vec<String>,
    hide_aliases: bool,
    size_limit: Option<usize>,
    /// Matches stepped over moving forward from the start
    returned: usize,
    current: Option<IndexEntry<EntryId>>,
    monitor: ClosureMonitor,
}

impl<'s> EntryCursor<'s> {
    pub(crate) fn new(store: &'s Store, candidates: CandidateCursor<'s>) -> Self {
        Self {
            store,
            candidates,
            evaluator: None,
            attributes: Vec::new(),
            hide_aliases: false,
            size_limit: None,
            returned: 0,
            current: None,
            monitor: ClosureMonitor::new(),
        }
    }

    pub(crate) fn with_evaluator(mut self, evaluator: Option<Box<dyn Evaluator>>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub(crate) fn with_attributes(mut self, attributes: Vec<String>) -> Self {
        self.attributes = attributes;
        self
    }

    pub(crate) fn with_size_limit(mut self, limit: Option<usize>) -> Self {
        self.size_limit = limit;
        self
    }

    pub(crate) fn hiding_aliases(mut self, hide: bool) -> Self {
        self.hide_aliases = hide;
        self
    }

    /// Entries returned so far
    pub fn returned(&self) -> usize {
        self.returned
    }

    /// Resolves the candidate under the inner cursor; `None` if filtered.
    ///
    /// An id with no master record is an integrity violation, never skipped.
    fn resolve(&self) -> CursorResult<Option<IndexEntry<EntryId>>> {
        let candidate = self.candidates.get()?;
        let entry = self
            .store
            .lookup(candidate.id)
            .map_err(|e| CursorError::Store(Arc::new(e)))?;
        let Some(entry) = entry else {
            let id = candidate.id.to_string();
            Logger::error(
                Event::IntegrityViolation.as_str(),
                &[("id", &id), ("reason", "index id without master record")],
            );
            return Err(CursorError::Store(Arc::new(StoreError::integrity(format!(
                "index entry {} has no master record",
                id
            )))));
        };
        if self.hide_aliases && entry.is_alias() {
            return Ok(None);
        }
        if let Some(evaluator) = &self.evaluator {
            if !evaluator.evaluate(&entry) {
                return Ok(None);
            }
        }
        let selected = entry.select(self.store.schema(), &self.attributes);
        Ok(Some(candidate.with_entry(Arc::new(selected))))
    }

    fn reset(&mut self) {
        self.current = None;
        self.returned = 0;
    }
}

impl Cursor for EntryCursor<'_> {
    type Element = IndexEntry<EntryId>;

    fn available(&self) -> bool {
        !self.monitor.is_closed() && self.current.is_some()
    }

    fn before_first(&mut self) -> CursorResult<()> {
        self.monitor.check_not_closed("before_first")?;
        self.candidates.before_first()?;
        self.reset();
        Ok(())
    }

    fn after_last(&mut self) -> CursorResult<()> {
        self.monitor.check_not_closed("after_last")?;
        self.candidates.after_last()?;
        self.reset();
        Ok(())
    }

    fn first(&mut self) -> CursorResult<bool> {
        self.before_first()?;
        self.next()
    }

    fn last(&mut self) -> CursorResult<bool> {
        self.after_last()?;
        self.previous()
    }

    fn next(&mut self) -> CursorResult<bool> {
        self.monitor.check_not_closed("next")?;
        while self.candidates.next()? {
            if let Some(found) = self.resolve()? {
                if self.size_limit.is_some_and(|limit| self.returned >= limit) {
                    self.current = None;
                    return Err(CursorError::SizeLimitExceeded(self.returned));
                }
                self.returned += 1;
                self.current = Some(found);
                return Ok(true);
            }
        }
        self.current = None;
        Ok(false)
    }

    fn previous(&mut self) -> CursorResult<bool> {
        self.monitor.check_not_closed("previous")?;
        while self.candidates.previous()? {
            if let Some(found) = self.resolve()? {
                self.returned = self.returned.saturating_sub(1);
                self.current = Some(found);
                return Ok(true);
            }
        }
        self.current = None;
        Ok(false)
    }

    fn get(&self) -> CursorResult<Self::Element> {
        self.monitor.check_not_closed("get")?;
        self.current.clone().ok_or(CursorError::InvalidPosition)
    }

    fn close_with_cause(&mut self, cause: Option<CloseCause>) -> CursorResult<()> {
        let abandoned = cause.is_some();
        if self.monitor.close(cause.clone()) {
            if abandoned {
                self.store.metrics().increment_abandoned_cursors();
            }
            self.current = None;
            self.candidates.close()?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.monitor.is_closed()
    }
}

impl Drop for EntryCursor<'_> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
