//! Cursor over the tuples of a `BTreeTable`
//!
//! The position is kept as a key/value bound rather than an iterator, so
//! the cursor can be moved in both directions and repositioned without
//! building an intermediate tuple.

use super::mem::BTreeTable;
use super::{Storable, Table};
use crate::cursor::{
    ClosureMonitor, CloseCause, Cursor, CursorError, CursorResult, Tuple, TupleCursor,
};

#[derive(Debug, Clone)]
enum Position<K, V> {
    BeforeFirst,
    AfterLast,
    /// Before every tuple at or above the bound
    Before(K, Option<V>),
    /// After every tuple at or below the bound
    After(K, Option<V>),
    On(K, V),
}

/// Cursor over a sorted table, optionally restricted to one key.
pub struct TableCursor<'t, K, V> {
    table: &'t BTreeTable<K, V>,
    only_key: Option<K>,
    position: Position<K, V>,
    monitor: ClosureMonitor,
}

impl<'t, K: Storable, V: Storable> TableCursor<'t, K, V> {
    pub(crate) fn new(table: &'t BTreeTable<K, V>, only_key: Option<K>) -> Self {
        Self {
            table,
            only_key,
            position: Position::BeforeFirst,
            monitor: ClosureMonitor::new(),
        }
    }

    /// Key the cursor is restricted to, if any
    pub fn only_key(&self) -> Option<&K> {
        self.only_key.as_ref()
    }

    fn in_range(&self, key: &K) -> bool {
        self.only_key.as_ref().map_or(true, |only| only == key)
    }

    fn restricted(&self, found: Option<(K, V)>) -> Option<(K, V)> {
        found.filter(|(k, _)| self.in_range(k))
    }

    fn seek_next(&self) -> Option<(K, V)> {
        let t = self.table;
        let found = match &self.position {
            Position::BeforeFirst => match &self.only_key {
                Some(k) => t.next_tuple(k, None, true),
                None => t.first_tuple(),
            },
            Position::AfterLast => None,
            Position::Before(k, v) => t.next_tuple(k, v.as_ref(), true),
            Position::After(k, v) => t.next_tuple(k, v.as_ref(), false),
            Position::On(k, v) => t.next_tuple(k, Some(v), false),
        };
        self.restricted(found)
    }

    fn seek_previous(&self) -> Option<(K, V)> {
        let t = self.table;
        let found = match &self.position {
            Position::BeforeFirst => None,
            Position::AfterLast => match &self.only_key {
                Some(k) => t.prev_tuple(k, None, true),
                None => t.last_tuple(),
            },
            Position::Before(k, v) => t.prev_tuple(k, v.as_ref(), false),
            Position::After(k, v) => t.prev_tuple(k, v.as_ref(), true),
            Position::On(k, v) => t.prev_tuple(k, Some(v), false),
        };
        self.restricted(found)
    }

    fn check_duplicates(&self, operation: &str) -> CursorResult<()> {
        if !self.table.allows_duplicates() {
            return Err(CursorError::Unsupported(format!(
                "{} on table '{}' without duplicate keys",
                operation,
                self.table.name()
            )));
        }
        Ok(())
    }
}

impl<K: Storable, V: Storable> Cursor for TableCursor<'_, K, V> {
    type Element = Tuple<K, V>;

    fn available(&self) -> bool {
        !self.monitor.is_closed() && matches!(self.position, Position::On(..))
    }

    fn before_first(&mut self) -> CursorResult<()> {
        self.monitor.check_not_closed("before_first")?;
        self.position = Position::BeforeFirst;
        Ok(())
    }

    fn after_last(&mut self) -> CursorResult<()> {
        self.monitor.check_not_closed("after_last")?;
        self.position = Position::AfterLast;
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
        match self.seek_next() {
            Some((k, v)) => {
                self.position = Position::On(k, v);
                Ok(true)
            }
            None => {
                self.position = Position::AfterLast;
                Ok(false)
            }
        }
    }

    fn previous(&mut self) -> CursorResult<bool> {
        self.monitor.check_not_closed("previous")?;
        match self.seek_previous() {
            Some((k, v)) => {
                self.position = Position::On(k, v);
                Ok(true)
            }
            None => {
                self.position = Position::BeforeFirst;
                Ok(false)
            }
        }
    }

    fn get(&self) -> CursorResult<Tuple<K, V>> {
        self.monitor.check_not_closed("get")?;
        match &self.position {
            Position::On(k, v) => Ok(Tuple::new(k.clone(), v.clone())),
            _ => Err(CursorError::InvalidPosition),
        }
    }

    fn close_with_cause(&mut self, cause: Option<CloseCause>) -> CursorResult<()> {
        self.monitor.close(cause);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.monitor.is_closed()
    }
}

impl<K: Storable, V: Storable> TupleCursor<K, V> for TableCursor<'_, K, V> {
    fn before_key(&mut self, key: &K) -> CursorResult<()> {
        self.monitor.check_not_closed("before_key")?;
        self.position = Position::Before(key.clone(), None);
        Ok(())
    }

    fn after_key(&mut self, key: &K) -> CursorResult<()> {
        self.monitor.check_not_closed("after_key")?;
        self.position = Position::After(key.clone(), None);
        Ok(())
    }

    fn before_value(&mut self, key: &K, value: &V) -> CursorResult<()> {
        self.monitor.check_not_closed("before_value")?;
        self.check_duplicates("before_value")?;
        self.position = Position::Before(key.clone(), Some(value.clone()));
        Ok(())
    }

    fn after_value(&mut self, key: &K, value: &V) -> CursorResult<()> {
        self.monitor.check_not_closed("after_value")?;
        self.check_duplicates("after_value")?;
        self.position = Position::After(key.clone(), Some(value.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> BTreeTable<u64, u64> {
        let mut table = BTreeTable::new("one_level", true);
        for (k, v) in [(1, 10), (2, 20), (2, 21), (2, 22), (3, 30)] {
            table.put(k, v).unwrap();
        }
        table
    }

    #[test]
    fn test_full_scan_both_ways() {
        let table = table();
        let mut cursor = table.cursor();

        let forward: Vec<u64> = cursor.iter().map(|t| t.unwrap().value).collect();
        assert_eq!(forward, vec![10, 20, 21, 22, 30]);

        cursor.after_last().unwrap();
        let mut backward = Vec::new();
        while cursor.previous().unwrap() {
            backward.push(cursor.get().unwrap().value);
        }
        assert_eq!(backward, vec![30, 22, 21, 20, 10]);
    }

    #[test]
    fn test_before_and_after_key() {
        let table = table();
        let mut cursor = table.cursor();

        cursor.before_key(&2).unwrap();
        assert!(cursor.next().unwrap());
        assert_eq!(cursor.get().unwrap(), Tuple::new(2, 20));

        cursor.after_key(&2).unwrap();
        assert!(cursor.next().unwrap());
        assert_eq!(cursor.get().unwrap(), Tuple::new(3, 30));

        cursor.after_key(&3).unwrap();
        assert!(!cursor.next().unwrap());

        cursor.before_key(&2).unwrap();
        assert!(cursor.previous().unwrap());
        assert_eq!(cursor.get().unwrap(), Tuple::new(1, 10));
    }

    #[test]
    fn test_before_and_after_value() {
        let table = table();
        let mut cursor = table.cursor();

        cursor.before_value(&2, &21).unwrap();
        assert!(cursor.next().unwrap());
        assert_eq!(cursor.get().unwrap(), Tuple::new(2, 21));

        cursor.after_value(&2, &21).unwrap();
        assert!(cursor.next().unwrap());
        assert_eq!(cursor.get().unwrap(), Tuple::new(2, 22));

        cursor.after_value(&2, &21).unwrap();
        assert!(cursor.previous().unwrap());
        assert_eq!(cursor.get().unwrap(), Tuple::new(2, 21));
    }

    #[test]
    fn test_value_positioning_needs_duplicates() {
        let mut table: BTreeTable<u64, u64> = BTreeTable::new("master", false);
        table.put(1, 1).unwrap();
        let mut cursor = table.cursor();
        assert!(matches!(
            cursor.before_value(&1, &1),
            Err(CursorError::Unsupported(_))
        ));
    }

    #[test]
    fn test_restricted_to_key() {
        let table = table();
        let mut cursor = table.cursor_for(&2);

        let values: Vec<u64> = cursor.iter().map(|t| t.unwrap().value).collect();
        assert_eq!(values, vec![20, 21, 22]);

        assert!(cursor.last().unwrap());
        assert_eq!(cursor.get().unwrap().value, 22);

        let mut missing = table.cursor_for(&9);
        assert!(!missing.first().unwrap());
    }

    #[test]
    fn test_closed_cursor() {
        let table = table();
        let mut cursor = table.cursor();
        assert!(cursor.first().unwrap());
        cursor.close().unwrap();
        cursor.close().unwrap();

        assert!(!cursor.available());
        assert!(matches!(cursor.next(), Err(CursorError::Closed { .. })));
        assert!(matches!(cursor.before_key(&1), Err(CursorError::Closed { .. })));
        assert!(matches!(cursor.get(), Err(CursorError::Closed { .. })));
    }
}
