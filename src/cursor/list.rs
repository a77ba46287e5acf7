//! Cursor over a materialized, ordered list

use super::errors::{CursorError, CursorResult};
use super::monitor::{ClosureMonitor, CloseCause};
use super::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    BeforeFirst,
    On(usize),
    AfterLast,
}

/// Cursor over elements collected up front.
///
/// Used for candidate sets that are not a single index range (base scope,
/// alias dereferencing) and for tests.
#[derive(Debug)]
pub struct ListCursor<E> {
    elements: Vec<E>,
    position: Position,
    monitor: ClosureMonitor,
}

impl<E: Clone> ListCursor<E> {
    pub fn new(elements: Vec<E>) -> Self {
        Self {
            elements,
            position: Position::BeforeFirst,
            monitor: ClosureMonitor::new(),
        }
    }

    /// Cursor over exactly one element
    pub fn singleton(element: E) -> Self {
        Self::new(vec![element])
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<E: Clone> Cursor for ListCursor<E> {
    type Element = E;

    fn available(&self) -> bool {
        !self.monitor.is_closed() && matches!(self.position, Position::On(_))
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
        let next = match self.position {
            Position::BeforeFirst => 0,
            Position::On(i) => i + 1,
            Position::AfterLast => return Ok(false),
        };
        if next < self.elements.len() {
            self.position = Position::On(next);
            Ok(true)
        } else {
            self.position = Position::AfterLast;
            Ok(false)
        }
    }

    fn previous(&mut self) -> CursorResult<bool> {
        self.monitor.check_not_closed("previous")?;
        let current = match self.position {
            Position::BeforeFirst => return Ok(false),
            Position::On(i) => i,
            Position::AfterLast => self.elements.len(),
        };
        if current > 0 {
            self.position = Position::On(current - 1);
            Ok(true)
        } else {
            self.position = Position::BeforeFirst;
            Ok(false)
        }
    }

    fn get(&self) -> CursorResult<E> {
        self.monitor.check_not_closed("get")?;
        match self.position {
            Position::On(i) => Ok(self.elements[i].clone()),
            _ => Err(CursorError::InvalidPosition),
        }
    }

    fn close_with_cause(&mut self, cause: Option<CloseCause>) -> CursorResult<()> {
        if self.monitor.close(cause) {
            self.elements.clear();
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.monitor.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_and_backward() {
        let mut cursor = ListCursor::new(vec![1, 2, 3]);
        assert!(!cursor.available());

        let forward: Vec<i32> = cursor.iter().map(|r| r.unwrap()).collect();
        assert_eq!(forward, vec![1, 2, 3]);

        assert!(cursor.last().unwrap());
        assert_eq!(cursor.get().unwrap(), 3);
        assert!(cursor.previous().unwrap());
        assert_eq!(cursor.get().unwrap(), 2);
        assert!(cursor.previous().unwrap());
        assert!(!cursor.previous().unwrap());
        assert!(matches!(cursor.get(), Err(CursorError::InvalidPosition)));
    }

    #[test]
    fn test_empty_list() {
        let mut cursor: ListCursor<i32> = ListCursor::new(vec![]);
        assert!(!cursor.first().unwrap());
        assert!(!cursor.last().unwrap());
    }

    #[test]
    fn test_closed_guard() {
        let mut cursor = ListCursor::singleton("a");
        cursor.close().unwrap();
        cursor.close().unwrap();
        assert!(cursor.is_closed());
        assert!(matches!(cursor.next(), Err(CursorError::Closed { .. })));
        assert!(matches!(cursor.before_first(), Err(CursorError::Closed { .. })));
    }
}
