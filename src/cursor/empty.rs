//! Cursor with no elements

use std::marker::PhantomData;

use super::errors::{CursorError, CursorResult};
use super::monitor::{ClosureMonitor, CloseCause};
use super::Cursor;

/// A cursor that is always exhausted but still honors the close protocol.
#[derive(Debug)]
pub struct EmptyCursor<E> {
    monitor: ClosureMonitor,
    _element: PhantomData<E>,
}

impl<E> EmptyCursor<E> {
    pub fn new() -> Self {
        Self {
            monitor: ClosureMonitor::new(),
            _element: PhantomData,
        }
    }
}

impl<E> Cursor for EmptyCursor<E> {
    type Element = E;

    fn available(&self) -> bool {
        false
    }

    fn before_first(&mut self) -> CursorResult<()> {
        self.monitor.check_not_closed("before_first")
    }

    fn after_last(&mut self) -> CursorResult<()> {
        self.monitor.check_not_closed("after_last")
    }

    fn first(&mut self) -> CursorResult<bool> {
        self.monitor.check_not_closed("first")?;
        Ok(false)
    }

    fn last(&mut self) -> CursorResult<bool> {
        self.monitor.check_not_closed("last")?;
        Ok(false)
    }

    fn next(&mut self) -> CursorResult<bool> {
        self.monitor.check_not_closed("next")?;
        Ok(false)
    }

    fn previous(&mut self) -> CursorResult<bool> {
        self.monitor.check_not_closed("previous")?;
        Ok(false)
    }

    fn get(&self) -> CursorResult<E> {
        self.monitor.check_not_closed("get")?;
        Err(CursorError::InvalidPosition)
    }

    fn close_with_cause(&mut self, cause: Option<CloseCause>) -> CursorResult<()> {
        self.monitor.close(cause);
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
    fn test_always_exhausted() {
        let mut cursor: EmptyCursor<u64> = EmptyCursor::new();
        assert!(!cursor.first().unwrap());
        assert!(!cursor.next().unwrap());
        assert!(matches!(cursor.get(), Err(CursorError::InvalidPosition)));

        cursor.close().unwrap();
        assert!(matches!(cursor.next(), Err(CursorError::Closed { .. })));
    }
}
