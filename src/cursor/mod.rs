//! Cursors over sorted tables, indices and entries
//!
//! # Design Principles
//!
//! - Positioning is primary, iteration is derived (`Cursor::iter`)
//! - A cursor is a scoped resource: closed exactly once, optionally with
//!   the error that caused it to be abandoned
//! - Every positioning call fails with `Closed` after close
//!
//! ```ignore
//! let mut cursor = index.forward_cursor_for(&key)?;
//! cursor.before_first()?;
//! while cursor.next()? {
//!     let entry = cursor.get()?;
//! }
//! cursor.close()?;
//! ```

mod empty;
mod errors;
mod iter;
mod list;
mod monitor;
mod tuple;

pub use empty::EmptyCursor;
pub use errors::{CursorError, CursorResult};
pub use iter::CursorIter;
pub use list::ListCursor;
pub use monitor::{CloseCause, ClosureMonitor};
pub use tuple::Tuple;

/// Positionable cursor.
///
/// A fresh cursor is positioned before the first element.
pub trait Cursor {
    type Element;

    /// True when positioned on an element that `get` can return
    fn available(&self) -> bool;

    fn before_first(&mut self) -> CursorResult<()>;

    fn after_last(&mut self) -> CursorResult<()>;

    /// Moves to the first element; false if there is none
    fn first(&mut self) -> CursorResult<bool>;

    /// Moves to the last element; false if there is none
    fn last(&mut self) -> CursorResult<bool>;

    fn next(&mut self) -> CursorResult<bool>;

    fn previous(&mut self) -> CursorResult<bool>;

    /// The element under the cursor
    fn get(&self) -> CursorResult<Self::Element>;

    /// Closes the cursor voluntarily
    fn close(&mut self) -> CursorResult<()> {
        self.close_with_cause(None)
    }

    /// Closes the cursor, recording the error that caused it to be abandoned.
    ///
    /// Closing twice is not an error; resources are released once.
    fn close_with_cause(&mut self, cause: Option<CloseCause>) -> CursorResult<()>;

    fn is_closed(&self) -> bool;

    /// Forward-only view from the current position
    fn iter(&mut self) -> CursorIter<'_, Self>
    where
        Self: Sized,
    {
        CursorIter::new(self)
    }
}

/// Cursor over `(key, value)` tuples that can jump straight to a key or to
/// one value under a key.
pub trait TupleCursor<K, V>: Cursor<Element = Tuple<K, V>> {
    /// Positions before every tuple with `key`
    fn before_key(&mut self, key: &K) -> CursorResult<()>;

    /// Positions after every tuple with `key`
    fn after_key(&mut self, key: &K) -> CursorResult<()>;

    /// Positions before `(key, value)`; unsupported without duplicate keys
    fn before_value(&mut self, key: &K, value: &V) -> CursorResult<()>;

    /// Positions after `(key, value)`; unsupported without duplicate keys
    fn after_value(&mut self, key: &K, value: &V) -> CursorResult<()>;
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    type Element = C::Element;

    fn available(&self) -> bool {
        (**self).available()
    }

    fn before_first(&mut self) -> CursorResult<()> {
        (**self).before_first()
    }

    fn after_last(&mut self) -> CursorResult<()> {
        (**self).after_last()
    }

    fn first(&mut self) -> CursorResult<bool> {
        (**self).first()
    }

    fn last(&mut self) -> CursorResult<bool> {
        (**self).last()
    }

    fn next(&mut self) -> CursorResult<bool> {
        (**self).next()
    }

    fn previous(&mut self) -> CursorResult<bool> {
        (**self).previous()
    }

    fn get(&self) -> CursorResult<Self::Element> {
        (**self).get()
    }

    fn close_with_cause(&mut self, cause: Option<CloseCause>) -> CursorResult<()> {
        (**self).close_with_cause(cause)
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}
