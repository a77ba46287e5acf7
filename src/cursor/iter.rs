//! Forward-only iterator view over a cursor

use super::errors::CursorResult;
use super::Cursor;

/// Iterator that advances a cursor with `next()` and yields `get()`.
///
/// The first error ends iteration after being yielded.
pub struct CursorIter<'c, C: Cursor + ?Sized> {
    cursor: &'c mut C,
    done: bool,
}

impl<'c, C: Cursor + ?Sized> CursorIter<'c, C> {
    pub fn new(cursor: &'c mut C) -> Self {
        Self {
            cursor,
            done: false,
        }
    }
}

impl<C: Cursor + ?Sized> Iterator for CursorIter<'_, C> {
    type Item = CursorResult<C::Element>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.next() {
            Ok(true) => {
                let item = self.cursor.get();
                if item.is_err() {
                    self.done = true;
                }
                Some(item)
            }
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
