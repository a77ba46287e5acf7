//! Closure monitor shared by every cursor implementation

use std::error::Error;
use std::sync::Arc;

use super::errors::{CursorError, CursorResult};
use crate::observability::{Event, Logger};

/// Error a cursor was closed with
pub type CloseCause = Arc<dyn Error + Send + Sync>;

/// Tracks whether a cursor has been closed and why.
///
/// Every positioning call checks the monitor first.
#[derive(Debug, Default)]
pub struct ClosureMonitor {
    closed: bool,
    cause: Option<CloseCause>,
}

impl ClosureMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with `Closed` once the cursor has been closed
    pub fn check_not_closed(&self, operation: &'static str) -> CursorResult<()> {
        if self.closed {
            return Err(CursorError::Closed {
                operation,
                cause: self.cause.as_ref().map(|c| c.to_string()),
            });
        }
        Ok(())
    }

    /// Marks the cursor closed. Returns true only on the first call, so
    /// resources are released once.
    pub fn close(&mut self, cause: Option<CloseCause>) -> bool {
        if self.closed {
            return false;
        }
        if let Some(cause) = &cause {
            Logger::warn(
                Event::CursorAbandoned.as_str(),
                &[("cause", &cause.to_string())],
            );
        }
        self.closed = true;
        self.cause = cause;
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn cause(&self) -> Option<&CloseCause> {
        self.cause.as_ref()
    }
}
