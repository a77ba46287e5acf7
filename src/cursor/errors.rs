//! # Cursor Errors
//!
//! Error types for cursor positioning and lifecycle.

use std::sync::Arc;

use thiserror::Error;

use crate::store::StoreError;

/// Result type for cursor operations
pub type CursorResult<T> = Result<T, CursorError>;

/// Cursor errors
#[derive(Debug, Clone, Error)]
pub enum CursorError {
    /// Positioning or reading after `close()`
    #[error("Cursor closed: cannot {operation}{}", closed_by(.cause))]
    Closed {
        operation: &'static str,
        /// Display form of the error the cursor was closed with, if any
        cause: Option<String>,
    },

    /// `get()` while before the first or after the last element
    #[error("Cursor is not positioned on an element")]
    InvalidPosition,

    /// Operation not supported by the backing table
    #[error("Unsupported cursor operation: {0}")]
    Unsupported(String),

    /// More matching entries than the search allows
    #[error("Size limit of {0} entries exceeded")]
    SizeLimitExceeded(usize),

    /// Failure in the backing table
    #[error("Cursor backend failure: {0}")]
    Backend(String),

    /// The entry store failed under the cursor, or an index id has no
    /// master record
    #[error("Cursor store failure: {0}")]
    Store(#[source] Arc<StoreError>),
}

fn closed_by(cause: &Option<String>) -> String {
    cause
        .as_ref()
        .map(|c| format!(" (closed by: {})", c))
        .unwrap_or_default()
}
