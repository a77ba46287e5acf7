//! Sorted table error types
//!
//! Error codes:
//! - XDBM_TABLE_IO_ERROR (ERROR)
//! - XDBM_TABLE_WRITE_FAILED (ERROR)
//! - XDBM_TABLE_READ_FAILED (ERROR)
//! - XDBM_DUPLICATE_KEY (FATAL)
//! - XDBM_DATA_CORRUPTION (FATAL)

use std::fmt;
use std::io;

/// Severity levels for table errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, store continues
    Error,
    /// Table contents cannot be trusted, the store must stop
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Table-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableErrorCode {
    /// Disk I/O failure
    IoError,
    /// Write to a table failed
    WriteFailed,
    /// Table file could not be read
    ReadFailed,
    /// Second value put under a key of a table without duplicates
    DuplicateKey,
    /// Checksum mismatch or truncated table file
    DataCorruption,
}

impl TableErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            TableErrorCode::IoError => "XDBM_TABLE_IO_ERROR",
            TableErrorCode::WriteFailed => "XDBM_TABLE_WRITE_FAILED",
            TableErrorCode::ReadFailed => "XDBM_TABLE_READ_FAILED",
            TableErrorCode::DuplicateKey => "XDBM_DUPLICATE_KEY",
            TableErrorCode::DataCorruption => "XDBM_DATA_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            TableErrorCode::IoError => Severity::Error,
            TableErrorCode::WriteFailed => Severity::Error,
            TableErrorCode::ReadFailed => Severity::Error,
            TableErrorCode::DuplicateKey => Severity::Fatal,
            TableErrorCode::DataCorruption => Severity::Fatal,
        }
    }
}

impl fmt::Display for TableErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Table error with full context
#[derive(Debug)]
pub struct TableError {
    code: TableErrorCode,
    message: String,
    /// Table the error occurred in
    table: Option<String>,
    /// Underlying IO error if applicable
    source: Option<io::Error>,
}

impl TableError {
    /// Create a new table I/O error
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: TableErrorCode::IoError,
            message: message.into(),
            table: None,
            source: Some(source),
        }
    }

    /// Create a write failure, optionally caused by an I/O error
    pub fn write_failed(
        table: &str,
        message: impl Into<String>,
        source: Option<io::Error>,
    ) -> Self {
        Self {
            code: TableErrorCode::WriteFailed,
            message: message.into(),
            table: Some(table.to_string()),
            source,
        }
    }

    /// Create a read failure
    pub fn read_failed(table: &str, message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: TableErrorCode::ReadFailed,
            message: message.into(),
            table: Some(table.to_string()),
            source: Some(source),
        }
    }

    /// Create a duplicate key error (FATAL)
    pub fn duplicate_key(table: &str, key: impl fmt::Debug) -> Self {
        Self {
            code: TableErrorCode::DuplicateKey,
            message: format!("key {:?} already holds a different value", key),
            table: Some(table.to_string()),
            source: None,
        }
    }

    /// Create a data corruption error (FATAL)
    pub fn data_corruption(table: &str, message: impl Into<String>) -> Self {
        Self {
            code: TableErrorCode::DataCorruption,
            message: message.into(),
            table: Some(table.to_string()),
            source: None,
        }
    }

    /// Create a data corruption error with byte offset context
    pub fn corruption_at_offset(table: &str, offset: u64, reason: impl Into<String>) -> Self {
        Self {
            code: TableErrorCode::DataCorruption,
            message: format!("{} (byte_offset: {})", reason.into(), offset),
            table: Some(table.to_string()),
            source: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> TableErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the table name, if known
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Returns whether this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref table) = self.table {
            write!(f, " (table: {})", table)?;
        }
        Ok(())
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;
