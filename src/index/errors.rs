//! Index error types
//!
//! Error codes:
//! - XDBM_INDEX_NOT_FOUND (RECOVERABLE) - caller falls back to a scan
//! - XDBM_ATTRIBUTE_NOT_INDEXABLE (REJECT)
//! - XDBM_INDEX_WRITE_FAILED (ERROR)
//! - XDBM_INDEX_ASYMMETRY (FATAL)
//! - XDBM_INDEX_BUILD_FAILED (FATAL)

use std::fmt;

use crate::table::TableError;

/// Severity levels for index errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Expected absence, the caller has a fallback
    Recoverable,
    /// Configuration rejected
    Reject,
    /// Operation fails, store continues
    Error,
    /// Index contents cannot be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Recoverable => write!(f, "RECOVERABLE"),
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Index-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// No index is configured for the attribute
    IndexNotFound,
    /// Attribute has no equality matching rule
    NotIndexable,
    /// Forward or reverse table write failed
    WriteFailed,
    /// Forward and reverse tables disagree
    Asymmetry,
    /// Index could not be rebuilt or opened
    BuildFailed,
}

impl IndexErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::IndexNotFound => "XDBM_INDEX_NOT_FOUND",
            IndexErrorCode::NotIndexable => "XDBM_ATTRIBUTE_NOT_INDEXABLE",
            IndexErrorCode::WriteFailed => "XDBM_INDEX_WRITE_FAILED",
            IndexErrorCode::Asymmetry => "XDBM_INDEX_ASYMMETRY",
            IndexErrorCode::BuildFailed => "XDBM_INDEX_BUILD_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            IndexErrorCode::IndexNotFound => Severity::Recoverable,
            IndexErrorCode::NotIndexable => Severity::Reject,
            IndexErrorCode::WriteFailed => Severity::Error,
            IndexErrorCode::Asymmetry => Severity::Fatal,
            IndexErrorCode::BuildFailed => Severity::Fatal,
        }
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with full context
#[derive(Debug)]
pub struct IndexError {
    code: IndexErrorCode,
    message: String,
    /// Index name
    index: Option<String>,
    source: Option<TableError>,
}

impl IndexError {
    /// No index configured for `attribute`
    pub fn not_found(attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        Self {
            code: IndexErrorCode::IndexNotFound,
            message: format!("no index on attribute '{}'", attribute),
            index: Some(attribute),
            source: None,
        }
    }

    /// Attribute cannot be indexed
    pub fn not_indexable(attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        Self {
            code: IndexErrorCode::NotIndexable,
            message: format!(
                "attribute '{}' has no equality matching rule and cannot be indexed",
                attribute
            ),
            index: Some(attribute),
            source: None,
        }
    }

    /// Table write failed; the table error is kept as the source
    pub fn write_failed(index: &str, source: TableError) -> Self {
        let code = if source.is_fatal() {
            IndexErrorCode::BuildFailed
        } else {
            IndexErrorCode::WriteFailed
        };
        Self {
            code,
            message: source.message().to_string(),
            index: Some(index.to_string()),
            source: Some(source),
        }
    }

    /// Forward/reverse mismatch
    pub fn asymmetry(index: &str, reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::Asymmetry,
            message: reason.into(),
            index: Some(index.to_string()),
            source: None,
        }
    }

    /// Index tables could not be opened or rebuilt
    pub fn build_failed(index: &str, source: TableError) -> Self {
        Self {
            code: IndexErrorCode::BuildFailed,
            message: source.message().to_string(),
            index: Some(index.to_string()),
            source: Some(source),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> IndexErrorCode {
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

    /// Returns the index or attribute name
    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Returns true for conditions the caller is expected to handle
    pub fn is_recoverable(&self) -> bool {
        self.severity() == Severity::Recoverable
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        if let Some(ref index) = self.index {
            write!(f, " (index: {})", index)?;
        }
        Ok(())
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_codes() {
        assert_eq!(IndexErrorCode::IndexNotFound.code(), "XDBM_INDEX_NOT_FOUND");
        assert_eq!(IndexErrorCode::Asymmetry.code(), "XDBM_INDEX_ASYMMETRY");
    }

    #[test]
    fn test_not_found_is_recoverable() {
        let err = IndexError::not_found("telephoneNumber");
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_not_indexable_names_attribute() {
        let err = IndexError::not_indexable("jpegPhoto");
        assert_eq!(err.severity(), Severity::Reject);
        assert!(err.to_string().contains("jpegPhoto"));
    }

    #[test]
    fn test_write_failed_keeps_source() {
        let err = IndexError::write_failed("ou", TableError::write_failed("ou.fwd", "disk full", None));
        assert_eq!(err.code(), IndexErrorCode::WriteFailed);
        assert!(err.source().is_some());

        let fatal = IndexError::write_failed("ou", TableError::duplicate_key("ou.fwd", 1));
        assert!(fatal.is_fatal());
    }
}
