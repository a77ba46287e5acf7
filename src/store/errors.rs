//! Store error types
//!
//! Every code maps to the LDAP result code the protocol layer reports.
//!
//! Error codes:
//! - XDBM_NO_SUCH_OBJECT (REJECT) - noSuchObject (32)
//! - XDBM_ENTRY_ALREADY_EXISTS (REJECT) - entryAlreadyExists (68)
//! - XDBM_NOT_ALLOWED_ON_NON_LEAF (REJECT) - notAllowedOnNonLeaf (66)
//! - XDBM_UNWILLING_TO_PERFORM (REJECT) - unwillingToPerform (53)
//! - XDBM_ALIAS_PROBLEM (REJECT) - aliasProblem (33)
//! - XDBM_INDEX_NOT_FOUND (RECOVERABLE) - caller falls back to a scan
//! - XDBM_ILLEGAL_STATE (FATAL) - lifecycle or configuration misuse
//! - XDBM_INTEGRITY_VIOLATION (FATAL) - master and indices disagree
//! - XDBM_WRITE_FAILED (ERROR) - rolled back, nothing applied

use std::error::Error;
use std::fmt;

use crate::dn::DnError;
use crate::entry::EntryError;
use crate::index::{IndexError, IndexErrorCode};
use crate::schema::{SchemaError, SchemaErrorCode};
use crate::table::{TableError, TableErrorCode};

/// Severity levels for store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Expected absence, the caller has a fallback
    Recoverable,
    /// Request rejected, no partial effect
    Reject,
    /// Operation failed and was rolled back
    Error,
    /// Store contents or lifecycle cannot be trusted
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

/// Store-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    NoSuchObject,
    EntryAlreadyExists,
    NotAllowedOnNonLeaf,
    UnwillingToPerform,
    AliasProblem,
    AttributeOrValueExists,
    NoSuchAttribute,
    NotAllowedOnRdn,
    ConstraintViolation,
    ObjectClassViolation,
    InvalidDnSyntax,
    InvalidAttributeSyntax,
    UndefinedAttributeType,
    InappropriateMatching,
    /// No user index on the attribute
    IndexNotFound,
    /// Configuration file unreadable or invalid
    InvalidConfig,
    /// Store used outside its lifecycle, or a protected property changed
    IllegalState,
    /// A table or index write failed; the operation was rolled back
    WriteFailed,
    /// Master table and indices disagree
    IntegrityViolation,
    /// Persisted table failed validation
    DataCorruption,
}

impl StoreErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorCode::NoSuchObject => "XDBM_NO_SUCH_OBJECT",
            StoreErrorCode::EntryAlreadyExists => "XDBM_ENTRY_ALREADY_EXISTS",
            StoreErrorCode::NotAllowedOnNonLeaf => "XDBM_NOT_ALLOWED_ON_NON_LEAF",
            StoreErrorCode::UnwillingToPerform => "XDBM_UNWILLING_TO_PERFORM",
            StoreErrorCode::AliasProblem => "XDBM_ALIAS_PROBLEM",
            StoreErrorCode::AttributeOrValueExists => "XDBM_ATTRIBUTE_OR_VALUE_EXISTS",
            StoreErrorCode::NoSuchAttribute => "XDBM_NO_SUCH_ATTRIBUTE",
            StoreErrorCode::NotAllowedOnRdn => "XDBM_NOT_ALLOWED_ON_RDN",
            StoreErrorCode::ConstraintViolation => "XDBM_CONSTRAINT_VIOLATION",
            StoreErrorCode::ObjectClassViolation => "XDBM_OBJECT_CLASS_VIOLATION",
            StoreErrorCode::InvalidDnSyntax => "XDBM_INVALID_DN_SYNTAX",
            StoreErrorCode::InvalidAttributeSyntax => "XDBM_INVALID_ATTRIBUTE_SYNTAX",
            StoreErrorCode::UndefinedAttributeType => "XDBM_UNDEFINED_ATTRIBUTE_TYPE",
            StoreErrorCode::InappropriateMatching => "XDBM_INAPPROPRIATE_MATCHING",
            StoreErrorCode::IndexNotFound => "XDBM_INDEX_NOT_FOUND",
            StoreErrorCode::InvalidConfig => "XDBM_INVALID_CONFIG",
            StoreErrorCode::IllegalState => "XDBM_ILLEGAL_STATE",
            StoreErrorCode::WriteFailed => "XDBM_WRITE_FAILED",
            StoreErrorCode::IntegrityViolation => "XDBM_INTEGRITY_VIOLATION",
            StoreErrorCode::DataCorruption => "XDBM_DATA_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StoreErrorCode::IndexNotFound => Severity::Recoverable,
            StoreErrorCode::WriteFailed => Severity::Error,
            StoreErrorCode::IllegalState
            | StoreErrorCode::IntegrityViolation
            | StoreErrorCode::DataCorruption => Severity::Fatal,
            _ => Severity::Reject,
        }
    }

    /// LDAP result code reported for this condition
    pub fn result_code(&self) -> u32 {
        match self {
            StoreErrorCode::NoSuchAttribute => 16,
            StoreErrorCode::UndefinedAttributeType => 17,
            StoreErrorCode::InappropriateMatching => 18,
            StoreErrorCode::ConstraintViolation => 19,
            StoreErrorCode::AttributeOrValueExists => 20,
            StoreErrorCode::InvalidAttributeSyntax => 21,
            StoreErrorCode::NoSuchObject => 32,
            StoreErrorCode::AliasProblem => 33,
            StoreErrorCode::InvalidDnSyntax => 34,
            StoreErrorCode::UnwillingToPerform => 53,
            StoreErrorCode::ObjectClassViolation => 65,
            StoreErrorCode::NotAllowedOnNonLeaf => 66,
            StoreErrorCode::NotAllowedOnRdn => 67,
            StoreErrorCode::EntryAlreadyExists => 68,
            _ => 80,
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Store error with full context
#[derive(Debug)]
pub struct StoreError {
    code: StoreErrorCode,
    message: String,
    /// DN the operation targeted, when known
    dn: Option<String>,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl StoreError {
    /// Creates an error with an explicit code
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            dn: None,
            source: None,
        }
    }

    /// Attaches the target DN
    pub fn with_dn(mut self, dn: impl Into<String>) -> Self {
        self.dn = Some(dn.into());
        self
    }

    fn caused_by(mut self, source: impl Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn no_such_object(dn: impl Into<String>) -> Self {
        let dn = dn.into();
        Self::new(StoreErrorCode::NoSuchObject, format!("no entry at '{}'", dn)).with_dn(dn)
    }

    pub fn no_such_id(id: impl fmt::Display) -> Self {
        Self::new(StoreErrorCode::NoSuchObject, format!("no entry with id {}", id))
    }

    pub fn already_exists(dn: impl Into<String>) -> Self {
        let dn = dn.into();
        Self::new(
            StoreErrorCode::EntryAlreadyExists,
            format!("an entry already exists at '{}'", dn),
        )
        .with_dn(dn)
    }

    pub fn not_leaf(dn: impl Into<String>, children: usize) -> Self {
        let dn = dn.into();
        Self::new(
            StoreErrorCode::NotAllowedOnNonLeaf,
            format!("'{}' has {} children", dn, children),
        )
        .with_dn(dn)
    }

    pub fn unwilling(reason: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::UnwillingToPerform, reason)
    }

    pub fn alias_problem(dn: impl Into<String>, reason: impl Into<String>) -> Self {
        let dn = dn.into();
        Self::new(
            StoreErrorCode::AliasProblem,
            format!("alias '{}': {}", dn, reason.into()),
        )
        .with_dn(dn)
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::InvalidConfig, reason)
    }

    /// Lifecycle misuse, including changing a protected property
    pub fn illegal_state(reason: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::IllegalState, reason)
    }

    /// A write failed and the applied prefix was rolled back
    pub fn write_failed(reason: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        Self::new(StoreErrorCode::WriteFailed, reason).caused_by(source)
    }

    pub fn integrity(reason: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::IntegrityViolation, reason)
    }

    /// Integrity violation keeping the failure that caused it
    pub fn integrity_caused_by(
        reason: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self::integrity(reason).caused_by(source)
    }

    /// Returns the error code
    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the LDAP result code
    pub fn result_code(&self) -> u32 {
        self.code.result_code()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the target DN, if known
    pub fn dn(&self) -> Option<&str> {
        self.dn.as_deref()
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

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        if let Some(ref dn) = self.dn {
            write!(f, " (dn: {})", dn)?;
        }
        Ok(())
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<EntryError> for StoreError {
    fn from(err: EntryError) -> Self {
        let code = match &err {
            EntryError::AttributeOrValueExists { .. } => StoreErrorCode::AttributeOrValueExists,
            EntryError::NoSuchAttribute { .. } => StoreErrorCode::NoSuchAttribute,
            EntryError::NotAllowedOnRdn { .. } => StoreErrorCode::NotAllowedOnRdn,
            EntryError::ConstraintViolation { .. } => StoreErrorCode::ConstraintViolation,
            EntryError::ObjectClassViolation(_) => StoreErrorCode::ObjectClassViolation,
            EntryError::Schema(e) => return e.clone().into(),
            EntryError::Dn(e) => return e.clone().into(),
        };
        Self::new(code, err.to_string())
    }
}

impl From<SchemaError> for StoreError {
    fn from(err: SchemaError) -> Self {
        let code = match err.code() {
            SchemaErrorCode::UndefinedAttributeType => StoreErrorCode::UndefinedAttributeType,
            SchemaErrorCode::InvalidAttributeSyntax => StoreErrorCode::InvalidAttributeSyntax,
            SchemaErrorCode::InappropriateMatching => StoreErrorCode::InappropriateMatching,
            SchemaErrorCode::SchemaConflict | SchemaErrorCode::MalformedSchema => {
                StoreErrorCode::InvalidConfig
            }
        };
        Self::new(code, err.message().to_string())
    }
}

impl From<DnError> for StoreError {
    fn from(err: DnError) -> Self {
        let code = match &err {
            DnError::InvalidSyntax { .. } | DnError::NotUnderPrefix { .. } => {
                StoreErrorCode::InvalidDnSyntax
            }
            DnError::InvalidAttribute { .. } => StoreErrorCode::UndefinedAttributeType,
        };
        Self::new(code, err.to_string())
    }
}

impl From<IndexError> for StoreError {
    fn from(err: IndexError) -> Self {
        let code = match err.code() {
            IndexErrorCode::IndexNotFound => StoreErrorCode::IndexNotFound,
            IndexErrorCode::NotIndexable => StoreErrorCode::InappropriateMatching,
            IndexErrorCode::WriteFailed => StoreErrorCode::WriteFailed,
            IndexErrorCode::Asymmetry => StoreErrorCode::IntegrityViolation,
            IndexErrorCode::BuildFailed => StoreErrorCode::DataCorruption,
        };
        Self::new(code, err.message().to_string()).caused_by(err)
    }
}

impl From<TableError> for StoreError {
    fn from(err: TableError) -> Self {
        let code = match err.code() {
            TableErrorCode::DuplicateKey => StoreErrorCode::IntegrityViolation,
            TableErrorCode::DataCorruption => StoreErrorCode::DataCorruption,
            _ => StoreErrorCode::WriteFailed,
        };
        Self::new(code, err.message().to_string()).caused_by(err)
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
