//! Schema error types
//!
//! Error codes:
//! - XDBM_UNDEFINED_ATTRIBUTE_TYPE (REJECT)
//! - XDBM_INVALID_ATTRIBUTE_SYNTAX (REJECT)
//! - XDBM_INAPPROPRIATE_MATCHING (REJECT)
//! - XDBM_SCHEMA_CONFLICT (REJECT)
//! - XDBM_MALFORMED_SCHEMA (FATAL)

use std::fmt;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
    /// Schema files cannot be loaded, the store must not start
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Attribute name or OID not known to the registry
    UndefinedAttributeType,
    /// Value does not conform to the attribute's syntax
    InvalidAttributeSyntax,
    /// Attribute has no matching rule for the requested use
    InappropriateMatching,
    /// Attempt to register an OID or name twice
    SchemaConflict,
    /// Attribute type definition file cannot be read or parsed
    MalformedSchema,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::UndefinedAttributeType => "XDBM_UNDEFINED_ATTRIBUTE_TYPE",
            SchemaErrorCode::InvalidAttributeSyntax => "XDBM_INVALID_ATTRIBUTE_SYNTAX",
            SchemaErrorCode::InappropriateMatching => "XDBM_INAPPROPRIATE_MATCHING",
            SchemaErrorCode::SchemaConflict => "XDBM_SCHEMA_CONFLICT",
            SchemaErrorCode::MalformedSchema => "XDBM_MALFORMED_SCHEMA",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            SchemaErrorCode::MalformedSchema => Severity::Fatal,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error with full context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    /// Attribute the error is about, when known
    attribute: Option<String>,
}

impl SchemaError {
    /// Attribute name or OID not registered
    pub fn undefined_attribute(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            code: SchemaErrorCode::UndefinedAttributeType,
            message: format!("attribute type '{}' is not defined", name),
            attribute: Some(name),
        }
    }

    /// Value rejected by the attribute's normalizer
    pub fn invalid_syntax(
        attribute: impl Into<String>,
        value: &str,
        reason: impl Into<String>,
    ) -> Self {
        let attribute = attribute.into();
        Self {
            code: SchemaErrorCode::InvalidAttributeSyntax,
            message: format!(
                "invalid value '{}' for {}: {}",
                value,
                attribute,
                reason.into()
            ),
            attribute: Some(attribute),
        }
    }

    /// Attribute cannot be indexed or compared for equality
    pub fn no_equality_rule(attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        Self {
            code: SchemaErrorCode::InappropriateMatching,
            message: format!("attribute '{}' has no equality matching rule", attribute),
            attribute: Some(attribute),
        }
    }

    /// OID or name already registered
    pub fn conflict(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            code: SchemaErrorCode::SchemaConflict,
            message: format!("attribute type '{}' is already registered", name),
            attribute: Some(name),
        }
    }

    /// Definition file unreadable or invalid
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::MalformedSchema,
            message: format!("{}: {}", path.into(), reason.into()),
            attribute: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
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

    /// Returns the attribute the error is about
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Returns whether this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SchemaErrorCode::UndefinedAttributeType.code(),
            "XDBM_UNDEFINED_ATTRIBUTE_TYPE"
        );
        assert_eq!(SchemaErrorCode::MalformedSchema.code(), "XDBM_MALFORMED_SCHEMA");
    }

    #[test]
    fn test_only_malformed_is_fatal() {
        assert!(SchemaError::malformed("x.json", "bad").is_fatal());
        assert!(!SchemaError::undefined_attribute("foo").is_fatal());
        assert!(!SchemaError::no_equality_rule("jpegPhoto").is_fatal());
    }

    #[test]
    fn test_diagnostic_names_attribute() {
        let err = SchemaError::no_equality_rule("jpegPhoto");
        assert_eq!(err.attribute(), Some("jpegPhoto"));
        assert!(err.to_string().contains("jpegPhoto"));
        assert!(err.to_string().contains("XDBM_INAPPROPRIATE_MATCHING"));
    }
}
