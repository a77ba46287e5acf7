//! # Entry Errors
//!
//! Conditions raised while building or modifying an entry. Each one maps to
//! an LDAP result code at the store boundary.

use thiserror::Error;

use crate::dn::DnError;
use crate::schema::SchemaError;

/// Result type for entry operations
pub type EntryResult<T> = Result<T, EntryError>;

/// Entry errors
#[derive(Debug, Clone, Error)]
pub enum EntryError {
    /// Value already present on add
    #[error("Value '{value}' already exists in {attribute}")]
    AttributeOrValueExists { attribute: String, value: String },

    /// Removal of an absent attribute or value
    #[error("No such attribute or value: {attribute}")]
    NoSuchAttribute { attribute: String },

    /// Modification would remove a value used in the entry's RDN
    #[error("Cannot remove RDN value of {attribute}")]
    NotAllowedOnRdn { attribute: String },

    /// Single-value, user-modifiable or empty-value constraint
    #[error("Constraint violation on {attribute}: {reason}")]
    ConstraintViolation { attribute: String, reason: String },

    /// Entry would be left without an objectClass
    #[error("Object class violation: {0}")]
    ObjectClassViolation(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Dn(#[from] DnError),
}
