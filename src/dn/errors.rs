//! # DN Errors
//!
//! Error types for parsing and normalizing distinguished names.

use thiserror::Error;

/// Result type for DN operations
pub type DnResult<T> = Result<T, DnError>;

/// DN errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnError {
    /// The string is not a valid DN
    #[error("Invalid DN '{dn}': {reason}")]
    InvalidSyntax { dn: String, reason: String },

    /// An RDN attribute type is unknown or cannot be compared
    #[error("Invalid RDN attribute '{attribute}': {reason}")]
    InvalidAttribute { attribute: String, reason: String },

    /// `rebase` was asked to move a DN that is not under the old prefix
    #[error("'{dn}' is not under '{prefix}'")]
    NotUnderPrefix { dn: String, prefix: String },
}

impl DnError {
    pub(crate) fn syntax(dn: &str, reason: impl Into<String>) -> Self {
        DnError::InvalidSyntax {
            dn: dn.to_string(),
            reason: reason.into(),
        }
    }
}
