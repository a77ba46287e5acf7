//! Attribute type descriptors
//!
//! An attribute type is identified by its OID and optionally by one or more
//! names. The equality rule decides whether the attribute can be indexed at
//! all; ordering and substring rules are carried for the search engine.

use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};
use super::matching::MatchingRule;

/// Attribute type definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeType {
    /// Numeric object identifier, e.g. `2.5.4.3`
    pub oid: String,
    /// Short names, first one is the preferred name
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub equality: Option<MatchingRule>,
    #[serde(default)]
    pub ordering: Option<MatchingRule>,
    #[serde(default)]
    pub substring: Option<MatchingRule>,
    #[serde(default)]
    pub single_value: bool,
    #[serde(default = "default_user_modifiable")]
    pub user_modifiable: bool,
}

fn default_user_modifiable() -> bool {
    true
}

impl AttributeType {
    /// Creates a multi-valued, user-modifiable attribute type
    pub fn new(oid: impl Into<String>, names: &[&str], equality: Option<MatchingRule>) -> Self {
        Self {
            oid: oid.into(),
            names: names.iter().map(|n| n.to_string()).collect(),
            equality,
            ordering: None,
            substring: None,
            single_value: false,
            user_modifiable: true,
        }
    }

    /// Marks the attribute single-valued
    pub fn single_valued(mut self) -> Self {
        self.single_value = true;
        self
    }

    /// Marks the attribute operational (not user-modifiable)
    pub fn operational(mut self) -> Self {
        self.user_modifiable = false;
        self
    }

    /// Sets the ordering rule
    pub fn with_ordering(mut self, rule: MatchingRule) -> Self {
        self.ordering = Some(rule);
        self
    }

    /// Sets the substring rule
    pub fn with_substring(mut self, rule: MatchingRule) -> Self {
        self.substring = Some(rule);
        self
    }

    /// Preferred name, falling back to the OID
    pub fn name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or(&self.oid)
    }

    /// Case-insensitive name match
    pub fn has_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    /// Returns the equality rule or an inappropriate-matching error
    pub fn equality_rule(&self) -> SchemaResult<MatchingRule> {
        self.equality
            .ok_or_else(|| SchemaError::no_equality_rule(self.name()))
    }

    /// Checks the definition is well formed.
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.oid.is_empty() {
            return Err("attribute type has an empty OID".to_string());
        }
        let numeric = self
            .oid
            .split('.')
            .all(|arc| !arc.is_empty() && arc.bytes().all(|b| b.is_ascii_digit()));
        if !numeric {
            return Err(format!("'{}' is not a numeric OID", self.oid));
        }
        for name in &self.names {
            let valid = name
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
            if !valid {
                return Err(format!("'{}' is not a valid attribute name", name));
            }
        }
        Ok(())
    }
}
