//! Normalized index keys
//!
//! An `IndexKey` is the canonical form of an attribute value produced by the
//! attribute's equality matching rule. Its `Ord` is the comparator every
//! attribute index sorts by, so the ordering is fixed when the key is built
//! and never re-resolved per comparison.
//!
//! Ordering across variants is deterministic: Bool < Int < Str.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized attribute value used as a forward-table key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexKey {
    /// booleanMatch values (FALSE < TRUE)
    Bool(bool),
    /// integerMatch values, ordered numerically
    Int(i64),
    /// Every string-based matching rule
    Str(String),
}

impl IndexKey {
    /// Create a key from a boolean
    pub fn from_bool(v: bool) -> Self {
        IndexKey::Bool(v)
    }

    /// Create a key from an integer
    pub fn from_int(v: i64) -> Self {
        IndexKey::Int(v)
    }

    /// Create a key from an already-normalized string
    pub fn from_string(v: impl Into<String>) -> Self {
        IndexKey::Str(v.into())
    }

    /// Returns the string payload, if this is a string key
    pub fn as_str(&self) -> Option<&str> {
        match self {
            IndexKey::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Canonical textual form, as used inside normalized DNs.
    pub fn to_canonical_string(&self) -> String {
        match self {
            IndexKey::Bool(true) => "TRUE".to_string(),
            IndexKey::Bool(false) => "FALSE".to_string(),
            IndexKey::Int(i) => i.to_string(),
            IndexKey::Str(s) => s.clone(),
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl From<&str> for IndexKey {
    fn from(v: &str) -> Self {
        IndexKey::Str(v.to_string())
    }
}

impl From<i64> for IndexKey {
    fn from(v: i64) -> Self {
        IndexKey::Int(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ordering() {
        let keys = vec![
            IndexKey::from_bool(false),
            IndexKey::from_bool(true),
            IndexKey::from_int(-100),
            IndexKey::from_int(0),
            IndexKey::from_int(100),
            IndexKey::from_string("aaa"),
            IndexKey::from_string("zzz"),
        ];

        for i in 1..keys.len() {
            assert!(keys[i - 1] < keys[i], "Keys should be ordered");
        }
    }

    #[test]
    fn test_integers_order_numerically() {
        assert!(IndexKey::from_int(9) < IndexKey::from_int(10));
        // As strings these would sort the other way round.
        assert!(IndexKey::from_string("9") > IndexKey::from_string("10"));
    }

    #[test]
    fn test_canonical_string() {
        assert_eq!(IndexKey::from_bool(true).to_canonical_string(), "TRUE");
        assert_eq!(IndexKey::from_int(-7).to_canonical_string(), "-7");
        assert_eq!(IndexKey::from("people").to_canonical_string(), "people");
    }
}
