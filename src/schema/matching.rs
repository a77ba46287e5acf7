//! Matching rules and their normalizers
//!
//! A matching rule turns a user-provided value into an [`IndexKey`]. Two
//! values match under the rule iff their keys are equal, and the key's
//! ordering is the rule's ordering. Rules are resolved once per attribute
//! type (and thus once per index), never per comparison.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};
use super::registry::SchemaRegistry;
use crate::dn::Dn;
use crate::index::IndexKey;

/// Matching rules understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchingRule {
    #[serde(rename = "objectIdentifierMatch")]
    ObjectIdentifier,
    #[serde(rename = "distinguishedNameMatch")]
    DistinguishedName,
    #[serde(rename = "caseIgnoreMatch")]
    CaseIgnore,
    #[serde(rename = "caseExactMatch")]
    CaseExact,
    #[serde(rename = "caseIgnoreIA5Match")]
    CaseIgnoreIa5,
    #[serde(rename = "booleanMatch")]
    Boolean,
    #[serde(rename = "integerMatch")]
    Integer,
    #[serde(rename = "octetStringMatch")]
    OctetString,
    #[serde(rename = "telephoneNumberMatch")]
    TelephoneNumber,
    #[serde(rename = "uuidMatch")]
    Uuid,
    #[serde(rename = "csnMatch")]
    Csn,
}

impl MatchingRule {
    /// Returns the rule's OID
    pub fn oid(&self) -> &'static str {
        match self {
            MatchingRule::ObjectIdentifier => "2.5.13.0",
            MatchingRule::DistinguishedName => "2.5.13.1",
            MatchingRule::CaseIgnore => "2.5.13.2",
            MatchingRule::CaseExact => "2.5.13.5",
            MatchingRule::CaseIgnoreIa5 => "1.3.6.1.4.1.1466.109.114.2",
            MatchingRule::Boolean => "2.5.13.13",
            MatchingRule::Integer => "2.5.13.14",
            MatchingRule::OctetString => "2.5.13.17",
            MatchingRule::TelephoneNumber => "2.5.13.20",
            MatchingRule::Uuid => "1.3.6.1.1.16.2",
            MatchingRule::Csn => "1.3.6.1.4.1.4203.666.11.2.2",
        }
    }

    /// Returns the rule's descriptive name
    pub fn name(&self) -> &'static str {
        match self {
            MatchingRule::ObjectIdentifier => "objectIdentifierMatch",
            MatchingRule::DistinguishedName => "distinguishedNameMatch",
            MatchingRule::CaseIgnore => "caseIgnoreMatch",
            MatchingRule::CaseExact => "caseExactMatch",
            MatchingRule::CaseIgnoreIa5 => "caseIgnoreIA5Match",
            MatchingRule::Boolean => "booleanMatch",
            MatchingRule::Integer => "integerMatch",
            MatchingRule::OctetString => "octetStringMatch",
            MatchingRule::TelephoneNumber => "telephoneNumberMatch",
            MatchingRule::Uuid => "uuidMatch",
            MatchingRule::Csn => "csnMatch",
        }
    }

    /// Normalizes `value` for attribute `attribute`.
    ///
    /// `schema` is only consulted by `distinguishedNameMatch`, whose values
    /// are DNs that must themselves be normalized.
    pub fn normalize(
        &self,
        attribute: &str,
        value: &str,
        schema: &SchemaRegistry,
    ) -> SchemaResult<IndexKey> {
        match self {
            MatchingRule::ObjectIdentifier => {
                let v = value.trim();
                if v.is_empty() {
                    return Err(SchemaError::invalid_syntax(attribute, value, "empty OID"));
                }
                Ok(IndexKey::Str(v.to_ascii_lowercase()))
            }
            MatchingRule::DistinguishedName => {
                let dn = Dn::parse(value)
                    .and_then(|dn| dn.normalize(schema))
                    .map_err(|e| SchemaError::invalid_syntax(attribute, value, e.to_string()))?;
                Ok(IndexKey::Str(dn.norm_name()))
            }
            MatchingRule::CaseIgnore | MatchingRule::CaseIgnoreIa5 => {
                if *self == MatchingRule::CaseIgnoreIa5 && !value.is_ascii() {
                    return Err(SchemaError::invalid_syntax(attribute, value, "not IA5"));
                }
                Ok(IndexKey::Str(collapse_spaces(value).to_lowercase()))
            }
            MatchingRule::CaseExact => Ok(IndexKey::Str(collapse_spaces(value))),
            MatchingRule::Boolean => match value.trim() {
                "TRUE" => Ok(IndexKey::Bool(true)),
                "FALSE" => Ok(IndexKey::Bool(false)),
                _ => Err(SchemaError::invalid_syntax(
                    attribute,
                    value,
                    "expected TRUE or FALSE",
                )),
            },
            MatchingRule::Integer => value
                .trim()
                .parse::<i64>()
                .map(IndexKey::Int)
                .map_err(|e| SchemaError::invalid_syntax(attribute, value, e.to_string())),
            MatchingRule::OctetString => Ok(IndexKey::Str(value.to_string())),
            MatchingRule::TelephoneNumber => Ok(IndexKey::Str(
                value
                    .chars()
                    .filter(|c| !c.is_whitespace() && *c != '-')
                    .collect::<String>()
                    .to_lowercase(),
            )),
            MatchingRule::Uuid => uuid::Uuid::parse_str(value.trim())
                .map(|u| IndexKey::Str(u.hyphenated().to_string()))
                .map_err(|e| SchemaError::invalid_syntax(attribute, value, e.to_string())),
            MatchingRule::Csn => {
                let v = value.trim();
                if !crate::entry::Csn::is_valid(v) {
                    return Err(SchemaError::invalid_syntax(attribute, value, "malformed CSN"));
                }
                Ok(IndexKey::Str(v.to_string()))
            }
        }
    }

    /// Compares two values under this rule.
    pub fn compare(
        &self,
        attribute: &str,
        a: &str,
        b: &str,
        schema: &SchemaRegistry,
    ) -> SchemaResult<Ordering> {
        Ok(self
            .normalize(attribute, a, schema)?
            .cmp(&self.normalize(attribute, b, schema)?))
    }
}

impl fmt::Display for MatchingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Trims and collapses inner runs of whitespace to one space.
fn collapse_spaces(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SchemaRegistry {
        SchemaRegistry::core()
    }

    #[test]
    fn test_case_ignore_collapses_and_lowercases() {
        let key = MatchingRule::CaseIgnore
            .normalize("cn", "  John   SMITH ", &schema())
            .unwrap();
        assert_eq!(key, IndexKey::from("john smith"));
    }

    #[test]
    fn test_case_exact_preserves_case() {
        let key = MatchingRule::CaseExact
            .normalize("x", " Mixed  Case", &schema())
            .unwrap();
        assert_eq!(key, IndexKey::from("Mixed Case"));
    }

    #[test]
    fn test_integer_orders_numerically() {
        let s = schema();
        assert_eq!(
            MatchingRule::Integer.compare("uidNumber", "9", "10", &s).unwrap(),
            Ordering::Less
        );
        assert!(MatchingRule::Integer.normalize("uidNumber", "ten", &s).is_err());
    }

    #[test]
    fn test_boolean() {
        let s = schema();
        assert_eq!(
            MatchingRule::Boolean.normalize("b", "TRUE", &s).unwrap(),
            IndexKey::Bool(true)
        );
        assert!(MatchingRule::Boolean.normalize("b", "yes", &s).is_err());
    }

    #[test]
    fn test_uuid_canonical_form() {
        let key = MatchingRule::Uuid
            .normalize("entryUUID", "F81D4FAE-7DEC-11D0-A765-00A0C91E6BF6", &schema())
            .unwrap();
        assert_eq!(key, IndexKey::from("f81d4fae-7dec-11d0-a765-00a0c91e6bf6"));
    }

    #[test]
    fn test_telephone_number_ignores_separators() {
        let s = schema();
        assert_eq!(
            MatchingRule::TelephoneNumber.normalize("t", "+1 555-0100", &s).unwrap(),
            MatchingRule::TelephoneNumber.normalize("t", "+15550100", &s).unwrap()
        );
    }

    #[test]
    fn test_dn_values_are_normalized() {
        let key = MatchingRule::DistinguishedName
            .normalize("member", "CN=Bob , OU=People,DC=Example", &schema())
            .unwrap();
        assert_eq!(
            key,
            IndexKey::from("2.5.4.3=bob,2.5.4.11=people,0.9.2342.19200300.100.1.25=example")
        );
    }

    #[test]
    fn test_serde_names() {
        let rule: MatchingRule = serde_json::from_str("\"caseIgnoreMatch\"").unwrap();
        assert_eq!(rule, MatchingRule::CaseIgnore);
        assert_eq!(rule.oid(), "2.5.13.2");
    }
}
