//! Attribute type registry
//!
//! The registry is built once and handed to the store explicitly (behind an
//! `Arc`). There is no process-wide schema state.

use std::collections::HashMap;
use std::sync::Arc;

use super::errors::{SchemaError, SchemaResult};
use super::matching::MatchingRule;
use super::types::AttributeType;
use crate::index::IndexKey;

pub const OBJECT_CLASS_OID: &str = "2.5.4.0";
pub const ALIASED_OBJECT_NAME_OID: &str = "2.5.4.1";
pub const ENTRY_UUID_OID: &str = "1.3.6.1.1.16.4";
pub const ENTRY_CSN_OID: &str = "1.3.6.1.4.1.4203.666.1.7";

/// Normalized objectClass value marking alias entries
pub const ALIAS_OBJECT_CLASS: &str = "alias";

/// Registry of attribute types, addressable by OID or case-insensitive name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    by_oid: HashMap<String, Arc<AttributeType>>,
    /// lowercase name -> OID
    by_name: HashMap<String, String>,
}

impl SchemaRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the attribute types every partition relies on.
    pub fn core() -> Self {
        use MatchingRule::*;

        let types = vec![
            AttributeType::new(OBJECT_CLASS_OID, &["objectClass"], Some(ObjectIdentifier)),
            AttributeType::new(ALIASED_OBJECT_NAME_OID, &["aliasedObjectName", "aliasedEntryName"], Some(DistinguishedName))
                .single_valued(),
            AttributeType::new("2.5.4.3", &["cn", "commonName"], Some(CaseIgnore)).with_substring(CaseIgnore),
            AttributeType::new("2.5.4.4", &["sn", "surname"], Some(CaseIgnore)).with_substring(CaseIgnore),
            AttributeType::new("2.5.4.7", &["l", "localityName"], Some(CaseIgnore)),
            AttributeType::new("2.5.4.10", &["o", "organizationName"], Some(CaseIgnore)),
            AttributeType::new("2.5.4.11", &["ou", "organizationalUnitName"], Some(CaseIgnore))
                .with_substring(CaseIgnore),
            AttributeType::new("2.5.4.12", &["title"], Some(CaseIgnore)),
            AttributeType::new("2.5.4.13", &["description"], Some(CaseIgnore)),
            AttributeType::new("2.5.4.20", &["telephoneNumber"], Some(TelephoneNumber)),
            AttributeType::new("2.5.4.31", &["member"], Some(DistinguishedName)),
            AttributeType::new("2.5.4.35", &["userPassword"], Some(OctetString)),
            AttributeType::new("2.5.4.42", &["givenName", "gn"], Some(CaseIgnore)),
            AttributeType::new("0.9.2342.19200300.100.1.1", &["uid", "userid"], Some(CaseIgnore)),
            AttributeType::new("0.9.2342.19200300.100.1.3", &["mail", "rfc822Mailbox"], Some(CaseIgnoreIa5)),
            AttributeType::new("0.9.2342.19200300.100.1.25", &["dc", "domainComponent"], Some(CaseIgnoreIa5))
                .single_valued(),
            AttributeType::new("0.9.2342.19200300.100.1.60", &["jpegPhoto"], None),
            AttributeType::new("1.3.6.1.1.1.1.0", &["uidNumber"], Some(Integer))
                .with_ordering(Integer)
                .single_valued(),
            AttributeType::new("1.3.6.1.1.1.1.1", &["gidNumber"], Some(Integer))
                .with_ordering(Integer)
                .single_valued(),
            AttributeType::new("2.16.840.1.113730.3.1.3", &["employeeNumber"], Some(CaseIgnore)).single_valued(),
            AttributeType::new(ENTRY_UUID_OID, &["entryUUID"], Some(Uuid))
                .single_valued()
                .operational(),
            AttributeType::new(ENTRY_CSN_OID, &["entryCSN"], Some(Csn))
                .with_ordering(Csn)
                .single_valued()
                .operational(),
        ];

        let mut registry = Self::new();
        for at in types {
            registry.insert(at);
        }
        registry
    }

    fn insert(&mut self, at: AttributeType) {
        for name in &at.names {
            self.by_name.insert(name.to_ascii_lowercase(), at.oid.clone());
        }
        self.by_oid.insert(at.oid.clone(), Arc::new(at));
    }

    /// Registers a new attribute type. OIDs and names must be unused.
    pub fn register(&mut self, at: AttributeType) -> SchemaResult<()> {
        at.validate_structure()
            .map_err(|e| SchemaError::malformed("<in-memory>", e))?;

        if self.by_oid.contains_key(&at.oid) {
            return Err(SchemaError::conflict(&at.oid));
        }
        if let Some(name) = at
            .names
            .iter()
            .find(|n| self.by_name.contains_key(&n.to_ascii_lowercase()))
        {
            return Err(SchemaError::conflict(name));
        }

        self.insert(at);
        Ok(())
    }

    /// Resolves a name or OID to its attribute type
    pub fn lookup(&self, id: &str) -> SchemaResult<Arc<AttributeType>> {
        let id = id.trim();
        let oid = if id.starts_with(|c: char| c.is_ascii_digit()) {
            id.to_string()
        } else {
            match self.by_name.get(&id.to_ascii_lowercase()) {
                Some(oid) => oid.clone(),
                None => return Err(SchemaError::undefined_attribute(id)),
            }
        };

        self.by_oid
            .get(&oid)
            .cloned()
            .ok_or_else(|| SchemaError::undefined_attribute(id))
    }

    /// Resolves a name or OID to the OID
    pub fn oid_of(&self, id: &str) -> SchemaResult<String> {
        self.lookup(id).map(|at| at.oid.clone())
    }

    /// Returns true if the name or OID is registered
    pub fn contains(&self, id: &str) -> bool {
        self.lookup(id).is_ok()
    }

    /// Normalizes a value with the attribute's equality rule.
    pub fn normalize(&self, attribute: &str, value: &str) -> SchemaResult<IndexKey> {
        let at = self.lookup(attribute)?;
        let rule = at.equality_rule()?;
        rule.normalize(at.name(), value, self)
    }

    /// Number of registered attribute types
    pub fn len(&self) -> usize {
        self.by_oid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_oid.is_empty()
    }

    /// All registered attribute types, in no particular order
    pub fn attribute_types(&self) -> impl Iterator<Item = &Arc<AttributeType>> {
        self.by_oid.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaErrorCode;

    #[test]
    fn test_lookup_by_name_and_oid() {
        let registry = SchemaRegistry::core();
        let by_name = registry.lookup("CommonName").unwrap();
        let by_oid = registry.lookup("2.5.4.3").unwrap();
        assert_eq!(by_name.oid, by_oid.oid);
        assert_eq!(registry.oid_of("OU").unwrap(), "2.5.4.11");
    }

    #[test]
    fn test_unknown_attribute() {
        let registry = SchemaRegistry::core();
        let err = registry.lookup("favouriteDrink").unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::UndefinedAttributeType);
        assert!(registry.lookup("9.9.9").is_err());
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = SchemaRegistry::core();

        let dup_oid = AttributeType::new("2.5.4.3", &["other"], None);
        assert_eq!(
            registry.register(dup_oid).unwrap_err().code(),
            SchemaErrorCode::SchemaConflict
        );

        let dup_name = AttributeType::new("1.3.6.1.4.1.99.1", &["CN"], None);
        assert_eq!(
            registry.register(dup_name).unwrap_err().code(),
            SchemaErrorCode::SchemaConflict
        );

        let fresh = AttributeType::new("1.3.6.1.4.1.99.2", &["nickName"], Some(MatchingRule::CaseIgnore));
        registry.register(fresh).unwrap();
        assert!(registry.contains("nickname"));
    }

    #[test]
    fn test_normalize_uses_equality_rule() {
        let registry = SchemaRegistry::core();
        assert_eq!(
            registry.normalize("ou", " People ").unwrap(),
            IndexKey::from("people")
        );
        assert_eq!(
            registry.normalize("uidNumber", "0042").unwrap(),
            IndexKey::Int(42)
        );
        assert_eq!(
            registry.normalize("jpegPhoto", "x").unwrap_err().code(),
            SchemaErrorCode::InappropriateMatching
        );
    }
}
