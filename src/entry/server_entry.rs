//! Server-side entry
//!
//! An `Entry` is a DN plus typed attributes. Callers receive clones; the
//! store is the only place an entry is changed.

use serde::{Deserialize, Serialize};

use super::attribute::{Attribute, Attributes, Value};
use super::errors::{EntryError, EntryResult};
use super::modification::{ModOp, Modification};
use crate::dn::{Dn, Rdn};
use crate::index::IndexKey;
use crate::schema::{
    AttributeType, SchemaRegistry, ALIASED_OBJECT_NAME_OID, ALIAS_OBJECT_CLASS, OBJECT_CLASS_OID,
};

/// A directory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    dn: Dn,
    attributes: Attributes,
}

impl Entry {
    /// Creates an entry with no attributes
    pub fn new(dn: Dn) -> Self {
        Self {
            dn,
            attributes: Attributes::new(),
        }
    }

    /// Builds an entry from a DN string and `(attribute, value)` pairs.
    ///
    /// ```ignore
    /// let entry = Entry::from_pairs(&schema, "ou=people,dc=example", &[
    ///     ("objectClass", "organizationalUnit"),
    ///     ("ou", "people"),
    /// ])?;
    /// ```
    pub fn from_pairs(
        schema: &SchemaRegistry,
        dn: &str,
        pairs: &[(&str, &str)],
    ) -> EntryResult<Self> {
        let dn = Dn::parse(dn)?.normalize(schema)?;
        let mut entry = Self::new(dn);
        for (attribute, value) in pairs {
            entry.add(schema, attribute, value)?;
        }
        Ok(entry)
    }

    pub(crate) fn from_parts(dn: Dn, attributes: Attributes) -> Self {
        Self { dn, attributes }
    }

    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    pub fn set_dn(&mut self, dn: Dn) {
        self.dn = dn;
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub(crate) fn into_attributes(self) -> Attributes {
        self.attributes
    }

    /// Attribute by name or OID; `None` if unknown or absent
    pub fn get(&self, schema: &SchemaRegistry, id: &str) -> Option<&Attribute> {
        let at = schema.lookup(id).ok()?;
        self.attributes.get(&at.oid)
    }

    /// Adds one value; returns false if an equal value was present
    pub fn add(&mut self, schema: &SchemaRegistry, id: &str, value: &str) -> EntryResult<bool> {
        let at = schema.lookup(id)?;
        let value = Value::new(&at, value, schema)?;
        Ok(self.attributes.entry(id, &at).add(value))
    }

    /// Returns true if the attribute holds a value equal to `value`
    pub fn contains(&self, schema: &SchemaRegistry, id: &str, value: &str) -> EntryResult<bool> {
        let at = schema.lookup(id)?;
        let value = Value::new(&at, value, schema)?;
        Ok(self
            .attributes
            .get(&at.oid)
            .is_some_and(|a| a.contains(value.norm())))
    }

    /// Normalized objectClass values
    pub fn object_classes(&self) -> impl Iterator<Item = &IndexKey> {
        self.attributes
            .get(OBJECT_CLASS_OID)
            .into_iter()
            .flat_map(|a| a.norm_values())
    }

    pub fn has_object_class(&self, object_class: &str) -> bool {
        let wanted = IndexKey::from_string(object_class.trim().to_ascii_lowercase());
        self.object_classes().any(|oc| oc == &wanted)
    }

    pub fn is_alias(&self) -> bool {
        self.has_object_class(ALIAS_OBJECT_CLASS)
    }

    /// Raw `aliasedObjectName` value
    pub fn aliased_object_name(&self) -> Option<&str> {
        self.attributes
            .get(ALIASED_OBJECT_NAME_OID)
            .and_then(Attribute::first)
    }

    /// Sets a single-valued attribute, ignoring user-modifiability.
    pub(crate) fn set_operational(
        &mut self,
        schema: &SchemaRegistry,
        oid: &str,
        value: &str,
    ) -> EntryResult<()> {
        let at = schema.lookup(oid)?;
        let mut attribute = Attribute::new(at.name(), &at.oid);
        attribute.add(Value::new(&at, value, schema)?);
        self.attributes.put(attribute);
        Ok(())
    }

    /// Adds the values named by `rdn` when they are missing.
    pub(crate) fn ensure_rdn_values(&mut self, schema: &SchemaRegistry, rdn: &Rdn) -> EntryResult<()> {
        for ava in rdn.avas() {
            self.add(schema, ava.up_type(), ava.up_value())?;
        }
        Ok(())
    }

    /// Removes the values named by `rdn`, dropping emptied attributes.
    pub(crate) fn remove_rdn_values(&mut self, schema: &SchemaRegistry, rdn: &Rdn) -> EntryResult<()> {
        for ava in rdn.avas() {
            let at = schema.lookup(ava.up_type())?;
            let value = Value::new(&at, ava.up_value(), schema)?;
            if let Some(attribute) = self.attributes.get_mut(&at.oid) {
                attribute.remove(value.norm());
            }
        }
        self.attributes.prune();
        Ok(())
    }

    /// Applies modifications with LDAP semantics. All or nothing.
    pub fn apply(&mut self, schema: &SchemaRegistry, mods: &[Modification]) -> EntryResult<()> {
        let mut working = self.clone();
        for m in mods {
            working.apply_one(schema, m)?;
        }
        working.attributes.prune();
        working.check_rdn_values(schema)?;
        working.check_object_class()?;

        *self = working;
        Ok(())
    }

    fn apply_one(&mut self, schema: &SchemaRegistry, m: &Modification) -> EntryResult<()> {
        let at = schema.lookup(&m.attribute)?;
        if !at.user_modifiable {
            return Err(EntryError::ConstraintViolation {
                attribute: at.name().to_string(),
                reason: "attribute is not user-modifiable".to_string(),
            });
        }

        let values = m
            .values
            .iter()
            .map(|v| Value::new(&at, v, schema))
            .collect::<EntryResult<Vec<_>>>()?;

        match m.op {
            ModOp::Add => {
                if values.is_empty() {
                    return Err(EntryError::ConstraintViolation {
                        attribute: at.name().to_string(),
                        reason: "add without values".to_string(),
                    });
                }
                let attribute = self.attributes.entry(&m.attribute, &at);
                for value in values {
                    let up = value.up().to_string();
                    if !attribute.add(value) {
                        return Err(EntryError::AttributeOrValueExists {
                            attribute: at.name().to_string(),
                            value: up,
                        });
                    }
                }
            }
            ModOp::Remove => {
                let no_such = || EntryError::NoSuchAttribute {
                    attribute: at.name().to_string(),
                };
                if values.is_empty() {
                    self.attributes.remove(&at.oid).ok_or_else(no_such)?;
                    return Ok(());
                }
                let attribute = self.attributes.get_mut(&at.oid).ok_or_else(no_such)?;
                for value in &values {
                    if !attribute.remove(value.norm()) {
                        return Err(no_such());
                    }
                }
            }
            ModOp::Replace => {
                self.attributes.remove(&at.oid);
                if values.is_empty() {
                    return Ok(());
                }
                let mut attribute = Attribute::new(&m.attribute, &at.oid);
                for value in values {
                    let up = value.up().to_string();
                    if !attribute.add(value) {
                        return Err(EntryError::AttributeOrValueExists {
                            attribute: at.name().to_string(),
                            value: up,
                        });
                    }
                }
                self.attributes.put(attribute);
            }
        }

        check_single_value(&at, self.attributes.get(&at.oid))
    }

    fn check_rdn_values(&self, schema: &SchemaRegistry) -> EntryResult<()> {
        let Some(rdn) = self.dn.rdn() else {
            return Ok(());
        };
        for ava in rdn.avas() {
            let at = schema.lookup(ava.up_type())?;
            let value = Value::new(&at, ava.up_value(), schema)?;
            let present = self
                .attributes
                .get(&at.oid)
                .is_some_and(|a| a.contains(value.norm()));
            if !present {
                return Err(EntryError::NotAllowedOnRdn {
                    attribute: at.name().to_string(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn check_object_class(&self) -> EntryResult<()> {
        if self.object_classes().next().is_none() {
            return Err(EntryError::ObjectClassViolation(format!(
                "entry '{}' has no objectClass",
                self.dn
            )));
        }
        Ok(())
    }

    /// Checks every attribute's single-value constraint.
    pub(crate) fn check_single_values(&self, schema: &SchemaRegistry) -> EntryResult<()> {
        for attribute in self.attributes.iter() {
            let at = schema.lookup(attribute.oid())?;
            check_single_value(&at, Some(attribute))?;
        }
        Ok(())
    }

    /// Copy restricted to the requested attributes.
    ///
    /// An empty list or `*` selects all user attributes, `+` all operational
    /// ones. Unknown names are ignored.
    pub fn select(&self, schema: &SchemaRegistry, ids: &[String]) -> Entry {
        let all_user = ids.is_empty() || ids.iter().any(|id| id == "*");
        let all_operational = ids.iter().any(|id| id == "+");
        let named: Vec<String> = ids
            .iter()
            .filter_map(|id| schema.lookup(id).ok())
            .map(|at| at.oid.clone())
            .collect();

        let mut attributes = Attributes::new();
        for attribute in self.attributes.iter() {
            let operational = schema
                .lookup(attribute.oid())
                .map(|at| !at.user_modifiable)
                .unwrap_or(false);
            let keep = named.iter().any(|oid| oid == attribute.oid())
                || (operational && all_operational)
                || (!operational && all_user);
            if keep {
                attributes.put(attribute.clone());
            }
        }
        Entry::from_parts(self.dn.clone(), attributes)
    }
}

fn check_single_value(at: &AttributeType, attribute: Option<&Attribute>) -> EntryResult<()> {
    if at.single_value && attribute.is_some_and(|a| a.len() > 1) {
        return Err(EntryError::ConstraintViolation {
            attribute: at.name().to_string(),
            reason: "attribute is single-valued".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SchemaRegistry {
        SchemaRegistry::core()
    }

    fn person(schema: &SchemaRegistry) -> Entry {
        Entry::from_pairs(
            schema,
            "cn=Bob,ou=people,dc=example",
            &[
                ("objectClass", "person"),
                ("cn", "Bob"),
                ("sn", "Smith"),
                ("mail", "bob@example.com"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_add_existing_value_fails() {
        let schema = schema();
        let mut entry = person(&schema);
        let err = entry
            .apply(&schema, &[Modification::add("sn", &["SMITH"])])
            .unwrap_err();
        assert!(matches!(err, EntryError::AttributeOrValueExists { .. }));
    }

    #[test]
    fn test_remove_missing_value_fails() {
        let schema = schema();
        let mut entry = person(&schema);
        let err = entry
            .apply(&schema, &[Modification::remove("sn", &["Jones"])])
            .unwrap_err();
        assert!(matches!(err, EntryError::NoSuchAttribute { .. }));

        let err = entry
            .apply(&schema, &[Modification::remove("title", &[])])
            .unwrap_err();
        assert!(matches!(err, EntryError::NoSuchAttribute { .. }));
    }

    #[test]
    fn test_replace_with_no_values_deletes() {
        let schema = schema();
        let mut entry = person(&schema);
        entry
            .apply(&schema, &[Modification::replace("mail", &[])])
            .unwrap();
        assert!(entry.get(&schema, "mail").is_none());
    }

    #[test]
    fn test_rdn_value_cannot_be_removed() {
        let schema = schema();
        let mut entry = person(&schema);
        let err = entry
            .apply(&schema, &[Modification::remove("cn", &["bob"])])
            .unwrap_err();
        assert!(matches!(err, EntryError::NotAllowedOnRdn { .. }));
    }

    #[test]
    fn test_object_class_required() {
        let schema = schema();
        let mut entry = person(&schema);
        let err = entry
            .apply(&schema, &[Modification::remove("objectClass", &[])])
            .unwrap_err();
        assert!(matches!(err, EntryError::ObjectClassViolation(_)));
    }

    #[test]
    fn test_single_value_enforced() {
        let schema = schema();
        let mut entry = person(&schema);
        let err = entry
            .apply(&schema, &[Modification::add("uidNumber", &["1", "2"])])
            .unwrap_err();
        assert!(matches!(err, EntryError::ConstraintViolation { .. }));
    }

    #[test]
    fn test_operational_attribute_not_user_modifiable() {
        let schema = schema();
        let mut entry = person(&schema);
        let err = entry
            .apply(
                &schema,
                &[Modification::replace(
                    "entryUUID",
                    &["f81d4fae-7dec-11d0-a765-00a0c91e6bf6"],
                )],
            )
            .unwrap_err();
        assert!(matches!(err, EntryError::ConstraintViolation { .. }));
    }

    #[test]
    fn test_failed_apply_leaves_entry_unchanged() {
        let schema = schema();
        let mut entry = person(&schema);
        let before = entry.clone();
        let result = entry.apply(
            &schema,
            &[
                Modification::add("title", &["Engineer"]),
                Modification::remove("sn", &["Jones"]),
            ],
        );
        assert!(result.is_err());
        assert_eq!(entry, before);
    }

    #[test]
    fn test_alias_detection() {
        let schema = schema();
        let alias = Entry::from_pairs(
            &schema,
            "cn=robert,dc=example",
            &[
                ("objectClass", "alias"),
                ("objectClass", "extensibleObject"),
                ("cn", "robert"),
                ("aliasedObjectName", "cn=Bob,ou=people,dc=example"),
            ],
        )
        .unwrap();
        assert!(alias.is_alias());
        assert_eq!(
            alias.aliased_object_name(),
            Some("cn=Bob,ou=people,dc=example")
        );
        assert!(!person(&schema).is_alias());
    }

    #[test]
    fn test_select() {
        let schema = schema();
        let mut entry = person(&schema);
        entry
            .set_operational(&schema, "entryUUID", "f81d4fae-7dec-11d0-a765-00a0c91e6bf6")
            .unwrap();

        let mail_only = entry.select(&schema, &["mail".to_string()]);
        assert_eq!(mail_only.attributes().len(), 1);

        let user = entry.select(&schema, &[]);
        assert!(user.get(&schema, "entryUUID").is_none());
        assert!(user.get(&schema, "cn").is_some());

        let operational = entry.select(&schema, &["+".to_string()]);
        assert_eq!(operational.attributes().len(), 1);
    }
}
