//! Attributes of an entry
//!
//! Values keep the text the user supplied next to their normalized key, so
//! value equality inside one attribute is decided once, when the value is
//! added. Attributes without an equality rule compare by exact text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::errors::{EntryError, EntryResult};
use crate::index::IndexKey;
use crate::schema::{AttributeType, SchemaRegistry};

/// One attribute value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Value {
    up: String,
    norm: IndexKey,
}

impl Value {
    /// Normalizes `up` with the attribute's equality rule
    pub fn new(at: &AttributeType, up: &str, schema: &SchemaRegistry) -> EntryResult<Self> {
        if up.is_empty() {
            return Err(EntryError::ConstraintViolation {
                attribute: at.name().to_string(),
                reason: "empty value".to_string(),
            });
        }
        let norm = match at.equality {
            Some(rule) => rule.normalize(at.name(), up, schema)?,
            None => IndexKey::from_string(up),
        };
        Ok(Self {
            up: up.to_string(),
            norm,
        })
    }

    /// Value as supplied
    pub fn up(&self) -> &str {
        &self.up
    }

    /// Normalized key
    pub fn norm(&self) -> &IndexKey {
        &self.norm
    }
}

/// A typed, multi-valued attribute
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Attribute {
    /// Name the user first used for this attribute
    up_id: String,
    oid: String,
    values: Vec<Value>,
}

impl Attribute {
    pub fn new(up_id: &str, oid: &str) -> Self {
        Self {
            up_id: up_id.to_string(),
            oid: oid.to_string(),
            values: Vec::new(),
        }
    }

    pub fn up_id(&self) -> &str {
        &self.up_id
    }

    pub fn oid(&self) -> &str {
        &self.oid
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// User-provided values in insertion order
    pub fn up_values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|v| v.up.as_str())
    }

    /// Normalized values in insertion order
    pub fn norm_values(&self) -> impl Iterator<Item = &IndexKey> {
        self.values.iter().map(|v| &v.norm)
    }

    /// First value, if any
    pub fn first(&self) -> Option<&str> {
        self.values.first().map(|v| v.up.as_str())
    }

    pub fn contains(&self, norm: &IndexKey) -> bool {
        self.values.iter().any(|v| &v.norm == norm)
    }

    /// Adds a value; returns false if an equal value is already present
    pub fn add(&mut self, value: Value) -> bool {
        if self.contains(&value.norm) {
            return false;
        }
        self.values.push(value);
        true
    }

    /// Removes a value; returns false if it was absent
    pub fn remove(&mut self, norm: &IndexKey) -> bool {
        let before = self.values.len();
        self.values.retain(|v| &v.norm != norm);
        self.values.len() != before
    }
}

/// Attributes of one entry, keyed and ordered by OID
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Attributes {
    by_oid: BTreeMap<String, Attribute>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, oid: &str) -> Option<&Attribute> {
        self.by_oid.get(oid)
    }

    pub fn get_mut(&mut self, oid: &str) -> Option<&mut Attribute> {
        self.by_oid.get_mut(oid)
    }

    /// Returns the attribute for `at`, creating it empty if needed
    pub fn entry(&mut self, up_id: &str, at: &AttributeType) -> &mut Attribute {
        self.by_oid
            .entry(at.oid.clone())
            .or_insert_with(|| Attribute::new(up_id, &at.oid))
    }

    /// Stores `attribute`, replacing any attribute with the same OID
    pub fn put(&mut self, attribute: Attribute) {
        self.by_oid.insert(attribute.oid.clone(), attribute);
    }

    pub fn remove(&mut self, oid: &str) -> Option<Attribute> {
        self.by_oid.remove(oid)
    }

    pub fn contains(&self, oid: &str) -> bool {
        self.by_oid.contains_key(oid)
    }

    pub fn len(&self) -> usize {
        self.by_oid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_oid.is_empty()
    }

    /// Attributes in OID order
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.by_oid.values()
    }

    /// Drops attributes left without values
    pub(crate) fn prune(&mut self) {
        self.by_oid.retain(|_, a| !a.is_empty());
    }
}
