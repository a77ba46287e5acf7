//! Modification items for the modify operation

use serde::{Deserialize, Serialize};

/// Kind of change applied to one attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModOp {
    /// Add values; fails if any is already present
    Add,
    /// Remove the listed values, or the whole attribute when none are listed
    Remove,
    /// Replace all values; an empty list deletes the attribute
    Replace,
}

/// One change to one attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    pub op: ModOp,
    /// Attribute name or OID
    pub attribute: String,
    pub values: Vec<String>,
}

impl Modification {
    pub fn new(op: ModOp, attribute: &str, values: &[&str]) -> Self {
        Self {
            op,
            attribute: attribute.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn add(attribute: &str, values: &[&str]) -> Self {
        Self::new(ModOp::Add, attribute, values)
    }

    pub fn remove(attribute: &str, values: &[&str]) -> Self {
        Self::new(ModOp::Remove, attribute, values)
    }

    pub fn replace(attribute: &str, values: &[&str]) -> Self {
        Self::new(ModOp::Replace, attribute, values)
    }
}
