//! Schema registry for the entry store
//!
//! Supplies attribute type descriptors and the matching rules that
//! normalize values before they reach an index.
//!
//! # Design Principles
//!
//! - Registry passed explicitly, never global
//! - Matching rule resolved once per attribute type
//! - Attributes without an equality rule cannot be indexed
//! - Malformed definition files stop startup

mod errors;
mod loader;
mod matching;
mod registry;
mod types;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity};
pub use matching::MatchingRule;
pub use registry::{
    SchemaRegistry, ALIASED_OBJECT_NAME_OID, ALIAS_OBJECT_CLASS, ENTRY_CSN_OID, ENTRY_UUID_OID,
    OBJECT_CLASS_OID,
};
pub use types::AttributeType;
