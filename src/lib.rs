//! xdbm - indexed entry store for an LDAP directory partition
//!
//! Maps a hierarchical namespace of schema-typed entries onto a master
//! record table and secondary indices, and exposes positionable cursors
//! over those indices to a search engine.
//!
//! Layers, leaf first:
//!
//! - `table`: sorted key/value tables with checksummed snapshots
//! - `index`: forward/reverse table pairs over normalized values
//! - `cursor`: positionable, closable cursors
//! - `store`: master table, system and user indices, mutations
//! - `partition`: DN-addressed operations and search over one store
//!
//! `schema`, `dn` and `entry` model the attribute types, names and
//! entries the store works with.

pub mod cursor;
pub mod dn;
pub mod entry;
pub mod index;
pub mod observability;
pub mod partition;
pub mod schema;
pub mod store;
pub mod table;
