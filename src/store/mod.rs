//! The xdbm entry store
//!
//! Entries live in a master table keyed by `EntryId`. The system indices
//! and the configured user indices are derived from it: they answer DN
//! resolution, hierarchy, alias and attribute-value queries without
//! scanning the master table.
//!
//! # Design Principles
//!
//! - Every mutation is all or nothing: the master write and all index
//!   writes succeed together, or the applied prefix is rolled back
//! - A DN is never stored; it is the RDN chain of the parent links
//! - The master table is authoritative, indices are rebuilt when suspect
//! - Reject errors leave no trace; fatal errors mean the store must stop
//!
//! ```ignore
//! let mut store = Store::new(StoreConfig::with_suffix("dc=example"), schema);
//! store.init()?;
//! let id = store.add(entry)?;
//! let entry = store.lookup(id)?;
//! ```

mod alias;
mod config;
mod engine;
mod errors;
mod id;
mod indices;
mod master;
mod mutation;
mod ops;
mod rows;
mod verify;

pub use config::{IndexConfig, StoreConfig};
pub use engine::Store;
pub use errors::{Severity, StoreError, StoreErrorCode, StoreResult};
pub use id::{EntryId, ParentIdAndRdn};
pub use indices::{IndexRow, Row, SystemIndices};
