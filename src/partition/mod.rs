//! Partition adapter
//!
//! Presents DN-addressed directory operations over one `Store` and wraps
//! index cursors in entry-producing cursors for the search engine.
//!
//! # Design Principles
//!
//! - The partition owns its store; the store never refers back
//! - Lifecycle is one-way: uninitialized, initialized, destroyed
//! - A move below itself is refused before the store is touched
//!
//! ```ignore
//! let mut partition = StorePartition::new(config, schema);
//! partition.init()?;
//! partition.add(AddContext::new(entry))?;
//! let mut cursor = partition.search(SearchContext::new(base, SearchScope::Subtree))?;
//! while cursor.next()? {
//!     let found = cursor.get()?;
//! }
//! ```

mod adapter;
mod context;
mod cursor;

pub use adapter::{Partition, StorePartition};
pub use context::{
    AddContext, AliasDerefMode, DeleteContext, Evaluator, ListContext, LookupContext,
    ModifyContext, MoveAndRenameContext, MoveContext, RenameContext, SearchContext, SearchScope,
};
pub use cursor::{CandidateCursor, EntryCursor};
