//! Attribute and system indices
//!
//! Every index is a pair of sorted tables: forward (value -> ids) and
//! reverse (id -> values). Both hold exactly the same set of tuples.
//!
//! # Design Principles
//!
//! - Values are normalized before they reach an index
//! - Forward and reverse are written together or not at all
//! - Counts are exact; the tables are in-memory B-trees
//! - Derived state: rebuilt from the master table when in doubt

mod cursor;
mod entry;
mod errors;
mod key;
mod table_index;

pub use cursor::{ForwardIndexCursor, IndexCursor, ReverseIndexCursor};
pub use entry::IndexEntry;
pub use errors::{IndexError, IndexErrorCode, IndexResult, Severity};
pub use key::IndexKey;
pub use table_index::Index;
