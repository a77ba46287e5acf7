//! Entry model
//!
//! - `Entry`: DN plus typed, multi-valued attributes
//! - `Modification`: add/remove/replace with LDAP semantics
//! - `Csn`: change sequence numbers for `entryCSN`

mod attribute;
mod csn;
mod errors;
mod modification;
mod server_entry;

pub use attribute::{Attribute, Attributes, Value};
pub use csn::{Csn, CsnFactory};
pub use errors::{EntryError, EntryResult};
pub use modification::{ModOp, Modification};
pub use server_entry::Entry;
