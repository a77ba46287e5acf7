//! Distinguished name model
//!
//! - `Dn` is a list of `Rdn`s, leftmost first
//! - Parsing resolves `\c` and `\hh` escapes
//! - Equality, ordering and hashing use the normalized form only

mod errors;
mod name;
mod rdn;

pub use errors::{DnError, DnResult};
pub use name::Dn;
pub use rdn::{Ava, Rdn};
