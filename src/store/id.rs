//! Entry identifiers and parent-relative names

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dn::Rdn;

/// Identifier of one entry within a partition.
///
/// Assigned monotonically, never reused while the store is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(pub u64);

impl EntryId {
    /// Virtual parent of the context entry; never present in any index
    pub const ROOT: EntryId = EntryId(0);

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntryId {
    fn from(v: u64) -> Self {
        EntryId(v)
    }
}

/// Position of an entry directly under its parent.
///
/// The context entry is keyed `(ROOT, all suffix RDNs)`; every other entry
/// carries exactly one RDN.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentIdAndRdn {
    parent_id: EntryId,
    /// Leftmost first, never empty
    rdns: Vec<Rdn>,
}

impl ParentIdAndRdn {
    pub fn new(parent_id: EntryId, rdns: Vec<Rdn>) -> Self {
        Self { parent_id, rdns }
    }

    /// Key of an ordinary entry
    pub fn child(parent_id: EntryId, rdn: Rdn) -> Self {
        Self::new(parent_id, vec![rdn])
    }

    pub fn parent_id(&self) -> EntryId {
        self.parent_id
    }

    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// True for the context entry's key
    pub fn is_context(&self) -> bool {
        self.parent_id.is_root()
    }
}

impl PartialOrd for ParentIdAndRdn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Fewer RDNs first, then RDN by RDN, then parent id.
impl Ord for ParentIdAndRdn {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rdns
            .len()
            .cmp(&other.rdns.len())
            .then_with(|| self.rdns.cmp(&other.rdns))
            .then_with(|| self.parent_id.cmp(&other.parent_id))
    }
}

impl fmt::Display for ParentIdAndRdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rdns: Vec<&str> = self.rdns.iter().map(Rdn::up_name).collect();
        write!(f, "<{}, '{}'>", self.parent_id, rdns.join(","))
    }
}
