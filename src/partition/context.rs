//! Operation contexts
//!
//! One context per directory operation, carrying the target DN and the
//! operation's arguments as decoded by the request layer.

use std::fmt;

use crate::dn::{Dn, Rdn};
use crate::entry::{Entry, Modification};

/// Decides whether a candidate entry matches a search filter
pub trait Evaluator {
    fn evaluate(&self, entry: &Entry) -> bool;
}

impl<F> Evaluator for F
where
    F: Fn(&Entry) -> bool,
{
    fn evaluate(&self, entry: &Entry) -> bool {
        self(entry)
    }
}

#[derive(Debug, Clone)]
pub struct AddContext {
    pub entry: Entry,
}

impl AddContext {
    pub fn new(entry: Entry) -> Self {
        Self { entry }
    }
}

#[derive(Debug, Clone)]
pub struct DeleteContext {
    pub dn: Dn,
}

impl DeleteContext {
    pub fn new(dn: Dn) -> Self {
        Self { dn }
    }
}

#[derive(Debug, Clone)]
pub struct ModifyContext {
    pub dn: Dn,
    pub modifications: Vec<Modification>,
}

impl ModifyContext {
    pub fn new(dn: Dn, modifications: Vec<Modification>) -> Self {
        Self { dn, modifications }
    }
}

#[derive(Debug, Clone)]
pub struct RenameContext {
    pub dn: Dn,
    pub new_rdn: Rdn,
    pub delete_old_rdn: bool,
}

impl RenameContext {
    pub fn new(dn: Dn, new_rdn: Rdn, delete_old_rdn: bool) -> Self {
        Self {
            dn,
            new_rdn,
            delete_old_rdn,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MoveContext {
    pub dn: Dn,
    pub new_superior: Dn,
}

impl MoveContext {
    pub fn new(dn: Dn, new_superior: Dn) -> Self {
        Self { dn, new_superior }
    }
}

#[derive(Debug, Clone)]
pub struct MoveAndRenameContext {
    pub dn: Dn,
    pub new_superior: Dn,
    pub new_rdn: Rdn,
    pub delete_old_rdn: bool,
}

impl MoveAndRenameContext {
    pub fn new(dn: Dn, new_superior: Dn, new_rdn: Rdn, delete_old_rdn: bool) -> Self {
        Self {
            dn,
            new_superior,
            new_rdn,
            delete_old_rdn,
        }
    }
}

/// Lookup of one entry. An empty attribute list returns all user
/// attributes.
#[derive(Debug, Clone)]
pub struct LookupContext {
    pub dn: Dn,
    pub attributes: Vec<String>,
}

impl LookupContext {
    pub fn new(dn: Dn) -> Self {
        Self {
            dn,
            attributes: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: &[&str]) -> Self {
        self.attributes = attributes.iter().map(|a| a.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone)]
pub struct ListContext {
    pub dn: Dn,
}

impl ListContext {
    pub fn new(dn: Dn) -> Self {
        Self { dn }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Base,
    OneLevel,
    Subtree,
}

/// When aliases are dereferenced during a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasDerefMode {
    Never,
    InSearching,
    FindingBase,
    Always,
}

impl AliasDerefMode {
    /// True if an alias search base is replaced by its target
    pub fn finding_base(&self) -> bool {
        matches!(self, Self::FindingBase | Self::Always)
    }

    /// True if aliases below the base are followed
    pub fn in_searching(&self) -> bool {
        matches!(self, Self::InSearching | Self::Always)
    }
}

/// Search request: base, scope, alias handling and optional filter.
///
/// ```ignore
/// let ctx = SearchContext::new(base, SearchScope::Subtree)
///     .with_filter(|e: &Entry| e.has_object_class("person"))
///     .with_size_limit(100);
/// ```
pub struct SearchContext {
    pub base: Dn,
    pub scope: SearchScope,
    pub deref: AliasDerefMode,
    pub evaluator: Option<Box<dyn Evaluator>>,
    pub size_limit: Option<usize>,
    pub attributes: Vec<String>,
}

impl SearchContext {
    pub fn new(base: Dn, scope: SearchScope) -> Self {
        Self {
            base,
            scope,
            deref: AliasDerefMode::Never,
            evaluator: None,
            size_limit: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_deref(mut self, deref: AliasDerefMode) -> Self {
        self.deref = deref;
        self
    }

    pub fn with_filter(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluator = Some(Box::new(evaluator));
        self
    }

    /// Zero means unlimited
    pub fn with_size_limit(mut self, limit: usize) -> Self {
        self.size_limit = (limit > 0).then_some(limit);
        self
    }

    pub fn with_attributes(mut self, attributes: &[&str]) -> Self {
        self.attributes = attributes.iter().map(|a| a.to_string()).collect();
        self
    }
}

impl fmt::Debug for SearchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchContext")
            .field("base", &self.base)
            .field("scope", &self.scope)
            .field("deref", &self.deref)
            .field("filtered", &self.evaluator.is_some())
            .field("size_limit", &self.size_limit)
            .field("attributes", &self.attributes)
            .finish()
    }
}
