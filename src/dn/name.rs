//! Distinguished names
//!
//! RDNs are stored leftmost first: `ou=people,dc=example` is
//! `[ou=people, dc=example]`, so the parent is everything after index 0.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::errors::{DnError, DnResult};
use super::rdn::{split_unescaped, Rdn};
use crate::schema::SchemaRegistry;

/// Distinguished name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dn {
    rdns: Vec<Rdn>,
    normalized: bool,
}

impl Dn {
    /// The empty DN
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a DN string. The empty string is the root DN.
    pub fn parse(s: &str) -> DnResult<Self> {
        if s.trim().is_empty() {
            return Ok(Self::root());
        }

        let rdns = split_unescaped(s, ',')
            .into_iter()
            .map(|raw| {
                if raw.trim().is_empty() {
                    Err(DnError::syntax(s, "empty RDN"))
                } else {
                    Rdn::parse_in(raw, s)
                }
            })
            .collect::<DnResult<Vec<_>>>()?;

        Ok(Self {
            rdns,
            normalized: false,
        })
    }

    /// Builds a DN from RDNs, leftmost first
    pub fn from_rdns(rdns: Vec<Rdn>) -> Self {
        Self {
            rdns,
            normalized: false,
        }
    }

    /// Wraps RDNs that are already normalized
    pub(crate) fn from_normalized(rdns: Vec<Rdn>) -> Self {
        Self {
            rdns,
            normalized: true,
        }
    }

    /// Returns a copy with every RDN normalized against `schema`.
    pub fn normalize(&self, schema: &SchemaRegistry) -> DnResult<Self> {
        if self.normalized {
            return Ok(self.clone());
        }
        let rdns = self
            .rdns
            .iter()
            .map(|rdn| rdn.normalize(schema))
            .collect::<DnResult<Vec<_>>>()?;
        Ok(Self {
            rdns,
            normalized: true,
        })
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized || self.rdns.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Number of RDNs
    pub fn len(&self) -> usize {
        self.rdns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// RDNs, leftmost first
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// The leftmost RDN
    pub fn rdn(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// The DN without its leftmost RDN; `None` for the root DN
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            return None;
        }
        Some(Self {
            rdns: self.rdns[1..].to_vec(),
            normalized: self.normalized,
        })
    }

    /// The DN of a child named `rdn`.
    ///
    /// The result is normalized only if both parts are.
    pub fn child(&self, rdn: Rdn) -> Dn {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(rdn);
        rdns.extend(self.rdns.iter().cloned());
        Self {
            rdns,
            normalized: false,
        }
    }

    /// Strictly below `ancestor`
    pub fn is_descendant_of(&self, ancestor: &Dn) -> bool {
        self.rdns.len() > ancestor.rdns.len() && self.ends_with(ancestor)
    }

    pub fn is_descendant_or_self(&self, ancestor: &Dn) -> bool {
        self.rdns.len() >= ancestor.rdns.len() && self.ends_with(ancestor)
    }

    fn ends_with(&self, suffix: &Dn) -> bool {
        let skip = self.rdns.len() - suffix.rdns.len();
        self.rdns[skip..] == suffix.rdns[..]
    }

    /// RDNs of `self` that lie below `ancestor`, leftmost first.
    pub fn relative_to(&self, ancestor: &Dn) -> Option<&[Rdn]> {
        if !self.is_descendant_or_self(ancestor) {
            return None;
        }
        Some(&self.rdns[..self.rdns.len() - ancestor.rdns.len()])
    }

    /// Replaces the `old_prefix` ancestor part with `new_prefix`.
    pub fn rebase(&self, old_prefix: &Dn, new_prefix: &Dn) -> DnResult<Dn> {
        let relative = self
            .relative_to(old_prefix)
            .ok_or_else(|| DnError::NotUnderPrefix {
                dn: self.up_name(),
                prefix: old_prefix.up_name(),
            })?;

        let mut rdns = relative.to_vec();
        rdns.extend(new_prefix.rdns.iter().cloned());
        Ok(Self {
            rdns,
            normalized: self.normalized && new_prefix.normalized,
        })
    }

    /// Canonical string used as the key of the normalized DN index
    pub fn norm_name(&self) -> String {
        self.rdns
            .iter()
            .map(Rdn::norm_name)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// The DN as the user wrote it
    pub fn up_name(&self) -> String {
        self.rdns
            .iter()
            .map(Rdn::up_name)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.rdns == other.rdns
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rdns.hash(state);
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.up_name())
    }
}

impl std::str::FromStr for Dn {
    type Err = DnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dn::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> Dn {
        Dn::parse(s).unwrap().normalize(&SchemaRegistry::core()).unwrap()
    }

    #[test]
    fn test_parse_and_names() {
        let dn = Dn::parse("ou=People, dc=Example").unwrap();
        assert_eq!(dn.len(), 2);
        assert_eq!(dn.up_name(), "ou=People,dc=Example");
        assert!(!dn.is_normalized());

        let n = dn.normalize(&SchemaRegistry::core()).unwrap();
        assert_eq!(
            n.norm_name(),
            "2.5.4.11=people,0.9.2342.19200300.100.1.25=example"
        );
        assert_eq!(n.up_name(), "ou=People,dc=Example");
    }

    #[test]
    fn test_root() {
        let root = Dn::parse("").unwrap();
        assert!(root.is_root());
        assert!(root.parent().is_none());
        assert_eq!(root.norm_name(), "");
    }

    #[test]
    fn test_empty_rdn_rejected() {
        assert!(Dn::parse("ou=a,,dc=b").is_err());
        assert!(Dn::parse("ou=a,").is_err());
    }

    #[test]
    fn test_escaped_comma_stays_in_rdn() {
        let dn = Dn::parse(r"cn=Smith\, John,dc=example").unwrap();
        assert_eq!(dn.len(), 2);
        assert_eq!(dn.rdn().unwrap().ava().up_value(), "Smith, John");
    }

    #[test]
    fn test_equality_uses_normalized_form() {
        assert_eq!(norm("OU=people,DC=EXAMPLE"), norm("ou=People , dc=example"));
        assert_ne!(norm("ou=people,dc=example"), norm("ou=groups,dc=example"));
    }

    #[test]
    fn test_parent_and_child() {
        let dn = norm("cn=bob,ou=people,dc=example");
        let parent = dn.parent().unwrap();
        assert_eq!(parent, norm("ou=people,dc=example"));

        let rebuilt = parent.child(dn.rdn().unwrap().clone());
        assert_eq!(rebuilt, dn);
    }

    #[test]
    fn test_descendants() {
        let base = norm("dc=example");
        let people = norm("ou=people,dc=example");
        let bob = norm("cn=bob,ou=people,dc=example");

        assert!(bob.is_descendant_of(&base));
        assert!(bob.is_descendant_of(&people));
        assert!(!people.is_descendant_of(&people));
        assert!(people.is_descendant_or_self(&people));
        assert!(!base.is_descendant_of(&people));
        assert!(!norm("ou=people,dc=other").is_descendant_of(&base));
    }

    #[test]
    fn test_rebase() {
        let bob = norm("cn=bob,ou=people,dc=example");
        let moved = bob
            .rebase(&norm("ou=people,dc=example"), &norm("ou=staff,dc=example"))
            .unwrap();
        assert_eq!(moved, norm("cn=bob,ou=staff,dc=example"));
        assert!(moved.is_normalized());

        let err = bob.rebase(&norm("ou=groups,dc=example"), &norm("dc=example"));
        assert!(matches!(err, Err(DnError::NotUnderPrefix { .. })));
    }

    #[test]
    fn test_relative_to() {
        let bob = norm("cn=bob,ou=people,dc=example");
        let rel = bob.relative_to(&norm("dc=example")).unwrap();
        assert_eq!(rel.len(), 2);
        assert!(bob.relative_to(&norm("dc=other")).is_none());
    }
}
