//! Relative distinguished names
//!
//! An RDN is one or more attribute value assertions joined by `+`. The
//! user-provided text is kept verbatim for display; comparisons, ordering
//! and hashing only look at the normalized type/value pairs, which are kept
//! sorted so `cn=a+sn=b` and `sn=b+cn=a` are the same RDN.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::errors::{DnError, DnResult};
use crate::schema::SchemaRegistry;

/// Characters that must be escaped anywhere in a value
const SPECIALS: &[char] = &[',', '+', '"', '\\', '<', '>', ';', '='];

/// One attribute value assertion, `type=value`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ava {
    up_type: String,
    up_value: String,
    norm_type: String,
    norm_value: String,
}

impl Ava {
    /// Creates an un-normalized AVA from an attribute name and a raw value
    pub fn new(attribute: &str, value: &str) -> Self {
        Self {
            up_type: attribute.to_string(),
            up_value: value.to_string(),
            norm_type: attribute.trim().to_ascii_lowercase(),
            norm_value: value.to_string(),
        }
    }

    fn parse(raw: &str, dn: &str) -> DnResult<Self> {
        let eq = raw
            .find('=')
            .ok_or_else(|| DnError::syntax(dn, format!("missing '=' in '{}'", raw.trim())))?;
        let attribute = raw[..eq].trim();
        if !is_valid_descr(attribute) {
            return Err(DnError::syntax(
                dn,
                format!("invalid attribute type '{}'", attribute),
            ));
        }

        let value = unescape_value(&raw[eq + 1..], dn)?;
        if value.is_empty() {
            return Err(DnError::syntax(
                dn,
                format!("empty value for '{}'", attribute),
            ));
        }
        Ok(Self::new(attribute, &value))
    }

    /// Maps the type to its OID and the value through the equality rule.
    pub fn normalize(&self, schema: &SchemaRegistry) -> DnResult<Self> {
        let invalid = |e: crate::schema::SchemaError| DnError::InvalidAttribute {
            attribute: self.up_type.clone(),
            reason: e.message().to_string(),
        };
        let at = schema.lookup(&self.up_type).map_err(invalid)?;
        let rule = at.equality_rule().map_err(invalid)?;
        let key = rule
            .normalize(at.name(), &self.up_value, schema)
            .map_err(invalid)?;

        Ok(Self {
            up_type: self.up_type.clone(),
            up_value: self.up_value.clone(),
            norm_type: at.oid.clone(),
            norm_value: key.to_canonical_string(),
        })
    }

    /// Attribute type as the user wrote it
    pub fn up_type(&self) -> &str {
        &self.up_type
    }

    /// Unescaped value as the user wrote it
    pub fn up_value(&self) -> &str {
        &self.up_value
    }

    /// OID once normalized, lowercase name before
    pub fn norm_type(&self) -> &str {
        &self.norm_type
    }

    pub fn norm_value(&self) -> &str {
        &self.norm_value
    }

    fn norm_name(&self) -> String {
        format!("{}={}", self.norm_type, escape_value(&self.norm_value))
    }
}

/// Relative distinguished name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rdn {
    /// Never empty, sorted by normalized type and value
    avas: Vec<Ava>,
    up: String,
}

impl Rdn {
    /// Creates a single-valued RDN
    pub fn new(attribute: &str, value: &str) -> Self {
        Self {
            avas: vec![Ava::new(attribute, value)],
            up: format!("{}={}", attribute, escape_value(value)),
        }
    }

    /// Parses one RDN such as `cn=Bob+uid=bob`
    pub fn parse(raw: &str) -> DnResult<Self> {
        Self::parse_in(raw, raw)
    }

    pub(crate) fn parse_in(raw: &str, dn: &str) -> DnResult<Self> {
        let mut avas = split_unescaped(raw, '+')
            .into_iter()
            .map(|part| Ava::parse(part, dn))
            .collect::<DnResult<Vec<_>>>()?;
        sort_avas(&mut avas);

        Ok(Self {
            avas,
            up: raw.trim().to_string(),
        })
    }

    /// Normalizes every AVA
    pub fn normalize(&self, schema: &SchemaRegistry) -> DnResult<Self> {
        let mut avas = self
            .avas
            .iter()
            .map(|ava| ava.normalize(schema))
            .collect::<DnResult<Vec<_>>>()?;
        sort_avas(&mut avas);

        Ok(Self {
            avas,
            up: self.up.clone(),
        })
    }

    /// All AVAs, sorted
    pub fn avas(&self) -> &[Ava] {
        &self.avas
    }

    /// The first AVA in normalized order
    pub fn ava(&self) -> &Ava {
        &self.avas[0]
    }

    pub fn is_multi_valued(&self) -> bool {
        self.avas.len() > 1
    }

    /// Canonical form, e.g. `2.5.4.3=bob+0.9.2342.19200300.100.1.1=bob`
    pub fn norm_name(&self) -> String {
        self.avas
            .iter()
            .map(Ava::norm_name)
            .collect::<Vec<_>>()
            .join("+")
    }

    /// The RDN exactly as provided
    pub fn up_name(&self) -> &str {
        &self.up
    }

    fn key(&self) -> impl Iterator<Item = (&str, &str)> {
        self.avas
            .iter()
            .map(|a| (a.norm_type.as_str(), a.norm_value.as_str()))
    }
}

impl PartialEq for Rdn {
    fn eq(&self, other: &Self) -> bool {
        self.key().eq(other.key())
    }
}

impl Eq for Rdn {}

impl PartialOrd for Rdn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rdn {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(other.key())
    }
}

impl Hash for Rdn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (t, v) in self.key() {
            t.hash(state);
            v.hash(state);
        }
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.up)
    }
}

fn sort_avas(avas: &mut [Ava]) {
    avas.sort_by(|a, b| {
        (a.norm_type.as_str(), a.norm_value.as_str())
            .cmp(&(b.norm_type.as_str(), b.norm_value.as_str()))
    });
}

/// Attribute descriptor or numeric OID
fn is_valid_descr(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
        }
        Some(c) if c.is_ascii_digit() => s
            .split('.')
            .all(|arc| !arc.is_empty() && arc.bytes().all(|b| b.is_ascii_digit())),
        _ => false,
    }
}

/// Splits on `sep` outside of escapes and double quotes.
pub(crate) fn split_unescaped(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    let mut quoted = false;

    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => quoted = !quoted,
            c if c == sep && !quoted => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Resolves `\c` and `\hh` escapes and strips unescaped outer spaces.
fn unescape_value(raw: &str, dn: &str) -> DnResult<String> {
    let mut value = raw.trim_start();
    let trimmed = value.trim_end();
    // keep one escaped trailing space
    let trailing_backslashes = trimmed.chars().rev().take_while(|c| *c == '\\').count();
    value = if trailing_backslashes % 2 == 1 && trimmed.len() < value.len() {
        &value[..trimmed.len() + 1]
    } else {
        trimmed
    };

    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value = &value[1..value.len() - 1];
    }

    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let hex = bytes
            .get(i + 1..i + 3)
            .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
            .and_then(|h| std::str::from_utf8(h).ok())
            .and_then(|h| u8::from_str_radix(h, 16).ok());
        match (hex, bytes.get(i + 1)) {
            (Some(b), _) => {
                out.push(b);
                i += 3;
            }
            (None, Some(&next)) => {
                out.push(next);
                i += 2;
            }
            (None, None) => return Err(DnError::syntax(dn, "dangling escape")),
        }
    }

    String::from_utf8(out).map_err(|_| DnError::syntax(dn, "escaped value is not UTF-8"))
}

/// Escapes a value for use in a DN string.
pub(crate) fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);

    for (i, c) in value.chars().enumerate() {
        let edge = (i == 0 && (c == ' ' || c == '#')) || (i == last && c == ' ');
        if SPECIALS.contains(&c) || edge {
            out.push('\\');
            out.push(c);
        } else if c == '\0' {
            out.push_str("\\00");
        } else {
            out.push(c);
        }
    }
    out
}
