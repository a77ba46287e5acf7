//! Structured logger for the entry store
//!
//! - One log line = one event
//! - Event name first, then severity, then fields in deterministic key order
//! - Emitted through `tracing`, so the embedding server decides where lines go

use std::fmt;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Debug-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
    /// Broken invariants, the store must not keep serving
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured logger façade over `tracing`.
///
/// Fields are rendered as a single `key=value` list sorted by key so the
/// same event always produces the same line.
pub struct Logger;

impl Logger {
    /// Emits one line for `event`
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let rendered = render_fields(fields);
        match severity {
            Severity::Trace => tracing::trace!(target: "xdbm", event = %event, fields = %rendered),
            Severity::Info => tracing::info!(target: "xdbm", event = %event, fields = %rendered),
            Severity::Warn => tracing::warn!(target: "xdbm", event = %event, fields = %rendered),
            Severity::Error => tracing::error!(target: "xdbm", event = %event, fields = %rendered),
            Severity::Fatal => {
                tracing::error!(target: "xdbm", event = %event, fatal = true, fields = %rendered)
            }
        }
    }

    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }

    /// Emitted at error level with `fatal = true`
    pub fn fatal(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Fatal, event, fields);
    }
}

/// Renders fields as `k1=v1 k2=v2`, sorted by key.
///
/// Values containing whitespace, quotes or `=` are quoted with the inner
/// quotes and backslashes escaped.
pub(crate) fn render_fields(fields: &[(&str, &str)]) -> String {
    let mut sorted: Vec<_> = fields.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);

    let mut output = String::with_capacity(64);
    for (i, (key, value)) in sorted.into_iter().enumerate() {
        if i > 0 {
            output.push(' ');
        }
        output.push_str(key);
        output.push('=');
        if value.is_empty() || value.chars().any(|c| c.is_whitespace() || c == '"' || c == '=') {
            output.push('"');
            for c in value.chars() {
                match c {
                    '"' => output.push_str("\\\""),
                    '\\' => output.push_str("\\\\"),
                    '\n' => output.push_str("\\n"),
                    c => output.push(c),
                }
            }
            output.push('"');
        } else {
            output.push_str(value);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Info.as_str(), "INFO");
        assert_eq!(Severity::Fatal.to_string(), "FATAL");
    }

    #[test]
    fn test_fields_deterministic_ordering() {
        let a = render_fields(&[("zebra", "1"), ("apple", "2"), ("mango", "3")]);
        let b = render_fields(&[("apple", "2"), ("mango", "3"), ("zebra", "1")]);
        assert_eq!(a, b);
        assert_eq!(a, "apple=2 mango=3 zebra=1");
    }

    #[test]
    fn test_fields_quoting() {
        let out = render_fields(&[("dn", "ou=people, dc=example"), ("reason", "say \"hi\"")]);
        assert_eq!(out, r#"dn="ou=people, dc=example" reason="say \"hi\"""#);
    }

    #[test]
    fn test_logging_without_subscriber_does_not_panic() {
        Logger::info("TEST_EVENT", &[("id", "1")]);
        Logger::fatal("TEST_EVENT", &[]);
    }
}
