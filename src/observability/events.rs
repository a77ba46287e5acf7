//! Observable store events
//!
//! Events are explicit and typed; each has a stable upper-case name used as
//! the `event` field of the log line.

use std::fmt;

/// Observable events in the entry store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Store initialization, logged as a scope (`STORE_INIT_BEGIN`, ...)
    StoreInit,
    /// Tables synced to the working directory
    StoreSync,
    /// Store destroyed
    StoreDestroyed,

    // Configuration
    /// Configuration loaded from disk
    ConfigLoaded,
    /// Attribute type definitions loaded
    SchemaLoaded,

    // Mutations
    /// Entry added
    EntryAdded,
    /// Entry deleted
    EntryDeleted,
    /// Entry modified
    EntryModified,
    /// Entry renamed and/or moved
    EntryRelocated,
    /// A partially applied write set was rolled back
    WriteRolledBack,

    // Integrity
    /// Index rebuild from the master table, logged as a scope
    IndexRebuild,
    /// Consistency check found a broken invariant
    IntegrityViolation,
    /// Snapshot file failed checksum verification
    TableCorruption,

    // Reads
    /// Search cursor opened
    SearchStarted,

    // Cursors
    /// A cursor was closed with a cause
    CursorAbandoned,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StoreInit => "STORE_INIT",
            Event::StoreSync => "STORE_SYNC",
            Event::StoreDestroyed => "STORE_DESTROYED",

            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemaLoaded => "SCHEMA_LOADED",

            Event::EntryAdded => "ENTRY_ADDED",
            Event::EntryDeleted => "ENTRY_DELETED",
            Event::EntryModified => "ENTRY_MODIFIED",
            Event::EntryRelocated => "ENTRY_RELOCATED",
            Event::WriteRolledBack => "WRITE_ROLLED_BACK",

            Event::IndexRebuild => "INDEX_REBUILD",
            Event::IntegrityViolation => "INTEGRITY_VIOLATION",
            Event::TableCorruption => "TABLE_CORRUPTION",

            Event::SearchStarted => "SEARCH_STARTED",

            Event::CursorAbandoned => "CURSOR_ABANDONED",
        }
    }

    /// Name of one phase of a scoped event, e.g. `INDEX_REBUILD_COMPLETE`
    pub fn phase(&self, phase: &str) -> String {
        format!("{}_{}", self.as_str(), phase)
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::IntegrityViolation | Event::TableCorruption)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::StoreInit,
            Event::StoreSync,
            Event::StoreDestroyed,
            Event::ConfigLoaded,
            Event::SchemaLoaded,
            Event::EntryAdded,
            Event::EntryDeleted,
            Event::EntryModified,
            Event::EntryRelocated,
            Event::WriteRolledBack,
            Event::IndexRebuild,
            Event::IntegrityViolation,
            Event::TableCorruption,
            Event::SearchStarted,
            Event::CursorAbandoned,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::IntegrityViolation.is_fatal());
        assert!(Event::TableCorruption.is_fatal());
        assert!(!Event::EntryAdded.is_fatal());
    }

    #[test]
    fn test_scope_phases() {
        assert_eq!(Event::StoreInit.phase("BEGIN"), "STORE_INIT_BEGIN");
        assert_eq!(Event::IndexRebuild.phase("COMPLETE"), "INDEX_REBUILD_COMPLETE");
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::EntryAdded), "ENTRY_ADDED");
    }
}
