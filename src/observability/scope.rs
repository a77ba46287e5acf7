//! ObservationScope for automatic begin/complete logging
//!
//! - Logs `{event}_BEGIN` on creation
//! - Logs `{event}_COMPLETE` on `complete()`
//! - Logs `{event}_INCOMPLETE` on drop when neither completed nor failed

use std::cell::Cell;
use std::time::Instant;

use super::events::Event;
use super::logger::Logger;

/// A scope that automatically logs begin and complete events
///
/// ```ignore
/// let scope = ObservationScope::new(Event::IndexRebuild);
/// // ... do work ...
/// scope.complete(); // logs INDEX_REBUILD_COMPLETE with elapsed_ms
/// ```
pub struct ObservationScope<'a> {
    event: Event,
    completed: Cell<bool>,
    fields: Vec<(&'a str, String)>,
    started: Instant,
}

impl<'a> ObservationScope<'a> {
    /// Create a new observation scope, logging `{event}_BEGIN`
    pub fn new(event: Event) -> Self {
        Self::with_fields(event, &[])
    }

    /// Create a new observation scope with fields repeated on every line
    pub fn with_fields(event: Event, fields: &[(&'a str, &str)]) -> Self {
        Logger::info(&event.phase("BEGIN"), fields);

        Self {
            event,
            completed: Cell::new(false),
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            started: Instant::now(),
        }
    }

    /// Mark the scope as successfully completed
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Mark the scope as successfully completed with additional fields
    pub fn complete_with_fields(self, extra_fields: &[(&str, &str)]) {
        self.completed.set(true);
        let elapsed = self.started.elapsed().as_millis().to_string();

        let mut all_fields: Vec<(&str, &str)> =
            self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        all_fields.extend(extra_fields.iter().copied());
        all_fields.push(("elapsed_ms", elapsed.as_str()));

        Logger::info(&self.event.phase("COMPLETE"), &all_fields);
    }

    /// Mark the scope as failed with a reason, logged at ERROR level
    pub fn fail(self, reason: &str) {
        self.completed.set(true);
        let mut all_fields: Vec<(&str, &str)> =
            self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        all_fields.push(("reason", reason));
        Logger::error(&self.event.phase("FAILED"), &all_fields);
    }

    /// Mark the scope as failed with FATAL severity
    pub fn fail_fatal(self, reason: &str) {
        self.completed.set(true);
        Logger::fatal(&self.event.phase("FAILED"), &[("reason", reason)]);
    }

    /// Check if the scope has been completed
    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed.get() {
            Logger::warn(
                &self.event.phase("INCOMPLETE"),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_starts_incomplete() {
        let scope = ObservationScope::new(Event::IndexRebuild);
        assert!(!scope.is_completed());
        scope.complete();
    }

    #[test]
    fn test_scope_with_fields() {
        let scope = ObservationScope::with_fields(Event::StoreInit, &[("partition", "example")]);
        scope.complete_with_fields(&[("entries", "3")]);
    }

    #[test]
    fn test_scope_fail() {
        let scope = ObservationScope::new(Event::IndexRebuild);
        scope.fail("something went wrong");
    }

    #[test]
    fn test_scope_drop_without_complete() {
        let scope = ObservationScope::new(Event::IndexRebuild);
        drop(scope);
    }
}
