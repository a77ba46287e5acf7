//! Metrics registry for the entry store
//!
//! - Counters only, monotonic except the live entry gauge
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics registry containing all store counters
///
/// All counters use `Relaxed` ordering; readers only need eventually
/// consistent values.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    entries_added: AtomicU64,
    entries_deleted: AtomicU64,
    entries_modified: AtomicU64,
    entries_relocated: AtomicU64,
    /// Mutations rejected with a constraint condition
    mutations_rejected: AtomicU64,
    /// Write sets rolled back after a partial failure
    rollbacks: AtomicU64,
    index_rebuilds: AtomicU64,
    syncs: AtomicU64,
    cursors_abandoned: AtomicU64,
    /// Live entry count (current)
    entries: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful add
    pub fn increment_adds(&self) {
        self.entries_added.fetch_add(1, Ordering::Relaxed);
        self.entries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful delete
    pub fn increment_deletes(&self) {
        self.entries_deleted.fetch_add(1, Ordering::Relaxed);
        self.entries.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a successful modify
    pub fn increment_modifies(&self) {
        self.entries_modified.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful rename or move
    pub fn increment_relocations(&self) {
        self.entries_relocated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a mutation rejected before any table was touched
    pub fn increment_rejections(&self) {
        self.mutations_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rolled back write set
    pub fn increment_rollbacks(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a full index rebuild
    pub fn increment_rebuilds(&self) {
        self.index_rebuilds.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a sync of all tables
    pub fn increment_syncs(&self) {
        self.syncs.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cursor closed with a cause
    pub fn increment_abandoned_cursors(&self) {
        self.cursors_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    /// Set the live entry count (after loading or rebuilding)
    pub fn set_entries(&self, count: u64) {
        self.entries.store(count, Ordering::Relaxed);
    }

    /// Get current snapshot of all metrics as JSON
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "entries_added": self.entries_added.load(Ordering::Relaxed),
            "entries_deleted": self.entries_deleted.load(Ordering::Relaxed),
            "entries_modified": self.entries_modified.load(Ordering::Relaxed),
            "entries_relocated": self.entries_relocated.load(Ordering::Relaxed),
            "mutations_rejected": self.mutations_rejected.load(Ordering::Relaxed),
            "rollbacks": self.rollbacks.load(Ordering::Relaxed),
            "index_rebuilds": self.index_rebuilds.load(Ordering::Relaxed),
            "syncs": self.syncs.load(Ordering::Relaxed),
            "cursors_abandoned": self.cursors_abandoned.load(Ordering::Relaxed),
            "entries": self.entries.load(Ordering::Relaxed),
        })
        .to_string()
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            entries_added: self.entries_added.load(Ordering::Relaxed),
            entries_deleted: self.entries_deleted.load(Ordering::Relaxed),
            entries_modified: self.entries_modified.load(Ordering::Relaxed),
            entries_relocated: self.entries_relocated.load(Ordering::Relaxed),
            mutations_rejected: self.mutations_rejected.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            index_rebuilds: self.index_rebuilds.load(Ordering::Relaxed),
            syncs: self.syncs.load(Ordering::Relaxed),
            cursors_abandoned: self.cursors_abandoned.load(Ordering::Relaxed),
            entries: self.entries.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub entries_added: u64,
    pub entries_deleted: u64,
    pub entries_modified: u64,
    pub entries_relocated: u64,
    pub mutations_rejected: u64,
    pub rollbacks: u64,
    pub index_rebuilds: u64,
    pub syncs: u64,
    pub cursors_abandoned: u64,
    pub entries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let snapshot = MetricsRegistry::new().snapshot();
        assert_eq!(snapshot.entries_added, 0);
        assert_eq!(snapshot.entries, 0);
        assert_eq!(snapshot.rollbacks, 0);
    }

    #[test]
    fn test_add_and_delete_track_live_entries() {
        let registry = MetricsRegistry::new();
        registry.increment_adds();
        registry.increment_adds();
        registry.increment_deletes();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.entries_added, 2);
        assert_eq!(snapshot.entries_deleted, 1);
        assert_eq!(snapshot.entries, 1);
    }

    #[test]
    fn test_to_json() {
        let registry = MetricsRegistry::new();
        registry.increment_rebuilds();
        registry.set_entries(42);

        let parsed: serde_json::Value = serde_json::from_str(&registry.to_json()).unwrap();
        assert_eq!(parsed["index_rebuilds"], 1);
        assert_eq!(parsed["entries"], 42);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let reg = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    reg.increment_modifies();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.snapshot().entries_modified, 800);
    }
}
